use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapter::driver::identity::Identity;
use crate::adapter::driver::request_dto::{
    AssignInstructorRequest, ClassesQueryParams, ConfirmBookingRequest, ConfirmQueryParams,
    CreateBookingRequest, ScheduleClassRequest,
};
use crate::adapter::driver::response_dto::{
    BookingResponse, ClassResponse, ClassScheduleResponse, ConfirmBookingResponse,
    CreateBookingResponse,
};
use crate::application::service::{
    BookingApplicationService, BookingDetails, BookingQueryService, ClassFilter, ClassQueryService,
    ClassScheduleApplicationService, ScheduleClassCommand,
};
use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::model::{Actor, BookingId, ClassId, ClassTypeId, InstructorId, LevelId, Price};
use crate::domain::port::Clock;

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// アプリケーションサービスを含む状態
pub type AppState = AppStateInner;

#[derive(Clone)]
pub struct AppStateInner {
    pub booking_service: Arc<BookingApplicationService>,
    pub class_schedule_service: Arc<ClassScheduleApplicationService>,
    pub booking_query_service: Arc<BookingQueryService>,
    pub class_query_service: Arc<ClassQueryService>,
    pub clock: Arc<dyn Clock>,
}

impl AppStateInner {
    fn booking_response(&self, details: &BookingDetails) -> BookingResponse {
        BookingResponse::from_details(
            details,
            self.booking_service.confirmation_link(&details.booking),
            self.clock.now(),
        )
    }
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/bookings", post(create_booking).get(get_bookings))
        .route("/bookings/upcoming", get(get_upcoming_bookings))
        .route("/bookings/history", get(get_booking_history))
        .route("/bookings/:booking_id", get(get_booking_by_id))
        .route(
            "/bookings/:booking_id/confirm",
            get(confirm_booking_from_link).post(confirm_booking),
        )
        .route("/bookings/:booking_id/cancel", post(cancel_booking))
        .route("/bookings/:booking_id/attended", post(mark_attended))
        .route("/bookings/:booking_id/no-show", post(mark_no_show))
        .route("/classes", get(get_classes).post(schedule_class))
        .route("/classes/upcoming", get(get_upcoming_classes))
        .route("/classes/:class_id", get(get_class_by_id))
        .route("/classes/:class_id/cancel", post(cancel_class))
        .route("/classes/:class_id/deactivate", post(deactivate_class))
        .route("/classes/:class_id/assign-instructor", post(assign_instructor))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "fitness-studio-booking",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// 仮予約作成エンドポイント
async fn create_booking(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Json(request): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<CreateBookingResponse>)> {
    let class_id = ClassId::from_uuid(request.class_id);

    match state.booking_service.create_booking(&actor, class_id).await {
        Ok(receipt) => {
            let link = state
                .booking_service
                .confirmation_link(&receipt.details.booking);
            let response = CreateBookingResponse::from_receipt(&receipt, link, state.clock.now());
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(err) => Err(map_application_error(err)),
    }
}

// 予約一覧取得エンドポイント（スタッフは全件、会員は自分の予約のみ）
async fn get_bookings(
    State(state): State<AppState>,
    Identity(actor): Identity,
) -> ApiResult<Json<Vec<BookingResponse>>> {
    match state.booking_query_service.list_bookings(&actor).await {
        Ok(bookings) => Ok(Json(
            bookings.iter().map(|d| state.booking_response(d)).collect(),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 今後の予約取得エンドポイント
async fn get_upcoming_bookings(
    State(state): State<AppState>,
    Identity(actor): Identity,
) -> ApiResult<Json<Vec<BookingResponse>>> {
    match state.booking_query_service.upcoming_bookings(&actor).await {
        Ok(bookings) => Ok(Json(
            bookings.iter().map(|d| state.booking_response(d)).collect(),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 予約履歴取得エンドポイント
async fn get_booking_history(
    State(state): State<AppState>,
    Identity(actor): Identity,
) -> ApiResult<Json<Vec<BookingResponse>>> {
    match state.booking_query_service.booking_history(&actor).await {
        Ok(bookings) => Ok(Json(
            bookings.iter().map(|d| state.booking_response(d)).collect(),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 予約詳細取得エンドポイント
async fn get_booking_by_id(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<BookingResponse>> {
    let booking_id = BookingId::from_uuid(booking_id);

    match state.booking_query_service.get_booking(&actor, booking_id).await {
        Ok(details) => Ok(Json(state.booking_response(&details))),
        Err(err) => Err(map_application_error(err)),
    }
}

// 確認リンクからの予約確定エンドポイント
async fn confirm_booking_from_link(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(booking_id): Path<Uuid>,
    query: Result<Query<ConfirmQueryParams>, QueryRejection>,
) -> ApiResult<Json<ConfirmBookingResponse>> {
    let Query(params) = query.map_err(|_| invalid_parameter())?;
    confirm(state, actor, BookingId::from_uuid(booking_id), params.token).await
}

// 予約確定エンドポイント
// トークンは本文、なければクエリパラメータから取得する
async fn confirm_booking(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(booking_id): Path<Uuid>,
    query: Result<Query<ConfirmQueryParams>, QueryRejection>,
    body: Option<Json<ConfirmBookingRequest>>,
) -> ApiResult<Json<ConfirmBookingResponse>> {
    let Query(params) = query.map_err(|_| invalid_parameter())?;
    let token = body
        .and_then(|Json(request)| request.token)
        .or(params.token);
    confirm(state, actor, BookingId::from_uuid(booking_id), token).await
}

async fn confirm(
    state: AppState,
    actor: Actor,
    booking_id: BookingId,
    token: Option<String>,
) -> ApiResult<Json<ConfirmBookingResponse>> {
    match state
        .booking_service
        .confirm_booking(&actor, booking_id, token)
        .await
    {
        Ok(details) => Ok(Json(ConfirmBookingResponse {
            success: true,
            message: "Booking confirmed successfully".to_string(),
            booking: state.booking_response(&details),
        })),
        Err(err) => Err(map_application_error(err)),
    }
}

// 予約キャンセルエンドポイント
async fn cancel_booking(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<BookingResponse>> {
    let booking_id = BookingId::from_uuid(booking_id);

    match state.booking_service.cancel_booking(&actor, booking_id).await {
        Ok(details) => Ok(Json(state.booking_response(&details))),
        Err(err) => Err(map_application_error(err)),
    }
}

// 出席記録エンドポイント
async fn mark_attended(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<BookingResponse>> {
    let booking_id = BookingId::from_uuid(booking_id);

    match state.booking_service.mark_attended(&actor, booking_id).await {
        Ok(details) => Ok(Json(state.booking_response(&details))),
        Err(err) => Err(map_application_error(err)),
    }
}

// 無断欠席記録エンドポイント
async fn mark_no_show(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<BookingResponse>> {
    let booking_id = BookingId::from_uuid(booking_id);

    match state.booking_service.mark_no_show(&actor, booking_id).await {
        Ok(details) => Ok(Json(state.booking_response(&details))),
        Err(err) => Err(map_application_error(err)),
    }
}

// クラス一覧取得エンドポイント
async fn get_classes(
    State(state): State<AppState>,
    Identity(actor): Identity,
    query: Result<Query<ClassesQueryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ClassResponse>>> {
    let Query(params) = query.map_err(|_| invalid_parameter())?;
    let filter = ClassFilter {
        class_type_id: params.class_type_id.map(ClassTypeId::from_uuid),
        level_id: params.level_id.map(LevelId::from_uuid),
        instructor_id: params.instructor_id.map(InstructorId::from_uuid),
        is_active: params.is_active,
        is_upcoming: params.is_upcoming,
    };

    match state.class_query_service.list_classes(&actor, filter).await {
        Ok(views) => Ok(Json(views.iter().map(ClassResponse::from_view).collect())),
        Err(err) => Err(map_application_error(err)),
    }
}

// 予約可能な今後のクラス取得エンドポイント
async fn get_upcoming_classes(
    State(state): State<AppState>,
    Identity(actor): Identity,
) -> ApiResult<Json<Vec<ClassResponse>>> {
    match state.class_query_service.upcoming_classes(&actor).await {
        Ok(views) => Ok(Json(views.iter().map(ClassResponse::from_view).collect())),
        Err(err) => Err(map_application_error(err)),
    }
}

// クラス詳細取得エンドポイント
async fn get_class_by_id(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(class_id): Path<Uuid>,
) -> ApiResult<Json<ClassResponse>> {
    let class_id = ClassId::from_uuid(class_id);

    match state.class_query_service.get_class(&actor, class_id).await {
        Ok(view) => Ok(Json(ClassResponse::from_view(&view))),
        Err(err) => Err(map_application_error(err)),
    }
}

// クラス登録エンドポイント（管理者）
async fn schedule_class(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Json(request): Json<ScheduleClassRequest>,
) -> ApiResult<(StatusCode, Json<ClassScheduleResponse>)> {
    let price = match request.price.as_deref() {
        Some(raw) => Price::parse(raw).map_err(map_domain_error)?,
        None => Price::FREE,
    };
    let command = ScheduleClassCommand {
        class_type_id: ClassTypeId::from_uuid(request.class_type_id),
        level_id: LevelId::from_uuid(request.level_id),
        instructor_id: request.instructor_id.map(InstructorId::from_uuid),
        start_time: request.start_time,
        end_time: request.end_time,
        duration_minutes: request.duration_minutes,
        max_capacity: request.max_capacity,
        price,
    };

    match state.class_schedule_service.schedule_class(&actor, command).await {
        Ok(listing) => Ok((
            StatusCode::CREATED,
            Json(ClassScheduleResponse::from_listing(&listing)),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// クラス中止エンドポイント（管理者）
async fn cancel_class(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(class_id): Path<Uuid>,
) -> ApiResult<Json<ClassScheduleResponse>> {
    let class_id = ClassId::from_uuid(class_id);

    match state.class_schedule_service.cancel_class(&actor, class_id).await {
        Ok(listing) => Ok(Json(ClassScheduleResponse::from_listing(&listing))),
        Err(err) => Err(map_application_error(err)),
    }
}

// クラス無効化エンドポイント（管理者）
async fn deactivate_class(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(class_id): Path<Uuid>,
) -> ApiResult<Json<ClassScheduleResponse>> {
    let class_id = ClassId::from_uuid(class_id);

    match state
        .class_schedule_service
        .deactivate_class(&actor, class_id)
        .await
    {
        Ok(listing) => Ok(Json(ClassScheduleResponse::from_listing(&listing))),
        Err(err) => Err(map_application_error(err)),
    }
}

// インストラクター割り当てエンドポイント（管理者）
async fn assign_instructor(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(class_id): Path<Uuid>,
    Json(request): Json<AssignInstructorRequest>,
) -> ApiResult<Json<ClassScheduleResponse>> {
    let class_id = ClassId::from_uuid(class_id);
    let instructor_id = InstructorId::from_uuid(request.instructor_id);

    match state
        .class_schedule_service
        .assign_instructor(&actor, class_id, instructor_id)
        .await
    {
        Ok(listing) => Ok(Json(ClassScheduleResponse::from_listing(&listing))),
        Err(err) => Err(map_application_error(err)),
    }
}

fn invalid_parameter() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: "無効なクエリパラメータです".to_string(),
            code: "INVALID_PARAMETER".to_string(),
        }),
    )
}

// アプリケーションエラーをHTTPエラーにマッピング
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    match err {
        ApplicationError::DomainError(domain_err) => map_domain_error(domain_err),
        ApplicationError::RepositoryError(repo_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: format!("{}", repo_err),
                code: "REPOSITORY_ERROR".to_string(),
            }),
        ),
        ApplicationError::NotFound(msg) => (
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: msg,
                code: "NOT_FOUND".to_string(),
            }),
        ),
    }
}

// ドメインエラーを適切なHTTPステータスコードとエラーコードにマッピング
// 権限エラーのみ403、それ以外の業務ルール違反は400
fn map_domain_error(domain_err: DomainError) -> (StatusCode, Json<ApiError>) {
    let error = domain_err.to_string();
    let (status, code) = match domain_err {
        DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        DomainError::NotBookable(_) => (StatusCode::BAD_REQUEST, "NOT_BOOKABLE"),
        DomainError::CapacityExceeded => (StatusCode::BAD_REQUEST, "CAPACITY_EXCEEDED"),
        DomainError::DuplicateBooking => (StatusCode::BAD_REQUEST, "DUPLICATE_BOOKING"),
        DomainError::MissingToken => (StatusCode::BAD_REQUEST, "MISSING_TOKEN"),
        DomainError::TokenMismatch => (StatusCode::BAD_REQUEST, "TOKEN_MISMATCH"),
        DomainError::AlreadyConfirmed => (StatusCode::BAD_REQUEST, "ALREADY_CONFIRMED"),
        DomainError::CancellationWindowClosed(_) => {
            (StatusCode::BAD_REQUEST, "CANCELLATION_WINDOW_CLOSED")
        }
        DomainError::InvalidBookingState(_) => (StatusCode::BAD_REQUEST, "INVALID_BOOKING_STATE"),
        DomainError::InvalidSchedule(_) => (StatusCode::BAD_REQUEST, "INVALID_SCHEDULE"),
        DomainError::InvalidValue(_) => (StatusCode::BAD_REQUEST, "INVALID_VALUE"),
    };

    (
        status,
        Json(ApiError {
            error,
            code: code.to_string(),
        }),
    )
}
