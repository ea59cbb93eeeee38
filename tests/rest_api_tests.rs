use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use chrono::{Duration, Utc};
use fitness_studio_booking::adapter::driven::{InMemoryStore, LogNotifier, SystemClock, TracingLogger};
use fitness_studio_booking::adapter::driver::rest_api::{create_router, ApiError, AppStateInner};
use fitness_studio_booking::adapter::driver::response_dto::{
    BookingResponse, ClassResponse, ClassScheduleResponse, ConfirmBookingResponse,
    CreateBookingResponse,
};
use fitness_studio_booking::application::service::{
    BookingApplicationService, BookingQueryService, ClassQueryService,
    ClassScheduleApplicationService,
};
use fitness_studio_booking::application::ConfirmationLinkBuilder;
use fitness_studio_booking::domain::model::{default_class_types, default_levels, UserId};
use fitness_studio_booking::domain::port::{
    BookingNotifier, BookingRepository, ClassCatalogRepository, Clock, Logger,
};
use serde_json::json;
use std::sync::Arc;

fn test_server() -> TestServer {
    let store = Arc::new(InMemoryStore::with_default_catalog());
    let booking_repository: Arc<dyn BookingRepository> = store.clone();
    let class_repository: Arc<dyn ClassCatalogRepository> = store;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
    let notifier: Arc<dyn BookingNotifier> = Arc::new(LogNotifier::new());

    let state = AppStateInner {
        booking_service: Arc::new(BookingApplicationService::new(
            booking_repository.clone(),
            class_repository.clone(),
            notifier,
            clock.clone(),
            logger.clone(),
            ConfirmationLinkBuilder::new("http://localhost:3000"),
        )),
        class_schedule_service: Arc::new(ClassScheduleApplicationService::new(
            class_repository.clone(),
            logger,
        )),
        booking_query_service: Arc::new(BookingQueryService::new(
            booking_repository.clone(),
            class_repository.clone(),
            clock.clone(),
        )),
        class_query_service: Arc::new(ClassQueryService::new(
            class_repository,
            booking_repository,
            clock.clone(),
        )),
        clock,
    };

    TestServer::new(create_router().with_state(state)).unwrap()
}

// 利用者ヘッダーを付与する
fn as_user(request: TestRequest, user_id: UserId, role: &str) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_str(&user_id.to_string()).unwrap(),
        )
        .add_header(
            HeaderName::from_static("x-user-role"),
            HeaderValue::from_str(role).unwrap(),
        )
}

async fn schedule_class(server: &TestServer, admin: UserId, max_capacity: u32) -> String {
    let start = Utc::now() + Duration::days(2);
    let response = as_user(server.post("/classes"), admin, "admin")
        .json(&json!({
            "class_type_id": default_class_types()[0].id.to_string(),
            "level_id": default_levels()[0].id.to_string(),
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::minutes(60)).to_rfc3339(),
            "duration_minutes": 60,
            "max_capacity": max_capacity,
            "price": "20.00"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<ClassScheduleResponse>().id
}

async fn create_booking(server: &TestServer, member: UserId, class_id: &str) -> CreateBookingResponse {
    let response = as_user(server.post("/bookings"), member, "member")
        .json(&json!({ "class_id": class_id }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<CreateBookingResponse>()
}

#[tokio::test]
async fn test_health_check() {
    let server = test_server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_requests_without_identity_are_unauthorized() {
    let server = test_server();

    let response = server.get("/bookings").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<ApiError>().code, "UNAUTHORIZED");

    let response = server
        .get("/classes")
        .add_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_static("not-a-uuid"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_book_and_confirm_through_link() {
    let server = test_server();
    let admin = UserId::new();
    let member = UserId::new();
    let class_id = schedule_class(&server, admin, 10).await;

    let created = create_booking(&server, member, &class_id).await;
    assert_eq!(created.booking.status, "pending");
    assert!(created.email_sent);
    assert!(created.email_warning.is_none());
    assert!(created.booking.can_cancel);
    assert!(created
        .booking
        .confirmation_link
        .starts_with("http://localhost:3000/bookings/"));

    // 確認リンク（GET）で確定する
    let path = format!(
        "/bookings/{}/confirm?token={}",
        created.booking.id, created.booking.confirmation_token
    );
    let response = as_user(server.get(&path), member, "member").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let confirmed = response.json::<ConfirmBookingResponse>();
    assert!(confirmed.success);
    assert_eq!(confirmed.booking.status, "confirmed");
    assert!(confirmed.booking.is_confirmed);

    let response = as_user(server.get(&format!("/classes/{}", class_id)), member, "member").await;
    let class = response.json::<ClassResponse>();
    assert_eq!(class.confirmed_bookings_count, 1);
    assert_eq!(class.pending_bookings_count, 0);
    assert_eq!(class.available_spots, 9);
    assert!(class.user_has_booking);
    assert_eq!(class.price, "20.00");

    // 同じトークンで再度確定すると失敗する
    let response = as_user(server.get(&path), member, "member").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "ALREADY_CONFIRMED");
}

#[tokio::test]
async fn test_confirm_with_token_in_body() {
    let server = test_server();
    let member = UserId::new();
    let class_id = schedule_class(&server, UserId::new(), 5).await;
    let created = create_booking(&server, member, &class_id).await;
    let path = format!("/bookings/{}/confirm", created.booking.id);

    let response = as_user(server.post(&path), member, "member")
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "MISSING_TOKEN");

    let response = as_user(server.post(&path), member, "member")
        .json(&json!({ "token": "wrong-token" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "TOKEN_MISMATCH");

    let response = as_user(server.post(&path), member, "member")
        .json(&json!({ "token": &created.booking.confirmation_token }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<ConfirmBookingResponse>().booking.status,
        "confirmed"
    );
}

#[tokio::test]
async fn test_duplicate_and_full_class_are_rejected() {
    let server = test_server();
    let class_id = schedule_class(&server, UserId::new(), 1).await;
    let first = UserId::new();
    let second = UserId::new();

    let created = create_booking(&server, first, &class_id).await;

    let response = as_user(server.post("/bookings"), first, "member")
        .json(&json!({ "class_id": class_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "DUPLICATE_BOOKING");

    let confirm_path = format!(
        "/bookings/{}/confirm?token={}",
        created.booking.id, created.booking.confirmation_token
    );
    as_user(server.get(&confirm_path), first, "member").await;

    let response = as_user(server.post("/bookings"), second, "member")
        .json(&json!({ "class_id": class_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "CAPACITY_EXCEEDED");
}

#[tokio::test]
async fn test_booking_unknown_class_is_not_found() {
    let server = test_server();

    let response = as_user(server.post("/bookings"), UserId::new(), "member")
        .json(&json!({ "class_id": UserId::new().to_string() }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<ApiError>().code, "NOT_FOUND");
}

#[tokio::test]
async fn test_bookings_are_private_to_their_owner() {
    let server = test_server();
    let owner = UserId::new();
    let stranger = UserId::new();
    let admin = UserId::new();
    let class_id = schedule_class(&server, admin, 5).await;
    let created = create_booking(&server, owner, &class_id).await;
    let booking_path = format!("/bookings/{}", created.booking.id);

    let response = as_user(server.get(&booking_path), stranger, "member").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = as_user(server.get("/bookings"), stranger, "member").await;
    assert!(response.json::<Vec<BookingResponse>>().is_empty());

    let cancel_path = format!("/bookings/{}/cancel", created.booking.id);
    let response = as_user(server.post(&cancel_path), stranger, "member").await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<ApiError>().code, "FORBIDDEN");

    let response = as_user(server.get("/bookings"), admin, "admin").await;
    assert_eq!(response.json::<Vec<BookingResponse>>().len(), 1);

    let response = as_user(server.post(&cancel_path), owner, "member").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let cancelled = response.json::<BookingResponse>();
    assert_eq!(cancelled.status, "cancelled");
    assert!(!cancelled.can_cancel);

    let response = as_user(server.post(&cancel_path), owner, "member").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "CANCELLATION_WINDOW_CLOSED");
}

#[tokio::test]
async fn test_attendance_requires_instructor_and_confirmed_booking() {
    let server = test_server();
    let member = UserId::new();
    let instructor = UserId::new();
    let class_id = schedule_class(&server, UserId::new(), 5).await;
    let created = create_booking(&server, member, &class_id).await;
    let attended_path = format!("/bookings/{}/attended", created.booking.id);

    let response = as_user(server.post(&attended_path), member, "member").await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = as_user(server.post(&attended_path), instructor, "instructor").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "INVALID_BOOKING_STATE");

    let confirm_path = format!(
        "/bookings/{}/confirm?token={}",
        created.booking.id, created.booking.confirmation_token
    );
    as_user(server.get(&confirm_path), member, "member").await;

    let no_show_path = format!("/bookings/{}/no-show", created.booking.id);
    let response = as_user(server.post(&no_show_path), instructor, "instructor").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<BookingResponse>().status, "no_show");
}

#[tokio::test]
async fn test_class_administration_requires_admin() {
    let server = test_server();
    let admin = UserId::new();
    let member = UserId::new();
    let start = Utc::now() + Duration::days(3);
    let body = json!({
        "class_type_id": default_class_types()[1].id.to_string(),
        "level_id": default_levels()[2].id.to_string(),
        "start_time": start.to_rfc3339(),
        "end_time": (start + Duration::minutes(45)).to_rfc3339(),
        "duration_minutes": 45,
        "max_capacity": 8
    });

    let response = as_user(server.post("/classes"), member, "member")
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let mut invalid_price = body.clone();
    invalid_price["price"] = json!("12.345");
    let response = as_user(server.post("/classes"), admin, "admin")
        .json(&invalid_price)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "INVALID_VALUE");

    let response = as_user(server.post("/classes"), admin, "admin")
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let class = response.json::<ClassScheduleResponse>();
    assert_eq!(class.class_type, "HIIT");
    assert_eq!(class.level, "Advanced");
    assert_eq!(class.price, "0.00");

    let response = as_user(server.get("/classes/upcoming"), member, "member").await;
    let upcoming = response.json::<Vec<ClassResponse>>();
    assert_eq!(upcoming.len(), 1);
    assert!(upcoming[0].can_be_booked);

    let cancel_path = format!("/classes/{}/cancel", class.id);
    let response = as_user(server.post(&cancel_path), admin, "admin").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.json::<ClassScheduleResponse>().is_cancelled);

    let response = as_user(server.get("/classes/upcoming"), member, "member").await;
    assert!(response.json::<Vec<ClassResponse>>().is_empty());

    let response = as_user(server.post("/bookings"), member, "member")
        .json(&json!({ "class_id": &class.id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "NOT_BOOKABLE");

    let assign_path = format!("/classes/{}/assign-instructor", class.id);
    let response = as_user(server.post(&assign_path), admin, "admin")
        .json(&json!({ "instructor_id": UserId::new().to_string() }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_class_list_filters() {
    let server = test_server();
    let admin = UserId::new();
    schedule_class(&server, admin, 5).await;
    let retired = schedule_class(&server, admin, 7).await;

    let path = format!("/classes?class_type_id={}", default_class_types()[0].id);
    let response = as_user(server.get(&path), admin, "admin").await;
    assert_eq!(response.json::<Vec<ClassResponse>>().len(), 2);

    let path = format!("/classes?class_type_id={}", default_class_types()[3].id);
    let response = as_user(server.get(&path), admin, "admin").await;
    assert!(response.json::<Vec<ClassResponse>>().is_empty());

    let response = as_user(server.get("/classes?is_upcoming=false"), admin, "admin").await;
    assert!(response.json::<Vec<ClassResponse>>().is_empty());

    // 無効化（論理削除）は管理者のみ
    let deactivate_path = format!("/classes/{}/deactivate", retired);
    let response = as_user(server.post(&deactivate_path), UserId::new(), "member").await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = as_user(server.post(&deactivate_path), admin, "admin").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let deactivated = response.json::<ClassScheduleResponse>();
    assert!(!deactivated.is_active);
    assert!(!deactivated.is_cancelled);

    let response = as_user(server.get("/classes?is_active=true"), admin, "admin").await;
    let active = response.json::<Vec<ClassResponse>>();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].id, retired);

    let response = as_user(server.get("/classes?is_active=false"), admin, "admin").await;
    let inactive = response.json::<Vec<ClassResponse>>();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].id, retired);

    let response = as_user(server.post("/bookings"), UserId::new(), "member")
        .json(&json!({ "class_id": &retired }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "NOT_BOOKABLE");

    let response = as_user(server.get("/classes?is_active=maybe"), admin, "admin").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "INVALID_PARAMETER");
}
