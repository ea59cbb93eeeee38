use crate::application::service::{BookingDetails, BookingReceipt, ClassView};
use crate::domain::model::ClassListing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 予約に埋め込むクラス概要
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClassSummaryResponse {
    pub id: String,
    pub class_type: String,
    pub level: String,
    pub instructor: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// 予約用のレスポンスDTO
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub class: ClassSummaryResponse,
    pub status: String,
    pub booked_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub email_confirmed: bool,
    pub confirmation_token: String,
    pub confirmation_link: String,
    pub is_confirmed: bool,
    pub can_cancel: bool,
}

/// 予約作成用のレスポンスDTO
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateBookingResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_warning: Option<String>,
}

/// 予約確定用のレスポンスDTO
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfirmBookingResponse {
    pub success: bool,
    pub message: String,
    pub booking: BookingResponse,
}

/// クラス用のレスポンスDTO
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClassResponse {
    pub id: String,
    pub class_type_id: String,
    pub class_type: String,
    pub level_id: String,
    pub level: String,
    pub instructor_id: Option<String>,
    pub instructor: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub max_capacity: u32,
    pub price: String,
    pub is_active: bool,
    pub is_cancelled: bool,
    pub is_upcoming: bool,
    pub is_past: bool,
    /// 確定 + 出席
    pub confirmed_bookings_count: u32,
    pub pending_bookings_count: u32,
    pub available_spots: u32,
    pub is_fully_booked: bool,
    pub can_be_booked: bool,
    pub user_has_booking: bool,
}

/// 管理操作（登録・中止・割り当て）後のクラスDTO
#[derive(Serialize, Deserialize, Debug)]
pub struct ClassScheduleResponse {
    pub id: String,
    pub class_type: String,
    pub level: String,
    pub instructor: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_capacity: u32,
    pub price: String,
    pub is_active: bool,
    pub is_cancelled: bool,
}

impl ClassSummaryResponse {
    pub fn from_listing(listing: &ClassListing) -> Self {
        Self {
            id: listing.class.id().to_string(),
            class_type: listing.class_type_name.clone(),
            level: listing.level_name.clone(),
            instructor: listing.instructor_name.clone(),
            start_time: listing.class.start_time(),
            end_time: listing.class.end_time(),
        }
    }
}

impl BookingResponse {
    /// 予約詳細からBookingResponseを作成
    /// can_cancelは現在時刻に依存するため呼び出し側から受け取る
    pub fn from_details(details: &BookingDetails, confirmation_link: String, now: DateTime<Utc>) -> Self {
        let booking = &details.booking;
        Self {
            id: booking.id().to_string(),
            user_id: booking.user_id().to_string(),
            class: ClassSummaryResponse::from_listing(&details.class),
            status: booking.status().to_string(),
            booked_at: booking.booked_at(),
            confirmed_at: booking.confirmed_at(),
            cancelled_at: booking.cancelled_at(),
            email_confirmed: booking.email_confirmed(),
            confirmation_token: booking.confirmation_token().as_str().to_string(),
            confirmation_link,
            is_confirmed: booking.is_confirmed(),
            can_cancel: booking.can_cancel(details.class.class.start_time(), now),
        }
    }
}

impl CreateBookingResponse {
    pub fn from_receipt(receipt: &BookingReceipt, confirmation_link: String, now: DateTime<Utc>) -> Self {
        Self {
            booking: BookingResponse::from_details(&receipt.details, confirmation_link, now),
            email_sent: receipt.notification.email_sent,
            email_warning: receipt.notification.warning.clone(),
        }
    }
}

impl ClassResponse {
    pub fn from_view(view: &ClassView) -> Self {
        let class = &view.listing.class;
        Self {
            id: class.id().to_string(),
            class_type_id: class.class_type_id().to_string(),
            class_type: view.listing.class_type_name.clone(),
            level_id: class.level_id().to_string(),
            level: view.listing.level_name.clone(),
            instructor_id: class.instructor_id().map(|id| id.to_string()),
            instructor: view.listing.instructor_name.clone(),
            start_time: class.start_time(),
            end_time: class.end_time(),
            duration_minutes: class.duration_minutes(),
            max_capacity: class.max_capacity(),
            price: class.price().to_string(),
            is_active: class.is_active(),
            is_cancelled: class.is_cancelled(),
            is_upcoming: view.is_upcoming,
            is_past: view.is_past,
            confirmed_bookings_count: view.counts.confirmed_or_attended(),
            pending_bookings_count: view.counts.pending,
            available_spots: view.capacity.available_spots,
            is_fully_booked: view.capacity.is_fully_booked,
            can_be_booked: view.capacity.can_be_booked,
            user_has_booking: view.user_has_booking,
        }
    }
}

impl ClassScheduleResponse {
    pub fn from_listing(listing: &ClassListing) -> Self {
        let class = &listing.class;
        Self {
            id: class.id().to_string(),
            class_type: listing.class_type_name.clone(),
            level: listing.level_name.clone(),
            instructor: listing.instructor_name.clone(),
            start_time: class.start_time(),
            end_time: class.end_time(),
            max_capacity: class.max_capacity(),
            price: class.price().to_string(),
            is_active: class.is_active(),
            is_cancelled: class.is_cancelled(),
        }
    }
}
