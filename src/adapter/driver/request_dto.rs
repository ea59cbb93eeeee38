use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 予約作成用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub class_id: Uuid,
}

/// 予約確定用のリクエストDTO（POSTの本文）
/// 本文にトークンがなければクエリパラメータのトークンを使う
#[derive(Serialize, Deserialize, Default)]
pub struct ConfirmBookingRequest {
    pub token: Option<String>,
}

/// 予約確定用のクエリパラメータ
#[derive(Deserialize, Default)]
pub struct ConfirmQueryParams {
    pub token: Option<String>,
}

/// クラス登録用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct ScheduleClassRequest {
    pub class_type_id: Uuid,
    pub level_id: Uuid,
    pub instructor_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub max_capacity: u32,
    /// "12.50" 形式、省略時は無料
    pub price: Option<String>,
}

/// インストラクター割り当て用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct AssignInstructorRequest {
    pub instructor_id: Uuid,
}

/// クラス一覧取得用のクエリパラメータ
#[derive(Deserialize, Default)]
pub struct ClassesQueryParams {
    pub class_type_id: Option<Uuid>,
    pub level_id: Option<Uuid>,
    pub instructor_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_upcoming: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_request_token_is_optional() {
        let request: ConfirmBookingRequest = serde_json::from_str("{}").unwrap();
        assert!(request.token.is_none());

        let request: ConfirmBookingRequest = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(request.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_schedule_class_request_parses_rfc3339() {
        let json = r#"{
            "class_type_id": "6f1c2a8e-0d4b-4c1e-9a3f-1b2c3d4e5f60",
            "level_id": "a1b2c3d4-0001-4000-8000-000000000001",
            "start_time": "2030-01-01T09:00:00Z",
            "end_time": "2030-01-01T10:00:00Z",
            "duration_minutes": 60,
            "max_capacity": 12
        }"#;

        let request: ScheduleClassRequest = serde_json::from_str(json).unwrap();

        assert!(request.instructor_id.is_none());
        assert!(request.price.is_none());
        assert_eq!(request.max_capacity, 12);
        assert_eq!((request.end_time - request.start_time).num_minutes(), 60);
    }
}
