use chrono::{DateTime, Utc};
use crate::domain::model::{BookingId, BookingStatus, ClassId, UserId};

/// 予約に関するドメインイベント
/// 予約集約が状態遷移のたびに記録し、コミット後にアプリケーション層が取り出して配信する
#[derive(Debug, Clone, PartialEq)]
pub enum BookingEvent {
    /// 仮予約が作成された（確認メールの送信契機）
    Requested(BookingRequested),
    /// 予約がメール確認により確定された
    Confirmed(BookingConfirmed),
    /// 予約がキャンセルされた（キャンセルメールの送信契機）
    Cancelled(BookingCancelled),
    /// 出席または無断欠席が記録された
    AttendanceRecorded(AttendanceRecorded),
}

impl BookingEvent {
    /// イベント種別名
    pub fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::Requested(_) => "BookingRequested",
            BookingEvent::Confirmed(_) => "BookingConfirmed",
            BookingEvent::Cancelled(_) => "BookingCancelled",
            BookingEvent::AttendanceRecorded(_) => "AttendanceRecorded",
        }
    }

    /// 対象の予約ID
    pub fn booking_id(&self) -> BookingId {
        match self {
            BookingEvent::Requested(e) => e.booking_id,
            BookingEvent::Confirmed(e) => e.booking_id,
            BookingEvent::Cancelled(e) => e.booking_id,
            BookingEvent::AttendanceRecorded(e) => e.booking_id,
        }
    }
}

/// 仮予約作成イベント
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequested {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub class_id: ClassId,
    pub occurred_at: DateTime<Utc>,
}

/// 予約確定イベント
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmed {
    pub booking_id: BookingId,
    pub class_id: ClassId,
    pub occurred_at: DateTime<Utc>,
}

/// 予約キャンセルイベント
#[derive(Debug, Clone, PartialEq)]
pub struct BookingCancelled {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub class_id: ClassId,
    /// キャンセル前のステータス
    pub previous_status: BookingStatus,
    pub occurred_at: DateTime<Utc>,
}

/// 出欠記録イベント
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecorded {
    pub booking_id: BookingId,
    pub class_id: ClassId,
    /// Attended または NoShow
    pub status: BookingStatus,
    pub occurred_at: DateTime<Utc>,
}
