// ドメインサービス
// 予約集約と開催クラスにまたがるビジネスルールを実装

use chrono::{DateTime, Duration, Utc};

use crate::domain::error::DomainError;
use crate::domain::model::{ScheduledClass, StatusCounts};

/// 予約受付を締め切る、クラス開始までの時間
pub fn booking_lead_time() -> Duration {
    Duration::hours(1)
}

/// キャンセルを締め切る、クラス開始までの時間
pub fn cancellation_cutoff() -> Duration {
    Duration::hours(2)
}

/// ある時点でのクラスの空き状況
/// 読み取り時に毎回計算し、カウンタとして保存しない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacitySnapshot {
    pub max_capacity: u32,
    /// 定員を消費している予約数（confirmedのみ）
    pub confirmed: u32,
    pub available_spots: u32,
    pub is_fully_booked: bool,
    pub can_be_booked: bool,
}

/// 定員評価サービス
/// クラスとステータス別予約数から空き状況を導出する純粋関数
/// 一覧表示とストア内部の事前条件チェックの両方で同じ計算を使う
pub struct CapacityEvaluator;

impl CapacityEvaluator {
    pub fn evaluate(
        class: &ScheduledClass,
        counts: &StatusCounts,
        now: DateTime<Utc>,
    ) -> CapacitySnapshot {
        let max_capacity = class.max_capacity();
        let confirmed = counts.confirmed;
        let available_spots = max_capacity.saturating_sub(confirmed);
        let is_fully_booked = available_spots == 0;
        let can_be_booked = class.is_active()
            && !class.is_cancelled()
            && !is_fully_booked
            && class.starts_after(now, booking_lead_time());

        CapacitySnapshot {
            max_capacity,
            confirmed,
            available_spots,
            is_fully_booked,
            can_be_booked,
        }
    }
}

/// 予約受付ポリシー
pub struct BookingPolicy;

impl BookingPolicy {
    /// 新規予約を受け付けられるか判定する
    /// 判定順: 受付不可（非公開・中止・開始1時間前以降） -> 重複 -> 満員
    pub fn check_admission(
        class: &ScheduledClass,
        capacity: &CapacitySnapshot,
        has_active_booking: bool,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !class.is_active() {
            return Err(DomainError::NotBookable(
                "クラスは公開されていません".to_string(),
            ));
        }
        if class.is_cancelled() {
            return Err(DomainError::NotBookable("クラスは中止されました".to_string()));
        }
        if !class.starts_after(now, booking_lead_time()) {
            return Err(DomainError::NotBookable(
                "クラス開始1時間前を過ぎると予約できません".to_string(),
            ));
        }

        if has_active_booking {
            return Err(DomainError::DuplicateBooking);
        }

        if capacity.is_fully_booked {
            return Err(DomainError::CapacityExceeded);
        }

        Ok(())
    }
}
