use chrono::{DateTime, Utc};

use crate::domain::error::DomainError;
use crate::domain::event::{
    AttendanceRecorded, BookingCancelled, BookingConfirmed, BookingEvent, BookingRequested,
};
use crate::domain::model::{Actor, BookingId, BookingStatus, ClassId, ConfirmationToken, UserId};
use crate::domain::service::{cancellation_cutoff, CapacitySnapshot};

/// 永続化された予約の状態
/// リポジトリが予約集約を再構築するときに使う
#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub id: BookingId,
    pub user_id: UserId,
    pub class_id: ClassId,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub confirmation_token: ConfirmationToken,
    pub email_confirmed: bool,
}

/// Booking集約
/// 会員1人が開催クラス1回分に対して持つ予約。状態遷移のルールを適用する
///
/// 状態遷移:
/// - Pending -> Confirmed（トークンによるメール確認）
/// - Pending / Confirmed -> Cancelled（開始2時間前まで）
/// - Confirmed -> Attended / NoShow（運営による記録）
#[derive(Debug, Clone)]
pub struct Booking {
    id: BookingId,
    user_id: UserId,
    class_id: ClassId,
    status: BookingStatus,
    booked_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    confirmation_token: ConfirmationToken,
    email_confirmed: bool,
    events: Vec<BookingEvent>,
}

impl Booking {
    /// 新しい仮予約を作成
    /// 初期ステータスはPending、確認トークンはここで生成する
    pub fn request(id: BookingId, user_id: UserId, class_id: ClassId, now: DateTime<Utc>) -> Self {
        let event = BookingRequested {
            booking_id: id,
            user_id,
            class_id,
            occurred_at: now,
        };
        Self {
            id,
            user_id,
            class_id,
            status: BookingStatus::Pending,
            booked_at: now,
            confirmed_at: None,
            cancelled_at: None,
            confirmation_token: ConfirmationToken::generate(),
            email_confirmed: false,
            events: vec![BookingEvent::Requested(event)],
        }
    }

    /// データベースから取得したデータで予約を再構築
    pub fn reconstruct(record: BookingRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            class_id: record.class_id,
            status: record.status,
            booked_at: record.booked_at,
            confirmed_at: record.confirmed_at,
            cancelled_at: record.cancelled_at,
            confirmation_token: record.confirmation_token,
            email_confirmed: record.email_confirmed,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn booked_at(&self) -> DateTime<Utc> {
        self.booked_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn confirmation_token(&self) -> &ConfirmationToken {
        &self.confirmation_token
    }

    pub fn email_confirmed(&self) -> bool {
        self.email_confirmed
    }

    /// ステータスが確定済みかつメール確認済みか
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed && self.email_confirmed
    }

    /// キャンセル可能か
    /// Pending/Confirmedで、かつクラス開始まで2時間より多く残っている場合のみ
    pub fn can_cancel(&self, class_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.status.is_active() && class_start > now + cancellation_cutoff()
    }

    /// ドメインイベントを取得してクリア
    pub fn take_events(&mut self) -> Vec<BookingEvent> {
        std::mem::take(&mut self.events)
    }

    /// 確認トークンで予約を確定する
    /// 事前条件:
    /// - トークンが指定され、保存済みのトークンと完全に一致
    /// - まだメール確認されていない
    /// - ステータスがPending
    /// - 確定時点でクラスが満員でない（仮予約は定員を消費しないため再確認する）
    pub fn confirm(
        &mut self,
        token: Option<&str>,
        capacity: &CapacitySnapshot,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(DomainError::MissingToken),
        };

        if !self.confirmation_token.matches(token) {
            return Err(DomainError::TokenMismatch);
        }

        if self.email_confirmed {
            return Err(DomainError::AlreadyConfirmed);
        }

        if self.status != BookingStatus::Pending {
            return Err(DomainError::InvalidBookingState(format!(
                "{}の予約は確定できません",
                self.status
            )));
        }

        if capacity.is_fully_booked {
            return Err(DomainError::CapacityExceeded);
        }

        self.status = BookingStatus::Confirmed;
        self.email_confirmed = true;
        self.confirmed_at = Some(now);

        self.events.push(BookingEvent::Confirmed(BookingConfirmed {
            booking_id: self.id,
            class_id: self.class_id,
            occurred_at: now,
        }));

        Ok(())
    }

    /// 予約をキャンセルする
    /// 事前条件:
    /// - 操作者が予約者本人またはスタッフ
    /// - キャンセル可能（can_cancel）
    pub fn cancel(
        &mut self,
        actor: &Actor,
        class_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !actor.can_act_for(self.user_id) {
            return Err(DomainError::Forbidden(
                "自分の予約のみキャンセルできます".to_string(),
            ));
        }

        if !self.status.is_active() {
            return Err(DomainError::CancellationWindowClosed(format!(
                "{}の予約はキャンセルできません",
                self.status
            )));
        }

        if !self.can_cancel(class_start, now) {
            return Err(DomainError::CancellationWindowClosed(
                "クラス開始2時間前を過ぎています".to_string(),
            ));
        }

        let previous_status = self.status;
        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(now);

        self.events.push(BookingEvent::Cancelled(BookingCancelled {
            booking_id: self.id,
            user_id: self.user_id,
            class_id: self.class_id,
            previous_status,
            occurred_at: now,
        }));

        Ok(())
    }

    /// 出席済みにマーク
    /// 事前条件:
    /// - 操作者がインストラクターまたは管理者
    /// - ステータスがConfirmed
    pub fn mark_attended(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.record_attendance(actor, BookingStatus::Attended, now)
    }

    /// 無断欠席にマーク
    /// 事前条件はmark_attendedと同じ
    pub fn mark_no_show(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.record_attendance(actor, BookingStatus::NoShow, now)
    }

    fn record_attendance(
        &mut self,
        actor: &Actor,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !actor.can_record_attendance() {
            return Err(DomainError::Forbidden(
                "出欠を記録できるのはインストラクターまたは管理者のみです".to_string(),
            ));
        }

        if self.status != BookingStatus::Confirmed {
            return Err(DomainError::InvalidBookingState(format!(
                "出欠を記録できるのはconfirmed状態のみです（現在: {}）",
                self.status
            )));
        }

        self.status = status;

        self.events
            .push(BookingEvent::AttendanceRecorded(AttendanceRecorded {
                booking_id: self.id,
                class_id: self.class_id,
                status,
                occurred_at: now,
            }));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Role;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 9, 0, 0).unwrap()
    }

    fn open_capacity() -> CapacitySnapshot {
        CapacitySnapshot {
            max_capacity: 10,
            confirmed: 0,
            available_spots: 10,
            is_fully_booked: false,
            can_be_booked: true,
        }
    }

    fn full_capacity() -> CapacitySnapshot {
        CapacitySnapshot {
            max_capacity: 1,
            confirmed: 1,
            available_spots: 0,
            is_fully_booked: true,
            can_be_booked: false,
        }
    }

    fn pending_booking(owner: UserId) -> Booking {
        Booking::request(BookingId::new(), owner, ClassId::new(), now())
    }

    fn token_of(booking: &Booking) -> String {
        booking.confirmation_token().as_str().to_string()
    }

    #[test]
    fn test_new_booking_is_pending() {
        let mut booking = pending_booking(UserId::new());

        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.booked_at(), now());
        assert!(!booking.email_confirmed());
        assert!(!booking.is_confirmed());
        assert!(booking.confirmed_at().is_none());

        let events = booking.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "BookingRequested");
        assert!(booking.take_events().is_empty());
    }

    #[test]
    fn test_confirm_with_valid_token() {
        let mut booking = pending_booking(UserId::new());
        let token = token_of(&booking);
        let confirmed_at = now() + Duration::minutes(5);

        booking.confirm(Some(&token), &open_capacity(), confirmed_at).unwrap();

        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert!(booking.email_confirmed());
        assert!(booking.is_confirmed());
        assert_eq!(booking.confirmed_at(), Some(confirmed_at));
    }

    #[test]
    fn test_confirm_without_token_fails() {
        let mut booking = pending_booking(UserId::new());
        assert_eq!(
            booking.confirm(None, &open_capacity(), now()),
            Err(DomainError::MissingToken)
        );
        assert_eq!(
            booking.confirm(Some(""), &open_capacity(), now()),
            Err(DomainError::MissingToken)
        );
    }

    #[test]
    fn test_confirm_with_wrong_token_fails() {
        let mut booking = pending_booking(UserId::new());
        let result = booking.confirm(Some("not-the-token"), &open_capacity(), now());
        assert_eq!(result, Err(DomainError::TokenMismatch));
        assert_eq!(booking.status(), BookingStatus::Pending);
    }

    #[test]
    fn test_confirm_twice_fails_and_keeps_first_timestamp() {
        let mut booking = pending_booking(UserId::new());
        let token = token_of(&booking);
        let first = now() + Duration::minutes(1);

        booking.confirm(Some(&token), &open_capacity(), first).unwrap();
        let second = booking.confirm(Some(&token), &open_capacity(), first + Duration::minutes(1));

        assert_eq!(second, Err(DomainError::AlreadyConfirmed));
        assert_eq!(booking.confirmed_at(), Some(first));
    }

    #[test]
    fn test_confirm_when_class_is_full_fails() {
        let mut booking = pending_booking(UserId::new());
        let token = token_of(&booking);

        let result = booking.confirm(Some(&token), &full_capacity(), now());

        assert_eq!(result, Err(DomainError::CapacityExceeded));
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert!(!booking.email_confirmed());
    }

    #[test]
    fn test_confirm_cancelled_booking_fails() {
        let owner = UserId::new();
        let mut booking = pending_booking(owner);
        let token = token_of(&booking);
        booking
            .cancel(&Actor::member(owner), now() + Duration::hours(5), now())
            .unwrap();

        let result = booking.confirm(Some(&token), &open_capacity(), now());
        assert!(matches!(result, Err(DomainError::InvalidBookingState(_))));
    }

    #[test]
    fn test_cancel_by_owner_before_cutoff() {
        let owner = UserId::new();
        let mut booking = pending_booking(owner);
        booking.take_events();

        booking
            .cancel(&Actor::member(owner), now() + Duration::hours(3), now())
            .unwrap();

        assert_eq!(booking.status(), BookingStatus::Cancelled);
        assert_eq!(booking.cancelled_at(), Some(now()));
        let events = booking.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "BookingCancelled");
    }

    #[test]
    fn test_cancel_by_staff_is_allowed() {
        let mut booking = pending_booking(UserId::new());
        let admin = Actor::admin(UserId::new());
        assert!(booking.cancel(&admin, now() + Duration::hours(3), now()).is_ok());
    }

    #[test]
    fn test_cancel_by_other_member_is_forbidden() {
        let mut booking = pending_booking(UserId::new());
        let stranger = Actor::member(UserId::new());
        let result = booking.cancel(&stranger, now() + Duration::hours(3), now());
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert_eq!(booking.status(), BookingStatus::Pending);
    }

    #[test]
    fn test_cancel_at_exact_cutoff_fails() {
        let owner = UserId::new();
        let mut booking = pending_booking(owner);
        let result = booking.cancel(&Actor::member(owner), now() + Duration::hours(2), now());
        assert!(matches!(result, Err(DomainError::CancellationWindowClosed(_))));
    }

    #[test]
    fn test_cancel_just_before_cutoff_succeeds() {
        let owner = UserId::new();
        let mut booking = pending_booking(owner);
        let class_start = now() + Duration::hours(2) + Duration::seconds(1);
        assert!(booking.cancel(&Actor::member(owner), class_start, now()).is_ok());
    }

    #[test]
    fn test_cancel_twice_fails() {
        let owner = UserId::new();
        let mut booking = pending_booking(owner);
        let class_start = now() + Duration::hours(3);
        booking.cancel(&Actor::member(owner), class_start, now()).unwrap();

        let result = booking.cancel(&Actor::member(owner), class_start, now());
        assert!(matches!(result, Err(DomainError::CancellationWindowClosed(_))));
    }

    #[test]
    fn test_mark_attended_requires_confirmed() {
        let mut booking = pending_booking(UserId::new());
        let instructor = Actor::new(UserId::new(), Role::Instructor);

        let result = booking.mark_attended(&instructor, now());
        assert!(matches!(result, Err(DomainError::InvalidBookingState(_))));

        let token = token_of(&booking);
        booking.confirm(Some(&token), &open_capacity(), now()).unwrap();
        booking.mark_attended(&instructor, now()).unwrap();
        assert_eq!(booking.status(), BookingStatus::Attended);
    }

    #[test]
    fn test_mark_no_show_by_member_is_forbidden() {
        let owner = UserId::new();
        let mut booking = pending_booking(owner);
        let token = token_of(&booking);
        booking.confirm(Some(&token), &open_capacity(), now()).unwrap();

        let result = booking.mark_no_show(&Actor::member(owner), now());
        assert!(matches!(result, Err(DomainError::Forbidden(_))));

        booking.mark_no_show(&Actor::admin(UserId::new()), now()).unwrap();
        assert_eq!(booking.status(), BookingStatus::NoShow);
    }

    #[test]
    fn test_attended_booking_cannot_be_cancelled() {
        let owner = UserId::new();
        let mut booking = pending_booking(owner);
        let token = token_of(&booking);
        booking.confirm(Some(&token), &open_capacity(), now()).unwrap();
        booking.mark_attended(&Actor::admin(UserId::new()), now()).unwrap();

        let result = booking.cancel(&Actor::member(owner), now() + Duration::hours(5), now());
        assert!(matches!(result, Err(DomainError::CancellationWindowClosed(_))));
    }
}
