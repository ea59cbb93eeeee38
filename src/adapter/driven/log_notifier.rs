use crate::domain::port::{BookingNotice, BookingNotifier, NotificationError};
use async_trait::async_trait;

/// 開発用の予約通知
/// メールを送る代わりに、本文を構造化ログとして出力する
/// 宛先はユーザーIDで表す（メールアドレスの解決は認証基盤側の責務）
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }

    fn confirmation_body(notice: &BookingNotice, link: &str) -> String {
        format!(
            "Your booking for {} on {} is pending. Confirm it here: {}",
            notice.class_name,
            notice.starts_at.format("%Y-%m-%d %H:%M UTC"),
            link
        )
    }

    fn cancellation_body(notice: &BookingNotice) -> String {
        format!(
            "Your booking for {} on {} has been cancelled.",
            notice.class_name,
            notice.starts_at.format("%Y-%m-%d %H:%M UTC")
        )
    }
}

#[async_trait]
impl BookingNotifier for LogNotifier {
    async fn send_confirmation(&self, notice: &BookingNotice) -> Result<(), NotificationError> {
        let link = notice.confirmation_link.as_deref().ok_or_else(|| {
            NotificationError::DeliveryFailed("confirmation link is missing".to_string())
        })?;

        tracing::info!(
            to = %notice.user_id,
            booking_id = %notice.booking_id,
            subject = "Confirm your booking",
            body = %Self::confirmation_body(notice, link),
            "booking confirmation email (log delivery)"
        );
        Ok(())
    }

    async fn send_cancellation(&self, notice: &BookingNotice) -> Result<(), NotificationError> {
        tracing::info!(
            to = %notice.user_id,
            booking_id = %notice.booking_id,
            subject = "Booking cancelled",
            body = %Self::cancellation_body(notice),
            "booking cancellation email (log delivery)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BookingId, ClassId, UserId};
    use chrono::{TimeZone, Utc};

    fn notice(link: Option<&str>) -> BookingNotice {
        BookingNotice {
            booking_id: BookingId::new(),
            user_id: UserId::new(),
            class_id: ClassId::new(),
            class_name: "Yoga".to_string(),
            starts_at: Utc.with_ymd_and_hms(2030, 1, 2, 18, 30, 0).unwrap(),
            confirmation_link: link.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_confirmation_requires_link() {
        let notifier = LogNotifier::new();
        assert!(notifier.send_confirmation(&notice(None)).await.is_err());
        assert!(notifier
            .send_confirmation(&notice(Some("http://localhost:3000/bookings/x/confirm?token=t")))
            .await
            .is_ok());
    }

    #[test]
    fn test_bodies_mention_class_and_time() {
        let notice = notice(Some("http://link"));
        let body = LogNotifier::confirmation_body(&notice, "http://link");
        assert!(body.contains("Yoga"));
        assert!(body.contains("2030-01-02 18:30 UTC"));
        assert!(body.ends_with("http://link"));
        assert!(LogNotifier::cancellation_body(&notice).contains("cancelled"));
    }
}
