use crate::domain::model::Booking;

/// 予約確認リンクの生成
/// 公開URLは起動時の設定から受け取る
#[derive(Debug, Clone)]
pub struct ConfirmationLinkBuilder {
    public_base_url: String,
}

impl ConfirmationLinkBuilder {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        let url: String = public_base_url.into();
        Self {
            public_base_url: url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/bookings/{id}/confirm?token={token}`
    /// トークンはURLセーフなbase64なのでエスケープ不要
    pub fn link_for(&self, booking: &Booking) -> String {
        format!(
            "{}/bookings/{}/confirm?token={}",
            self.public_base_url,
            booking.id(),
            booking.confirmation_token().as_str()
        )
    }
}
