/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// クラスが予約受付可能な状態でない（非公開、中止、開始直前など）
    NotBookable(String),
    /// 定員超過
    CapacityExceeded,
    /// 同じクラスに有効な予約が既に存在する
    DuplicateBooking,
    /// 確認トークンが指定されていない
    MissingToken,
    /// 確認トークンが一致しない
    TokenMismatch,
    /// 既にメール確認済み
    AlreadyConfirmed,
    /// 操作権限がない（例: 他人の予約をキャンセルしようとした）
    Forbidden(String),
    /// キャンセル受付期間外、またはキャンセルできない状態
    CancellationWindowClosed(String),
    /// 無効な予約状態（例: 仮予約を出席済みにしようとした）
    InvalidBookingState(String),
    /// 無効なスケジュール（例: 終了時刻が開始時刻より前）
    InvalidSchedule(String),
    /// 無効な値
    InvalidValue(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotBookable(msg) => write!(f, "Class cannot be booked: {}", msg),
            DomainError::CapacityExceeded => write!(f, "Class is fully booked"),
            DomainError::DuplicateBooking => {
                write!(f, "An active booking for this class already exists")
            }
            DomainError::MissingToken => write!(f, "Confirmation token is required"),
            DomainError::TokenMismatch => write!(f, "Invalid confirmation token"),
            DomainError::AlreadyConfirmed => write!(f, "Booking already confirmed"),
            DomainError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            DomainError::CancellationWindowClosed(msg) => {
                write!(f, "Booking cannot be cancelled: {}", msg)
            }
            DomainError::InvalidBookingState(msg) => write!(f, "Invalid booking state: {}", msg),
            DomainError::InvalidSchedule(msg) => write!(f, "Invalid schedule: {}", msg),
            DomainError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
