use crate::domain::error::DomainError;
use crate::domain::port::{RepositoryError, StoreError};

/// アプリケーション層のエラー型
/// ドメインエラー、リポジトリエラー、認可エラーをラップする
#[derive(Debug)]
pub enum ApplicationError {
    /// ドメインエラー（ビジネスルール違反）
    DomainError(DomainError),
    /// リポジトリエラー（永続化の失敗）
    RepositoryError(RepositoryError),
    /// エンティティが見つからない（または参照権限がない）
    NotFound(String),
}

impl std::fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationError::DomainError(err) => write!(f, "Domain error: {}", err),
            ApplicationError::RepositoryError(err) => write!(f, "Repository error: {}", err),
            ApplicationError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for ApplicationError {}

// From実装でエラー変換を簡潔に
impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        ApplicationError::DomainError(err)
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        ApplicationError::RepositoryError(err)
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(e) => ApplicationError::DomainError(e),
            StoreError::ClassNotFound(id) => {
                ApplicationError::NotFound(format!("クラスが見つかりません: {}", id))
            }
            StoreError::BookingNotFound(id) => {
                ApplicationError::NotFound(format!("予約が見つかりません: {}", id))
            }
            StoreError::Repository(e) => ApplicationError::RepositoryError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::BookingId;

    #[test]
    fn test_store_error_conversion() {
        let rejected: ApplicationError = StoreError::Rejected(DomainError::CapacityExceeded).into();
        assert!(matches!(
            rejected,
            ApplicationError::DomainError(DomainError::CapacityExceeded)
        ));

        let missing: ApplicationError = StoreError::BookingNotFound(BookingId::new()).into();
        assert!(matches!(missing, ApplicationError::NotFound(_)));
    }
}
