use crate::domain::port::RepositoryError;

/// データベースエラー型
/// データベース操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseError {
    /// データベース接続・トランザクション開始エラー
    ConnectionError(String),
    /// SQLクエリエラー
    QueryError(String),
    /// 取得した行をドメインモデルに変換できない
    DecodeError(String),
    /// マイグレーションエラー
    MigrationError(String),
}

impl DatabaseError {
    /// 一意制約違反か（重複予約の最終防衛線として使う）
    pub fn is_unique_violation(error: &sqlx::Error) -> bool {
        match error {
            sqlx::Error::Database(db_error) => db_error.is_unique_violation(),
            _ => false,
        }
    }

    pub fn query(context: &str, error: sqlx::Error) -> Self {
        DatabaseError::QueryError(format!("{}: {}", context, error))
    }
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::ConnectionError(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::QueryError(msg) => write!(f, "Database query error: {}", msg),
            DatabaseError::DecodeError(msg) => write!(f, "Row decode error: {}", msg),
            DatabaseError::MigrationError(msg) => write!(f, "Migration error: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::DecodeError(msg) => RepositoryError::FetchFailed(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_repository_error() {
        assert_eq!(
            RepositoryError::from(DatabaseError::ConnectionError("down".to_string())),
            RepositoryError::ConnectionFailed("down".to_string())
        );
        assert_eq!(
            RepositoryError::from(DatabaseError::DecodeError("bad uuid".to_string())),
            RepositoryError::FetchFailed("bad uuid".to_string())
        );
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!DatabaseError::is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
