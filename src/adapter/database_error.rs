use crate::domain::port::RepositoryError;
use sqlx::mysql::MySqlDatabaseError;

/// MySQLのロック待ちタイムアウト（ER_LOCK_WAIT_TIMEOUT）
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
/// MySQLのデッドロック検出（ER_LOCK_DEADLOCK）
const ER_LOCK_DEADLOCK: u16 = 1213;
/// MySQLの一意制約違反（ER_DUP_ENTRY）
const ER_DUP_ENTRY: u16 = 1062;

/// データベースエラー型
/// データベース操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    /// データベース接続エラー
    #[error("Database connection error: {0}")]
    ConnectionError(String),
    /// SQLクエリエラー
    #[error("Database query error: {0}")]
    QueryError(String),
    /// マイグレーションエラー
    #[error("Migration error: {0}")]
    MigrationError(String),
    /// ロック待ちのタイムアウト、デッドロック、コネクション取得のタイムアウト
    #[error("Database lock timeout: {0}")]
    LockTimeout(String),
    /// 一意制約違反。並行するトランザクションが先に同じ行を作成した
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),
}

impl DatabaseError {
    /// sqlxのエラーを分類する
    /// ロック競合は `LockTimeout` に、一意制約違反は `DuplicateEntry` に分類する（どちらも再試行可能）
    ///
    /// # Arguments
    /// * `context` - 失敗した操作の説明
    /// * `err` - sqlxのエラー
    pub fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        let message = format!("{}: {}", context, err);
        match &err {
            sqlx::Error::PoolTimedOut => DatabaseError::LockTimeout(message),
            sqlx::Error::Database(db_err) => match db_err.try_downcast_ref::<MySqlDatabaseError>() {
                Some(mysql_err) => Self::from_mysql_code(mysql_err.number(), message),
                None => DatabaseError::QueryError(message),
            },
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionError(message)
            }
            _ => DatabaseError::QueryError(message),
        }
    }

    /// MySQLのエラー番号から分類する
    fn from_mysql_code(number: u16, message: String) -> Self {
        match number {
            ER_LOCK_WAIT_TIMEOUT | ER_LOCK_DEADLOCK => DatabaseError::LockTimeout(message),
            ER_DUP_ENTRY => DatabaseError::DuplicateEntry(message),
            _ => DatabaseError::QueryError(message),
        }
    }
}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::LockTimeout(msg) => RepositoryError::Conflict(msg),
            DatabaseError::DuplicateEntry(msg) => RepositoryError::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_retryable_conflict() {
        let err = DatabaseError::from_sqlx("トランザクション開始", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DatabaseError::LockTimeout(_)));

        let repo_err = RepositoryError::from(err);
        assert!(repo_err.is_retryable());
    }

    #[test]
    fn test_row_not_found_is_query_error() {
        let err = DatabaseError::from_sqlx("書籍の取得", sqlx::Error::RowNotFound);
        assert!(matches!(err, DatabaseError::QueryError(_)));
        assert!(err.to_string().starts_with("Database query error: 書籍の取得"));
        assert!(!RepositoryError::from(err).is_retryable());
    }

    #[test]
    fn test_mysql_error_numbers_are_classified() {
        assert!(matches!(
            DatabaseError::from_mysql_code(1205, "lock wait".to_string()),
            DatabaseError::LockTimeout(_)
        ));
        assert!(matches!(
            DatabaseError::from_mysql_code(1213, "deadlock".to_string()),
            DatabaseError::LockTimeout(_)
        ));
        assert!(matches!(
            DatabaseError::from_mysql_code(1146, "no such table".to_string()),
            DatabaseError::QueryError(_)
        ));
    }

    #[test]
    fn test_duplicate_cart_line_is_retryable_conflict() {
        let err = DatabaseError::from_mysql_code(
            1062,
            "カート明細の追加に失敗しました: Duplicate entry for key 'uq_cart_lines_user_book'"
                .to_string(),
        );
        assert!(matches!(err, DatabaseError::DuplicateEntry(_)));

        let repo_err = RepositoryError::from(err);
        assert!(matches!(repo_err, RepositoryError::Conflict(_)));
        assert!(repo_err.is_retryable());
    }

    #[test]
    fn test_conversion_to_repository_error() {
        assert_eq!(
            RepositoryError::from(DatabaseError::ConnectionError("down".to_string())),
            RepositoryError::ConnectionFailed("down".to_string())
        );
        assert_eq!(
            RepositoryError::from(DatabaseError::MigrationError("bad".to_string())),
            RepositoryError::OperationFailed("bad".to_string())
        );
    }
}
