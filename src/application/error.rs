use crate::domain::error::DomainError;
use crate::domain::port::RepositoryError;

/// アプリケーション層のエラー型
/// ドメインエラーとリポジトリエラーをラップし、前提条件の失敗を表現する
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// ドメインエラー（ビジネスルール違反）
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// リポジトリエラー（永続化の失敗）
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// ユーザー・書籍・カート明細・注文が見つからない
    #[error("{0}")]
    NotFound(String),
    /// 操作対象を所有していない
    #[error("{0}")]
    Unauthorized(String),
}

impl ApplicationError {
    /// 操作全体を再試行すれば成功し得るエラーか
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApplicationError::Repository(err) if err.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_descriptive() {
        let err = ApplicationError::NotFound("Order NOT Found with ID : 2".to_string());
        assert_eq!(err.to_string(), "Order NOT Found with ID : 2");

        let err = ApplicationError::from(DomainError::InsufficientStock {
            requested: 6,
            available: 5,
        });
        assert_eq!(err.to_string(), "Insufficient stock: requested 6, available 5");
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        let conflict = ApplicationError::from(RepositoryError::Conflict("lock wait".to_string()));
        assert!(conflict.is_retryable());

        let failed = ApplicationError::from(RepositoryError::OperationFailed("x".to_string()));
        assert!(!failed.is_retryable());
        assert!(!ApplicationError::NotFound("x".to_string()).is_retryable());
    }
}
