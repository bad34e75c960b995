use crate::domain::model::OrderId;

/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// 在庫不足（要求数量が現在の在庫数を超えている）
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },
    /// 無効な数量（例: 0以下、または在庫を超える数量への変更）
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    /// 既にキャンセル済みの注文に対する操作
    #[error("Order already cancelled with ID : {0}")]
    AlreadyCancelled(OrderId),
    /// 無効な値
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
