use crate::domain::error::DomainError;
use crate::domain::model::{Book, BookId, CartLineId, Money, UserId};
use crate::domain::service::PricingEngine;

/// カート明細
/// (ユーザー, 書籍, 数量) の予約。注文確定前の状態を表す
/// 明細金額は数量を変更するたびに再計算してキャッシュする
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    id: CartLineId,
    user_id: UserId,
    book_id: BookId,
    quantity: u32,
    total_price: Money,
}

impl CartLine {
    /// 新しいカート明細を作成
    /// 在庫の予約はInventoryGuardで済ませておくこと
    ///
    /// # Arguments
    /// * `id` - 明細ID
    /// * `user_id` - 所有ユーザー
    /// * `book` - 参照する書籍
    /// * `quantity` - 数量（1以上）
    pub fn new(
        id: CartLineId,
        user_id: UserId,
        book: &Book,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(
                "数量は1以上である必要があります".to_string(),
            ));
        }
        Ok(Self {
            id,
            user_id,
            book_id: book.id(),
            quantity,
            total_price: PricingEngine::line_total(book, quantity)?,
        })
    }

    /// データベースから取得したデータでカート明細を再構築
    pub fn reconstruct(
        id: CartLineId,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
        total_price: Money,
    ) -> Self {
        Self {
            id,
            user_id,
            book_id,
            quantity,
            total_price,
        }
    }

    /// 明細IDを取得
    pub fn id(&self) -> CartLineId {
        self.id
    }

    /// 所有ユーザーIDを取得
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// 書籍IDを取得
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    /// 数量を取得
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// キャッシュされた明細金額を取得
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// 指定ユーザーの明細か
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// 数量を変更し、明細金額を再計算する
    /// 在庫の増減はInventoryGuard::rebalanceで済ませておくこと
    pub fn change_quantity(&mut self, book: &Book, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(
                "数量は1以上である必要があります".to_string(),
            ));
        }
        let total_price = PricingEngine::line_total(book, quantity)?;
        self.quantity = quantity;
        self.total_price = total_price;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn book() -> Book {
        Book::new(
            BookId::new(),
            "Test Book".to_string(),
            "Author".to_string(),
            "Description".to_string(),
            Money::new(Decimal::from(100)).unwrap(),
            5,
        )
    }

    #[test]
    fn test_cart_line_caches_total() {
        let book = book();
        let line = CartLine::new(CartLineId::new(), UserId::new(), &book, 2).unwrap();
        assert_eq!(line.total_price().amount(), Decimal::from(200));
        assert_eq!(line.book_id(), book.id());
    }

    #[test]
    fn test_cart_line_zero_quantity_fails() {
        let result = CartLine::new(CartLineId::new(), UserId::new(), &book(), 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_change_quantity_recomputes_total() {
        let book = book();
        let mut line = CartLine::new(CartLineId::new(), UserId::new(), &book, 1).unwrap();
        line.change_quantity(&book, 4).unwrap();
        assert_eq!(line.quantity(), 4);
        assert_eq!(line.total_price().amount(), Decimal::from(400));
    }

    #[test]
    fn test_change_quantity_past_price_limit_keeps_line() {
        let book = Book::new(
            BookId::new(),
            "Expensive Book".to_string(),
            "Author".to_string(),
            "Description".to_string(),
            Money::new(Money::MAX_AMOUNT).unwrap(),
            5,
        );
        let mut line = CartLine::new(CartLineId::new(), UserId::new(), &book, 1).unwrap();

        let result = line.change_quantity(&book, 2);

        assert!(matches!(result, Err(DomainError::InvalidValue(_))));
        assert_eq!(line.quantity(), 1);
        assert_eq!(line.total_price(), book.price());
    }

    #[test]
    fn test_ownership() {
        let owner = UserId::new();
        let line = CartLine::new(CartLineId::new(), owner, &book(), 1).unwrap();
        assert!(line.is_owned_by(owner));
        assert!(!line.is_owned_by(UserId::new()));
    }
}
