use crate::domain::model::{BookId, Money};

/// 書籍
/// カタログが所有するエンティティ。カートと注文からは参照されるのみ
/// 在庫数はカートへの追加で減り、カートからの削除・数量減で戻る
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    id: BookId,
    name: String,
    author: String,
    description: String,
    price: Money,
    available_quantity: u32,
}

impl Book {
    /// 書籍を作成
    ///
    /// # Arguments
    /// * `id` - 書籍ID
    /// * `name` - 書名
    /// * `author` - 著者
    /// * `description` - 説明
    /// * `price` - 単価
    /// * `available_quantity` - 在庫数
    pub fn new(
        id: BookId,
        name: String,
        author: String,
        description: String,
        price: Money,
        available_quantity: u32,
    ) -> Self {
        Self {
            id,
            name,
            author,
            description,
            price,
            available_quantity,
        }
    }

    /// 書籍IDを取得
    pub fn id(&self) -> BookId {
        self.id
    }

    /// 書名を取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 著者を取得
    pub fn author(&self) -> &str {
        &self.author
    }

    /// 説明を取得
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 単価を取得
    pub fn price(&self) -> Money {
        self.price
    }

    /// 在庫数を取得
    pub fn available_quantity(&self) -> u32 {
        self.available_quantity
    }

    /// 在庫数を書き換える
    /// 検証はInventoryGuardが行う
    pub(crate) fn set_available_quantity(&mut self, quantity: u32) {
        self.available_quantity = quantity;
    }

    /// 単価を変更する（カタログ側の価格改定）
    pub fn reprice(&mut self, price: Money) {
        self.price = price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_book_creation() {
        let book_id = BookId::new();
        let book = Book::new(
            book_id,
            "Test Book".to_string(),
            "Author".to_string(),
            "Description".to_string(),
            Money::new(Decimal::from(100)).unwrap(),
            5,
        );
        assert_eq!(book.id(), book_id);
        assert_eq!(book.available_quantity(), 5);
        assert_eq!(book.price().amount(), Decimal::from(100));
    }

    #[test]
    fn test_reprice_keeps_stock() {
        let mut book = Book::new(
            BookId::new(),
            "Test Book".to_string(),
            "Author".to_string(),
            "Description".to_string(),
            Money::new(Decimal::from(100)).unwrap(),
            5,
        );
        book.reprice(Money::new(Decimal::from(120)).unwrap());
        assert_eq!(book.price().amount(), Decimal::from(120));
        assert_eq!(book.available_quantity(), 5);
    }
}
