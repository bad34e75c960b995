use crate::domain::error::DomainError;
use crate::domain::model::Book;

/// 在庫ガード
/// カート操作に伴う在庫数の増減を検証して書籍に適用する
/// 変更後の書籍の保存は呼び出し側が行う
pub struct InventoryGuard;

impl InventoryGuard {
    /// 在庫を予約する
    ///
    /// # Arguments
    /// * `book` - 対象の書籍
    /// * `requested` - 予約する数量
    ///
    /// # Returns
    /// * `Ok(())` - 予約成功（書籍の在庫数が減る）
    /// * `Err(DomainError::InvalidQuantity)` - 数量が0
    /// * `Err(DomainError::InsufficientStock)` - 在庫不足（書籍は変更されない）
    pub fn reserve(book: &mut Book, requested: u32) -> Result<(), DomainError> {
        if requested == 0 {
            return Err(DomainError::InvalidQuantity(
                "数量は1以上である必要があります".to_string(),
            ));
        }
        let available = book.available_quantity();
        if requested > available {
            return Err(DomainError::InsufficientStock {
                requested,
                available,
            });
        }
        book.set_available_quantity(available - requested);
        Ok(())
    }

    /// 在庫を解放する（カートからの削除・数量減）
    ///
    /// # Arguments
    /// * `book` - 対象の書籍
    /// * `quantity` - 解放する数量
    pub fn release(book: &mut Book, quantity: u32) {
        let restored = book.available_quantity().saturating_add(quantity);
        book.set_available_quantity(restored);
    }

    /// カート明細の数量変更を在庫に反映する
    /// 増加分は予約し、減少分は解放する
    ///
    /// # Arguments
    /// * `book` - 明細が参照する書籍
    /// * `current` - 明細の現在の数量（予約済み）
    /// * `new_quantity` - 変更後の数量
    ///
    /// # Returns
    /// * `Ok(())` - 変更を適用
    /// * `Err(DomainError::InvalidQuantity)` - 数量が0、または在庫と予約済み数量の合計を超える
    pub fn rebalance(book: &mut Book, current: u32, new_quantity: u32) -> Result<(), DomainError> {
        if new_quantity == 0 {
            return Err(DomainError::InvalidQuantity(
                "数量は1以上である必要があります".to_string(),
            ));
        }

        if new_quantity > current {
            let additional = new_quantity - current;
            if additional > book.available_quantity() {
                return Err(DomainError::InvalidQuantity(format!(
                    "数量 {} は購入可能数 {} を超えています",
                    new_quantity,
                    book.available_quantity().saturating_add(current)
                )));
            }
            Self::reserve(book, additional)?;
        } else {
            Self::release(book, current - new_quantity);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BookId, Money};
    use rust_decimal::Decimal;

    fn book_with_stock(quantity: u32) -> Book {
        Book::new(
            BookId::new(),
            "Test Book".to_string(),
            "Author".to_string(),
            "Description".to_string(),
            Money::new(Decimal::from(100)).unwrap(),
            quantity,
        )
    }

    #[test]
    fn test_reserve_success() {
        let mut book = book_with_stock(10);
        let result = InventoryGuard::reserve(&mut book, 4);
        assert!(result.is_ok());
        assert_eq!(book.available_quantity(), 6);
    }

    #[test]
    fn test_reserve_exact_quantity() {
        let mut book = book_with_stock(5);
        assert!(InventoryGuard::reserve(&mut book, 5).is_ok());
        assert_eq!(book.available_quantity(), 0);
    }

    #[test]
    fn test_reserve_insufficient_stock() {
        let mut book = book_with_stock(5);
        let result = InventoryGuard::reserve(&mut book, 6);
        assert_eq!(
            result.unwrap_err(),
            DomainError::InsufficientStock {
                requested: 6,
                available: 5
            }
        );
        assert_eq!(book.available_quantity(), 5); // 在庫数は変わらない
    }

    #[test]
    fn test_reserve_zero_is_invalid() {
        let mut book = book_with_stock(5);
        let result = InventoryGuard::reserve(&mut book, 0);
        assert!(matches!(result, Err(DomainError::InvalidQuantity(_))));
    }

    #[test]
    fn test_release() {
        let mut book = book_with_stock(5);
        InventoryGuard::release(&mut book, 3);
        assert_eq!(book.available_quantity(), 8);
    }

    #[test]
    fn test_rebalance_increase_reserves_delta() {
        let mut book = book_with_stock(3);
        // 明細が2冊予約済みの状態で5冊に増やす（追加分3冊 <= 在庫3冊）
        assert!(InventoryGuard::rebalance(&mut book, 2, 5).is_ok());
        assert_eq!(book.available_quantity(), 0);
    }

    #[test]
    fn test_rebalance_decrease_releases_delta() {
        let mut book = book_with_stock(3);
        assert!(InventoryGuard::rebalance(&mut book, 4, 1).is_ok());
        assert_eq!(book.available_quantity(), 6);
    }

    #[test]
    fn test_rebalance_beyond_stock_is_invalid() {
        let mut book = book_with_stock(3);
        let result = InventoryGuard::rebalance(&mut book, 2, 6);
        assert!(matches!(result, Err(DomainError::InvalidQuantity(_))));
        assert_eq!(book.available_quantity(), 3);
    }

    #[test]
    fn test_rebalance_to_zero_is_invalid() {
        let mut book = book_with_stock(3);
        let result = InventoryGuard::rebalance(&mut book, 1, 0);
        assert!(matches!(result, Err(DomainError::InvalidQuantity(_))));
        assert_eq!(book.available_quantity(), 3);
    }
}
