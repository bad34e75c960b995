use crate::adapter::database_error::DatabaseError;
use crate::adapter::driven::book_repository::{book_from_row, BOOK_COLUMNS};
use crate::adapter::driven::cart_repository::{cart_line_from_row, CART_LINE_COLUMNS};
use crate::adapter::driven::order_repository::{orders_from_rows, ORDER_SELECT};
use crate::adapter::driven::placeholders;
use crate::domain::model::{Book, BookId, CartLine, CartLineId, Order, OrderId, UserId};
use crate::domain::port::{RepositoryError, StoreTransaction, UnitOfWork};
use async_trait::async_trait;
use sqlx::{MySql, Pool, Transaction};

/// MySQLのトランザクション境界
/// ロック待ちの上限はコネクションのセッション変数（innodb_lock_wait_timeout）で決まる
#[derive(Clone)]
pub struct MySqlUnitOfWork {
    pool: Pool<MySql>,
}

impl MySqlUnitOfWork {
    /// 新しいMySQLトランザクション境界を作成
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for MySqlUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepositoryError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクション開始に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(Box::new(MySqlTransaction { tx }))
    }
}

/// 実行中のMySQLトランザクション
/// コミットせずにドロップするとsqlxがロールバックする
pub struct MySqlTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl StoreTransaction for MySqlTransaction {
    async fn lock_book(&mut self, book_id: BookId) -> Result<Option<Book>, RepositoryError> {
        let sql = format!("SELECT {} FROM books WHERE id = ? FOR UPDATE", BOOK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(book_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("書籍のロックに失敗しました", e))
            .map_err(RepositoryError::from)?;

        row.as_ref().map(book_from_row).transpose()
    }

    async fn save_book_stock(&mut self, book: &Book) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE books SET available_quantity = ? WHERE id = ?")
            .bind(book.available_quantity())
            .bind(book.id().to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("在庫の保存に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn lock_cart_line(
        &mut self,
        cart_line_id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM cart_lines WHERE id = ? FOR UPDATE",
            CART_LINE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(cart_line_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("カート明細のロックに失敗しました", e))
            .map_err(RepositoryError::from)?;

        row.as_ref().map(cart_line_from_row).transpose()
    }

    async fn lock_cart_lines_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM cart_lines WHERE user_id = ? ORDER BY created_at ASC, id ASC FOR UPDATE",
            CART_LINE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("カートのロックに失敗しました", e))
            .map_err(RepositoryError::from)?;

        rows.iter().map(cart_line_from_row).collect()
    }

    async fn insert_cart_line(&mut self, line: &CartLine) -> Result<(), RepositoryError> {
        // (user_id, book_id) の一意制約違反は並行する追加との競合として返る
        sqlx::query(
            r#"
            INSERT INTO cart_lines (id, user_id, book_id, quantity, total_price)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(line.id().to_string())
        .bind(line.user_id().to_string())
        .bind(line.book_id().to_string())
        .bind(line.quantity())
        .bind(line.total_price().amount())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DatabaseError::from_sqlx("カート明細の追加に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn update_cart_line(&mut self, line: &CartLine) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE cart_lines SET quantity = ?, total_price = ? WHERE id = ?")
            .bind(line.quantity())
            .bind(line.total_price().amount())
            .bind(line.id().to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("カート明細の更新に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn delete_cart_lines(&mut self, ids: &[CartLineId]) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "DELETE FROM cart_lines WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }

        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("カート明細の削除に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let address = order.address();
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, order_date, price, quantity,
                name, phone_number, pin_code, locality, address, city, landmark,
                cancelled
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id().to_string())
        .bind(order.user_id().to_string())
        .bind(order.order_date())
        .bind(order.price().amount())
        .bind(order.quantity())
        .bind(address.name())
        .bind(address.phone_number())
        .bind(address.pin_code())
        .bind(address.locality())
        .bind(address.address())
        .bind(address.city())
        .bind(address.landmark())
        .bind(order.is_cancelled())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DatabaseError::from_sqlx("注文の保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        for (position, book) in order.books().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_books (order_id, position, book_id, name, unit_price, quantity)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(order.id().to_string())
            .bind(position as u32)
            .bind(book.book_id().to_string())
            .bind(book.name())
            .bind(book.unit_price().amount())
            .bind(book.quantity())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("注文書籍の保存に失敗しました", e))
            .map_err(RepositoryError::from)?;
        }

        Ok(())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "{} WHERE o.id = ? ORDER BY ob.position ASC FOR UPDATE",
            ORDER_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(order_id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("注文のロックに失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(orders_from_rows(&rows)?.into_iter().next())
    }

    async fn save_order_cancellation(&mut self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET cancelled = ? WHERE id = ?")
            .bind(order.is_cancelled())
            .bind(order.id().to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("注文のキャンセルの保存に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクションのコミットに失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(())
    }
}
