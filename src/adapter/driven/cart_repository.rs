use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{BookId, CartLine, CartLineId, Money, UserId};
use crate::domain::port::{CartRepository, RepositoryError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

pub(super) const CART_LINE_COLUMNS: &str = "id, user_id, book_id, quantity, total_price";

/// cart_linesテーブルの行からカート明細を再構築する
pub(super) fn cart_line_from_row(row: &MySqlRow) -> Result<CartLine, RepositoryError> {
    let id = CartLineId::from_string(row.get("id")).map_err(|e| {
        RepositoryError::FetchFailed(format!("カート明細IDの解析に失敗しました: {}", e))
    })?;
    let user_id = UserId::from_string(row.get("user_id"))
        .map_err(|e| RepositoryError::FetchFailed(format!("ユーザーIDの解析に失敗しました: {}", e)))?;
    let book_id = BookId::from_string(row.get("book_id"))
        .map_err(|e| RepositoryError::FetchFailed(format!("書籍IDの解析に失敗しました: {}", e)))?;
    let total_price = Money::new(row.get::<Decimal, _>("total_price"))
        .map_err(|e| RepositoryError::FetchFailed(format!("合計金額の構築に失敗しました: {}", e)))?;

    Ok(CartLine::reconstruct(
        id,
        user_id,
        book_id,
        row.get::<u32, _>("quantity"),
        total_price,
    ))
}

/// MySQLカートリポジトリ
#[derive(Clone)]
pub struct MySqlCartRepository {
    pool: Pool<MySql>,
}

impl MySqlCartRepository {
    /// 新しいMySQLカートリポジトリを作成
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for MySqlCartRepository {
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM cart_lines WHERE user_id = ? ORDER BY created_at ASC, id ASC",
            CART_LINE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("カートの取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        rows.iter().map(cart_line_from_row).collect()
    }

    async fn find_all(&self) -> Result<Vec<CartLine>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM cart_lines ORDER BY user_id ASC, created_at ASC, id ASC",
            CART_LINE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("カート一覧の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        rows.iter().map(cart_line_from_row).collect()
    }
}
