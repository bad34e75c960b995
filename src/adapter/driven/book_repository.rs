use crate::adapter::database_error::DatabaseError;
use crate::adapter::driven::placeholders;
use crate::domain::model::{Book, BookId, Money};
use crate::domain::port::{BookRepository, RepositoryError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

pub(super) const BOOK_COLUMNS: &str = "id, name, author, description, price, available_quantity";

/// booksテーブルの行から書籍を再構築する
pub(super) fn book_from_row(row: &MySqlRow) -> Result<Book, RepositoryError> {
    let id = BookId::from_string(row.get("id"))
        .map_err(|e| RepositoryError::FetchFailed(format!("書籍IDの解析に失敗しました: {}", e)))?;

    let price = Money::new(row.get::<Decimal, _>("price"))
        .map_err(|e| RepositoryError::FetchFailed(format!("単価の構築に失敗しました: {}", e)))?;

    Ok(Book::new(
        id,
        row.get("name"),
        row.get("author"),
        row.get("description"),
        price,
        row.get::<u32, _>("available_quantity"),
    ))
}

/// MySQL書籍リポジトリ
/// カタログの読み取りを提供する。在庫の更新はトランザクション内で行う
#[derive(Clone)]
pub struct MySqlBookRepository {
    pool: Pool<MySql>,
}

impl MySqlBookRepository {
    /// 新しいMySQL書籍リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for MySqlBookRepository {
    async fn find_by_ids(&self, book_ids: &[BookId]) -> Result<Vec<Book>, RepositoryError> {
        if book_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM books WHERE id IN ({}) ORDER BY id ASC",
            BOOK_COLUMNS,
            placeholders(book_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for book_id in book_ids {
            query = query.bind(book_id.to_string());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("書籍一覧の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        rows.iter().map(book_from_row).collect()
    }
}
