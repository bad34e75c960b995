use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{Address, BookId, Money, Order, OrderId, OrderedBook, UserId};
use crate::domain::port::{OrderRepository, RepositoryError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};
use std::collections::HashMap;

/// ordersとorder_booksをJOINして取得するSELECT句
pub(super) const ORDER_SELECT: &str = r#"
    SELECT
        o.id, o.user_id, o.order_date, o.price, o.quantity,
        o.name, o.phone_number, o.pin_code, o.locality, o.address, o.city, o.landmark,
        o.cancelled,
        ob.book_id, ob.name AS book_name, ob.unit_price, ob.quantity AS book_quantity
    FROM orders o
    LEFT JOIN order_books ob ON o.id = ob.order_id
"#;

/// JOINされた行から注文のリストを再構築する
/// 行に現れた順序を保ったまま注文ごとにまとめる
pub(super) fn orders_from_rows(rows: &[MySqlRow]) -> Result<Vec<Order>, RepositoryError> {
    let mut order_ids: Vec<String> = Vec::new();
    let mut order_groups: HashMap<String, Vec<&MySqlRow>> = HashMap::new();
    for row in rows {
        let order_id: String = row.get("id");
        if !order_groups.contains_key(&order_id) {
            order_ids.push(order_id.clone());
        }
        order_groups.entry(order_id).or_default().push(row);
    }

    let mut orders = Vec::with_capacity(order_ids.len());
    for order_id in order_ids {
        if let Some(order_rows) = order_groups.get(&order_id) {
            orders.push(order_from_rows(&order_id, order_rows)?);
        }
    }
    Ok(orders)
}

fn order_from_rows(order_id: &str, rows: &[&MySqlRow]) -> Result<Order, RepositoryError> {
    let first_row = rows
        .first()
        .ok_or_else(|| RepositoryError::FetchFailed(format!("注文の行がありません: {}", order_id)))?;

    let id = OrderId::from_string(order_id)
        .map_err(|e| RepositoryError::FetchFailed(format!("注文IDの解析に失敗しました: {}", e)))?;
    let user_id = UserId::from_string(first_row.get("user_id"))
        .map_err(|e| RepositoryError::FetchFailed(format!("ユーザーIDの解析に失敗しました: {}", e)))?;
    let price = Money::new(first_row.get::<Decimal, _>("price"))
        .map_err(|e| RepositoryError::FetchFailed(format!("合計金額の構築に失敗しました: {}", e)))?;

    let address = Address::new(
        first_row.get("name"),
        first_row.get("phone_number"),
        first_row.get("pin_code"),
        first_row.get("locality"),
        first_row.get("address"),
        first_row.get("city"),
        first_row.get::<Option<String>, _>("landmark"),
    );

    // LEFT JOINのため、書籍を含まない注文ではbook_idがNULLになる
    let mut books = Vec::new();
    for row in rows {
        if let (Some(book_id), Some(name), Some(unit_price), Some(quantity)) = (
            row.get::<Option<String>, _>("book_id"),
            row.get::<Option<String>, _>("book_name"),
            row.get::<Option<Decimal>, _>("unit_price"),
            row.get::<Option<u32>, _>("book_quantity"),
        ) {
            let book_id = BookId::from_string(&book_id).map_err(|e| {
                RepositoryError::FetchFailed(format!("書籍IDの解析に失敗しました: {}", e))
            })?;
            let unit_price = Money::new(unit_price).map_err(|e| {
                RepositoryError::FetchFailed(format!("単価の構築に失敗しました: {}", e))
            })?;
            let book = OrderedBook::new(book_id, name, unit_price, quantity).map_err(|e| {
                RepositoryError::FetchFailed(format!("注文書籍の構築に失敗しました: {}", e))
            })?;
            books.push(book);
        }
    }

    Ok(Order::reconstruct(
        id,
        user_id,
        first_row.get("order_date"),
        price,
        first_row.get::<u32, _>("quantity"),
        address,
        books,
        first_row.get::<bool, _>("cancelled"),
    ))
}

/// MySQL注文リポジトリ
/// 注文の読み取りを提供する。書き込みはトランザクション内で行う
#[derive(Clone)]
pub struct MySqlOrderRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderRepository {
    /// 新しいMySQL注文リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{} WHERE o.id = ? ORDER BY ob.position ASC", ORDER_SELECT);
        let rows = sqlx::query(&sql)
            .bind(order_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("注文の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(orders_from_rows(&rows)?.into_iter().next())
    }

    async fn find_active(&self) -> Result<Vec<Order>, RepositoryError> {
        // 注文日の降順。同じ日の注文は作成日時の降順
        let sql = format!(
            "{} WHERE o.cancelled = FALSE ORDER BY o.order_date DESC, o.created_at DESC, o.id ASC, ob.position ASC",
            ORDER_SELECT
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("注文一覧の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        orders_from_rows(&rows)
    }
}
