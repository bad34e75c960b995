use crate::application::ApplicationError;
use crate::application::service::{AddressPayload, Listing};
use crate::domain::model::{Address, Book, CartLine, CartLineId, Order, OrderId, UserId};
use crate::domain::port::{OrderRepository, RepositoryError, UnitOfWork, UserRepository};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 注文アプリケーションサービス
/// カートから注文への変換と、注文のキャンセルを扱う
///
/// 状態遷移: (なし) → Placed → Cancelled
pub struct OrderApplicationService {
    user_repository: Arc<dyn UserRepository>,
    order_repository: Arc<dyn OrderRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
}

impl OrderApplicationService {
    /// 新しい注文アプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `user_repository` - ユーザーリポジトリ
    /// * `order_repository` - 注文リポジトリ
    /// * `unit_of_work` - トランザクション境界
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        order_repository: Arc<dyn OrderRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
    ) -> Self {
        Self {
            user_repository,
            order_repository,
            unit_of_work,
        }
    }

    /// ユーザーのカートを注文に変換する
    ///
    /// カート明細の読み取り、注文の保存、明細の削除を1つのトランザクションで行う。
    /// どこかで失敗した場合はすべて破棄され、カートは元のまま残る。
    /// カートが空でも金額0・数量0の注文として確定する
    ///
    /// # Arguments
    /// * `user_id` - 注文者
    /// * `address` - 配送先住所
    ///
    /// # Returns
    /// * `Ok(Order)` - 確定した注文
    /// * `Err(ApplicationError::NotFound)` - ユーザーが存在しない
    /// * `Err(ApplicationError::Repository(_))` - トランザクションの失敗（Conflictなら再試行可能）
    #[tracing::instrument(skip(self, address))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        address: AddressPayload,
    ) -> Result<Order, ApplicationError> {
        if self.user_repository.find_by_id(user_id).await?.is_none() {
            return Err(ApplicationError::NotFound(format!(
                "User NOT Found with ID : {}",
                user_id
            )));
        }

        let mut tx = self.unit_of_work.begin().await?;

        let lines = tx.lock_cart_lines_for_user(user_id).await?;

        let book_ids = lines.iter().map(CartLine::book_id).collect::<BTreeSet<_>>();
        let mut books: Vec<Book> = Vec::with_capacity(book_ids.len());
        for book_id in book_ids {
            let book = tx.lock_book(book_id).await?.ok_or_else(|| {
                ApplicationError::NotFound(format!("Book NOT Found with ID : {}", book_id))
            })?;
            books.push(book);
        }

        let mut priced = Vec::with_capacity(lines.len());
        for line in &lines {
            let book = books
                .iter()
                .find(|book| book.id() == line.book_id())
                .ok_or_else(|| {
                    ApplicationError::NotFound(format!(
                        "Book NOT Found with ID : {}",
                        line.book_id()
                    ))
                })?;
            priced.push((line, book));
        }

        let order = Order::place(
            OrderId::new(),
            user_id,
            &priced,
            Address::from(address),
            Utc::now().date_naive(),
        )?;

        tx.insert_order(&order).await?;

        let ids = lines.iter().map(CartLine::id).collect::<Vec<CartLineId>>();
        let removed = tx.delete_cart_lines(&ids).await?;
        if removed != ids.len() as u64 {
            // ロック済みの明細が消えている。ロールバックして呼び出し側に再試行させる
            return Err(RepositoryError::Conflict(format!(
                "expected to convert {} cart lines, removed {}",
                ids.len(),
                removed
            ))
            .into());
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id(),
            price = %order.price(),
            converted_lines = order.quantity(),
            "order placed"
        );
        Ok(order)
    }

    /// 注文をキャンセルする
    /// キャンセルは終端状態のため、2回目は `AlreadyCancelled` で拒否する
    ///
    /// # Returns
    /// * `Ok(String)` - 確認メッセージ
    /// * `Err(ApplicationError::NotFound)` - ユーザーまたは注文が存在しない
    /// * `Err(ApplicationError::Unauthorized)` - 注文者でない
    /// * `Err(ApplicationError::Domain(AlreadyCancelled))` - キャンセル済み
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<String, ApplicationError> {
        if self.user_repository.find_by_id(user_id).await?.is_none() {
            // 未認証の呼び出しは存在しないユーザーとして届く
            return Err(ApplicationError::NotFound("Enter a Valid Token".to_string()));
        }

        let mut tx = self.unit_of_work.begin().await?;

        let mut order = tx.lock_order(order_id).await?.ok_or_else(|| {
            ApplicationError::NotFound(format!("Order NOT Found with ID : {}", order_id))
        })?;

        if !order.is_owned_by(user_id) {
            tracing::warn!(%user_id, owner = %order.user_id(), "order cancellation by non-owner rejected");
            return Err(ApplicationError::Unauthorized(
                "NOT Eligible to CANCEL the Order!!".to_string(),
            ));
        }

        order.cancel().map_err(|err| {
            tracing::warn!(error = %err, "order cancellation rejected");
            err
        })?;

        tx.save_order_cancellation(&order).await?;
        tx.commit().await?;

        tracing::info!("order cancelled");
        Ok(format!("Order Cancel Successfully with ID : {}", order_id))
    }

    /// キャンセルされていない注文をすべて取得（管理者向け）
    ///
    /// # Returns
    /// * `Ok(Listing::Empty)` - 有効な注文が1件も無い
    /// * `Ok(Listing::Items(_))` - 注文日の降順の注文リスト
    #[tracing::instrument(skip(self))]
    pub async fn list_active_orders(&self) -> Result<Listing<Order>, ApplicationError> {
        let orders = self.order_repository.find_active().await?;
        Ok(Listing::from_vec(orders))
    }

    /// 注文IDで注文を取得
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        self.order_repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("Order NOT Found with ID : {}", order_id))
            })
    }

    /// 注文者本人として注文を取得
    #[tracing::instrument(skip(self))]
    pub async fn get_order_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, ApplicationError> {
        let order = self.get_order(order_id).await?;
        if !order.is_owned_by(user_id) {
            return Err(ApplicationError::Unauthorized(
                "NOT Eligible to VIEW the Order!!".to_string(),
            ));
        }
        Ok(order)
    }
}
