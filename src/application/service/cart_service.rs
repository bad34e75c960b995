use crate::application::ApplicationError;
use crate::application::service::Listing;
use crate::domain::error::DomainError;
use crate::domain::model::{Book, BookId, CartLine, CartLineId, Money, User, UserId};
use crate::domain::port::{
    BookRepository, CartRepository, StoreTransaction, UnitOfWork, UserRepository,
};
use crate::domain::service::InventoryGuard;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// カート明細の読み取り専用ビュー
/// 書籍の現在の情報（書名・単価）で補完する
#[derive(Debug, Clone, PartialEq)]
pub struct CartItemView {
    pub cart_line_id: CartLineId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub book_name: String,
    pub author: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub total_price: Money,
}

impl CartItemView {
    fn new(line: &CartLine, book: &Book) -> Self {
        Self {
            cart_line_id: line.id(),
            user_id: line.user_id(),
            book_id: book.id(),
            book_name: book.name().to_string(),
            author: book.author().to_string(),
            unit_price: book.price(),
            quantity: line.quantity(),
            total_price: line.total_price(),
        }
    }
}

/// カートアプリケーションサービス
/// ユーザーごとのカート明細のライフサイクルを管理する
///
/// 変更を伴う操作はすべて1つのトランザクション内で
/// 「カート明細のロック → 書籍のロック → 在庫の検証と反映 → 保存」を行う
pub struct CartApplicationService {
    user_repository: Arc<dyn UserRepository>,
    book_repository: Arc<dyn BookRepository>,
    cart_repository: Arc<dyn CartRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
}

impl CartApplicationService {
    /// 新しいカートアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `user_repository` - ユーザーリポジトリ
    /// * `book_repository` - 書籍リポジトリ
    /// * `cart_repository` - カートリポジトリ
    /// * `unit_of_work` - トランザクション境界
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        book_repository: Arc<dyn BookRepository>,
        cart_repository: Arc<dyn CartRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
    ) -> Self {
        Self {
            user_repository,
            book_repository,
            cart_repository,
            unit_of_work,
        }
    }

    async fn require_user(&self, user_id: UserId) -> Result<User, ApplicationError> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("User NOT Found with ID : {}", user_id)))
    }

    /// 書籍をカートに追加
    /// 同じ書籍の明細が既にあれば、その明細の数量を増やす
    ///
    /// # Arguments
    /// * `user_id` - ユーザーID
    /// * `book_id` - 書籍ID
    /// * `quantity` - 追加する数量
    ///
    /// # Returns
    /// * `Ok(CartLine)` - 追加後のカート明細
    /// * `Err(ApplicationError::NotFound)` - ユーザーまたは書籍が存在しない
    /// * `Err(ApplicationError::Domain(InsufficientStock))` - 在庫不足（在庫は変わらない）
    /// * `Err(ApplicationError::Repository(Conflict))` - 同じ書籍の初回追加が並行した。再試行可能
    #[tracing::instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<CartLine, ApplicationError> {
        self.require_user(user_id).await?;

        let mut tx = self.unit_of_work.begin().await?;

        let existing = tx
            .lock_cart_lines_for_user(user_id)
            .await?
            .into_iter()
            .find(|line| line.book_id() == book_id);

        let mut book = tx
            .lock_book(book_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("Book NOT Found with ID : {}", book_id)))?;

        InventoryGuard::reserve(&mut book, quantity).map_err(|err| {
            tracing::warn!(%user_id, %book_id, quantity, error = %err, "stock reservation rejected");
            err
        })?;

        tx.save_book_stock(&book).await?;

        let line = match existing {
            Some(mut line) => {
                let merged = line.quantity().checked_add(quantity).ok_or_else(|| {
                    DomainError::InvalidQuantity("数量が上限を超えています".to_string())
                })?;
                line.change_quantity(&book, merged)?;
                tx.update_cart_line(&line).await?;
                line
            }
            None => {
                let line = CartLine::new(CartLineId::new(), user_id, &book, quantity)?;
                tx.insert_cart_line(&line).await?;
                line
            }
        };

        tx.commit().await?;

        tracing::info!(
            cart_line_id = %line.id(),
            line_quantity = line.quantity(),
            remaining_stock = book.available_quantity(),
            "book added to cart"
        );
        Ok(line)
    }

    /// 書籍を1冊カートに追加
    #[tracing::instrument(skip(self))]
    pub async fn add_one_to_cart(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<CartLine, ApplicationError> {
        self.add_to_cart(user_id, book_id, 1).await
    }

    /// カート明細を1件削除し、予約していた在庫を戻す
    ///
    /// # Returns
    /// * `Ok(())` - 削除成功
    /// * `Err(ApplicationError::Unauthorized)` - ユーザーが存在しない、または明細の所有者でない
    /// * `Err(ApplicationError::NotFound)` - 明細が存在しない
    #[tracing::instrument(skip(self))]
    pub async fn remove_line(
        &self,
        user_id: UserId,
        cart_line_id: CartLineId,
    ) -> Result<(), ApplicationError> {
        if self.user_repository.find_by_id(user_id).await?.is_none() {
            return Err(ApplicationError::Unauthorized(
                "USER NOT FOUND TO DELETE CART!!".to_string(),
            ));
        }

        let mut tx = self.unit_of_work.begin().await?;

        let line = tx.lock_cart_line(cart_line_id).await?.ok_or_else(|| {
            ApplicationError::NotFound(format!("Cart NOT Found with ID : {}", cart_line_id))
        })?;

        if !line.is_owned_by(user_id) {
            tracing::warn!(%user_id, owner = %line.user_id(), "cart line removal by non-owner rejected");
            return Err(ApplicationError::Unauthorized(
                "NOT Eligible to DELETE the Cart!!".to_string(),
            ));
        }

        release_reservations(tx.as_mut(), std::slice::from_ref(&line)).await?;
        tx.delete_cart_lines(&[line.id()]).await?;
        tx.commit().await?;

        tracing::info!(released = line.quantity(), "cart line removed");
        Ok(())
    }

    /// ユーザーのカート明細をすべて削除し、予約していた在庫を戻す
    /// 明細が無ければ何もしない
    ///
    /// # Returns
    /// * `Ok(u64)` - 削除した明細の件数
    #[tracing::instrument(skip(self))]
    pub async fn remove_all_for_user(&self, user_id: UserId) -> Result<u64, ApplicationError> {
        self.require_user(user_id).await?;

        let mut tx = self.unit_of_work.begin().await?;

        let lines = tx.lock_cart_lines_for_user(user_id).await?;
        if lines.is_empty() {
            return Ok(0);
        }

        release_reservations(tx.as_mut(), &lines).await?;
        let ids = lines.iter().map(CartLine::id).collect::<Vec<_>>();
        let removed = tx.delete_cart_lines(&ids).await?;
        tx.commit().await?;

        tracing::info!(removed, "cart cleared");
        Ok(removed)
    }

    /// カート明細の数量を変更する
    /// 増加分は在庫から予約し、減少分は在庫に戻す
    ///
    /// # Returns
    /// * `Ok(CartLine)` - 変更後のカート明細
    /// * `Err(ApplicationError::Domain(InvalidQuantity))` - 1未満、または購入可能数を超える
    #[tracing::instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        user_id: UserId,
        cart_line_id: CartLineId,
        new_quantity: u32,
    ) -> Result<CartLine, ApplicationError> {
        self.change_line_quantity(user_id, cart_line_id, |_| Ok(new_quantity))
            .await
    }

    /// カート明細の数量を1増やす
    #[tracing::instrument(skip(self))]
    pub async fn increment_by_one(
        &self,
        user_id: UserId,
        cart_line_id: CartLineId,
    ) -> Result<CartLine, ApplicationError> {
        self.change_line_quantity(user_id, cart_line_id, |current| {
            current.checked_add(1).ok_or_else(|| {
                DomainError::InvalidQuantity("数量が上限を超えています".to_string())
            })
        })
        .await
    }

    /// カート明細の数量を1減らす
    /// 1未満にはならない（明細の削除はremove_lineで行う）
    #[tracing::instrument(skip(self))]
    pub async fn decrement_by_one(
        &self,
        user_id: UserId,
        cart_line_id: CartLineId,
    ) -> Result<CartLine, ApplicationError> {
        self.change_line_quantity(user_id, cart_line_id, |current| {
            if current <= 1 {
                return Err(DomainError::InvalidQuantity(
                    "数量を1未満にはできません".to_string(),
                ));
            }
            Ok(current - 1)
        })
        .await
    }

    async fn change_line_quantity<F>(
        &self,
        user_id: UserId,
        cart_line_id: CartLineId,
        next_quantity: F,
    ) -> Result<CartLine, ApplicationError>
    where
        F: FnOnce(u32) -> Result<u32, DomainError> + Send,
    {
        self.require_user(user_id).await?;

        let mut tx = self.unit_of_work.begin().await?;

        let mut line = tx.lock_cart_line(cart_line_id).await?.ok_or_else(|| {
            ApplicationError::NotFound(format!("Cart NOT Found with ID : {}", cart_line_id))
        })?;

        if !line.is_owned_by(user_id) {
            tracing::warn!(%user_id, owner = %line.user_id(), "cart line update by non-owner rejected");
            return Err(ApplicationError::Unauthorized(
                "NOT Eligible to UPDATE the Cart!!".to_string(),
            ));
        }

        let mut book = tx.lock_book(line.book_id()).await?.ok_or_else(|| {
            ApplicationError::NotFound(format!("Book NOT Found with ID : {}", line.book_id()))
        })?;

        let current = line.quantity();
        let requested = next_quantity(current)?;
        InventoryGuard::rebalance(&mut book, current, requested).map_err(|err| {
            tracing::warn!(current, requested, error = %err, "quantity change rejected");
            err
        })?;
        line.change_quantity(&book, requested)?;

        tx.save_book_stock(&book).await?;
        tx.update_cart_line(&line).await?;
        tx.commit().await?;

        tracing::info!(from = current, to = requested, "cart line quantity changed");
        Ok(line)
    }

    /// ユーザーのカート明細を書籍情報付きで取得
    /// 明細が無ければ空のリスト
    #[tracing::instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CartItemView>, ApplicationError> {
        self.require_user(user_id).await?;
        let lines = self.cart_repository.find_by_user(user_id).await?;
        self.enrich(lines).await
    }

    /// 全ユーザーのカート明細を取得（管理者向け）
    ///
    /// # Returns
    /// * `Ok(Listing::Empty)` - システム全体で明細が1件も無い
    /// * `Ok(Listing::Items(_))` - 明細のリスト
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Listing<CartItemView>, ApplicationError> {
        let lines = self.cart_repository.find_all().await?;
        Ok(Listing::from_vec(self.enrich(lines).await?))
    }

    async fn enrich(&self, lines: Vec<CartLine>) -> Result<Vec<CartItemView>, ApplicationError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let book_ids = lines
            .iter()
            .map(CartLine::book_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let books = self
            .book_repository
            .find_by_ids(&book_ids)
            .await?
            .into_iter()
            .map(|book| (book.id(), book))
            .collect::<HashMap<_, _>>();

        lines
            .iter()
            .map(|line| {
                books
                    .get(&line.book_id())
                    .map(|book| CartItemView::new(line, book))
                    .ok_or_else(|| {
                        ApplicationError::NotFound(format!(
                            "Book NOT Found with ID : {}",
                            line.book_id()
                        ))
                    })
            })
            .collect()
    }
}

/// 明細が予約していた在庫を書籍ごとにまとめて戻す
/// 書籍はBookIdの昇順でロックする。カタログから消えた書籍は対象外
async fn release_reservations(
    tx: &mut dyn StoreTransaction,
    lines: &[CartLine],
) -> Result<(), ApplicationError> {
    let mut per_book: BTreeMap<BookId, u32> = BTreeMap::new();
    for line in lines {
        let entry = per_book.entry(line.book_id()).or_insert(0);
        *entry = entry.saturating_add(line.quantity());
    }

    for (book_id, quantity) in per_book {
        if let Some(mut book) = tx.lock_book(book_id).await? {
            InventoryGuard::release(&mut book, quantity);
            tx.save_book_stock(&book).await?;
        }
    }
    Ok(())
}
