use crate::domain::model::{Book, BookId, CartLine, CartLineId, Order, OrderId, User, UserId};
use crate::domain::port::{
    BookRepository, CartRepository, OrderRepository, RepositoryError, StoreTransaction,
    UnitOfWork, UserRepository,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

/// ロック待ちの既定の上限
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    books: HashMap<BookId, Book>,
    /// 追加順
    cart_lines: Vec<CartLine>,
    /// 確定順
    orders: Vec<Order>,
}

/// メモリ上のストア
///
/// すべてのポートを1つの状態に対して実装する。
/// トランザクションは状態全体を排他し、作業用のコピーに変更を加え、
/// `commit` で初めて確定状態を置き換える
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    lock_timeout: Duration,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// ロック待ちの上限を指定してストアを作成
    /// 上限を超えた操作は `RepositoryError::Conflict` で失敗する
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            lock_timeout,
        }
    }

    /// ユーザーを登録する
    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id(), user);
    }

    /// 書籍を登録する（同じIDなら置き換える）
    pub async fn insert_book(&self, book: Book) {
        self.state.lock().await.books.insert(book.id(), book);
    }

    /// 書籍の現在の状態を取得する
    pub async fn book(&self, book_id: BookId) -> Option<Book> {
        self.state.lock().await.books.get(&book_id).cloned()
    }

    async fn read(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        tokio::time::timeout(self.lock_timeout, self.state.lock())
            .await
            .map_err(|_| RepositoryError::Conflict("ストアの読み取りがタイムアウトしました".to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.read().await?.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl BookRepository for InMemoryStore {
    async fn find_by_ids(&self, book_ids: &[BookId]) -> Result<Vec<Book>, RepositoryError> {
        let state = self.read().await?;
        Ok(book_ids
            .iter()
            .filter_map(|book_id| state.books.get(book_id).cloned())
            .collect())
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        Ok(self
            .read()
            .await?
            .cart_lines
            .iter()
            .filter(|line| line.is_owned_by(user_id))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<CartLine>, RepositoryError> {
        Ok(self.read().await?.cart_lines.clone())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .read()
            .await?
            .orders
            .iter()
            .find(|order| order.id() == order_id)
            .cloned())
    }

    async fn find_active(&self) -> Result<Vec<Order>, RepositoryError> {
        let state = self.read().await?;
        // 新しい順に並べてから注文日で安定ソートする
        let mut orders = state
            .orders
            .iter()
            .rev()
            .filter(|order| !order.is_cancelled())
            .cloned()
            .collect::<Vec<_>>();
        orders.sort_by(|a, b| b.order_date().cmp(&a.order_date()));
        Ok(orders)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepositoryError> {
        let guard = tokio::time::timeout(self.lock_timeout, self.state.clone().lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(timeout = ?self.lock_timeout, "in-memory transaction timed out");
                RepositoryError::Conflict("トランザクションの開始がタイムアウトしました".to_string())
            })?;

        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

/// メモリ上のトランザクション
/// ドロップ時は作業用のコピーを捨てるだけでロールバックになる
struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_book(&mut self, book_id: BookId) -> Result<Option<Book>, RepositoryError> {
        Ok(self.working.books.get(&book_id).cloned())
    }

    async fn save_book_stock(&mut self, book: &Book) -> Result<(), RepositoryError> {
        let stored = self.working.books.get_mut(&book.id()).ok_or_else(|| {
            RepositoryError::OperationFailed(format!("書籍が存在しません: {}", book.id()))
        })?;
        stored.set_available_quantity(book.available_quantity());
        Ok(())
    }

    async fn lock_cart_line(
        &mut self,
        cart_line_id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        Ok(self
            .working
            .cart_lines
            .iter()
            .find(|line| line.id() == cart_line_id)
            .cloned())
    }

    async fn lock_cart_lines_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        Ok(self
            .working
            .cart_lines
            .iter()
            .filter(|line| line.is_owned_by(user_id))
            .cloned()
            .collect())
    }

    async fn insert_cart_line(&mut self, line: &CartLine) -> Result<(), RepositoryError> {
        let lines = &mut self.working.cart_lines;
        if lines.iter().any(|stored| stored.id() == line.id()) {
            return Err(RepositoryError::OperationFailed(format!(
                "カート明細が既に存在します: {}",
                line.id()
            )));
        }
        // (ユーザー, 書籍) ごとに明細は1件
        if lines
            .iter()
            .any(|stored| stored.user_id() == line.user_id() && stored.book_id() == line.book_id())
        {
            return Err(RepositoryError::Conflict(format!(
                "カート明細が重複しています: user={}, book={}",
                line.user_id(),
                line.book_id()
            )));
        }
        lines.push(line.clone());
        Ok(())
    }

    async fn update_cart_line(&mut self, line: &CartLine) -> Result<(), RepositoryError> {
        let stored = self
            .working
            .cart_lines
            .iter_mut()
            .find(|stored| stored.id() == line.id())
            .ok_or_else(|| {
                RepositoryError::OperationFailed(format!("更新するカート明細がありません: {}", line.id()))
            })?;
        *stored = line.clone();
        Ok(())
    }

    async fn delete_cart_lines(&mut self, ids: &[CartLineId]) -> Result<u64, RepositoryError> {
        let before = self.working.cart_lines.len();
        self.working.cart_lines.retain(|line| !ids.contains(&line.id()));
        Ok((before - self.working.cart_lines.len()) as u64)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        if self.working.orders.iter().any(|stored| stored.id() == order.id()) {
            return Err(RepositoryError::OperationFailed(format!(
                "注文が既に存在します: {}",
                order.id()
            )));
        }
        self.working.orders.push(order.clone());
        Ok(())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .working
            .orders
            .iter()
            .find(|order| order.id() == order_id)
            .cloned())
    }

    async fn save_order_cancellation(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let stored = self
            .working
            .orders
            .iter_mut()
            .find(|stored| stored.id() == order.id())
            .ok_or_else(|| {
                RepositoryError::OperationFailed(format!("注文が存在しません: {}", order.id()))
            })?;
        *stored = order.clone();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
