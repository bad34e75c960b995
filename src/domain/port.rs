// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::model::{Book, BookId, CartLine, CartLineId, Order, OrderId, User, UserId};
use async_trait::async_trait;

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// データベース接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作に失敗
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// データの取得に失敗
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    /// ロック待ちのタイムアウトやデッドロック。操作全体を再試行できる
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// 操作全体を再試行すれば成功し得るエラーか
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::Conflict(_))
    }
}

/// ユーザーリポジトリトレイト
/// ユーザーの参照のみを提供する（管理は外部の責務）
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザーIDでユーザーを検索する
    ///
    /// # Returns
    /// * `Ok(Some(User))` - ユーザーが見つかった
    /// * `Ok(None)` - ユーザーが見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// 書籍リポジトリトレイト
/// カタログへの参照を提供する。在庫の更新はStoreTransaction経由で行う
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// 複数の書籍IDで書籍を検索する
    /// 見つからないIDは結果に含まれない
    async fn find_by_ids(&self, book_ids: &[BookId]) -> Result<Vec<Book>, RepositoryError>;
}

/// カートリポジトリトレイト
/// カート明細の読み取りを提供する
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// 指定ユーザーのカート明細を取得する
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// 全ユーザーのカート明細を取得する（管理者向け）
    async fn find_all(&self) -> Result<Vec<CartLine>, RepositoryError>;
}

/// 注文リポジトリトレイト
/// 注文の読み取りを提供する。生成とキャンセルはStoreTransaction経由で行う
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 注文IDで注文を検索する
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// キャンセルされていない注文をすべて取得する
    /// 注文日の降順で並べて返す
    async fn find_active(&self) -> Result<Vec<Order>, RepositoryError>;
}

/// トランザクション境界
/// カートと在庫、注文にまたがる変更を1つの単位で確定させる
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// 新しいトランザクションを開始する
    ///
    /// # Returns
    /// * `Ok(Box<dyn StoreTransaction>)` - 開始したトランザクション
    /// * `Err(RepositoryError::Conflict)` - 制限時間内に開始できなかった
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepositoryError>;
}

/// 実行中のトランザクション
///
/// `lock_*` は読み取った行をコミットまで排他ロックする。
/// ロックの取得順は「カート明細 → 書籍（BookIdの昇順）」で統一する。
/// `commit` せずにドロップした場合はすべての変更が破棄される
#[async_trait]
pub trait StoreTransaction: Send {
    /// 書籍をロックして取得する
    async fn lock_book(&mut self, book_id: BookId) -> Result<Option<Book>, RepositoryError>;

    /// 書籍の在庫数を保存する
    async fn save_book_stock(&mut self, book: &Book) -> Result<(), RepositoryError>;

    /// カート明細をロックして取得する
    async fn lock_cart_line(
        &mut self,
        cart_line_id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// 指定ユーザーのカート明細をすべてロックして取得する
    async fn lock_cart_lines_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<CartLine>, RepositoryError>;

    /// カート明細を新規に保存する
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - 同じ (ユーザー, 書籍) の明細が既にある。
    ///   並行する追加と競合したので、操作全体を再試行すれば既存の明細に合算される
    async fn insert_cart_line(&mut self, line: &CartLine) -> Result<(), RepositoryError>;

    /// 既存のカート明細の数量と明細金額を更新する
    /// 明細は同じトランザクション内でロック済みであること
    async fn update_cart_line(&mut self, line: &CartLine) -> Result<(), RepositoryError>;

    /// カート明細を削除する
    ///
    /// # Returns
    /// * `Ok(u64)` - 削除した件数
    async fn delete_cart_lines(&mut self, ids: &[CartLineId]) -> Result<u64, RepositoryError>;

    /// 注文を新規に保存する
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError>;

    /// 注文をロックして取得する
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// 注文のキャンセルフラグを保存する
    async fn save_order_cancellation(&mut self, order: &Order) -> Result<(), RepositoryError>;

    /// トランザクションをコミットする
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}
