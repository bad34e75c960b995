// 駆動される側アダプター（リポジトリ実装など）

mod book_repository;
mod cart_repository;
mod in_memory_store;
mod order_repository;
mod unit_of_work;
mod user_repository;

pub use book_repository::MySqlBookRepository;
pub use cart_repository::MySqlCartRepository;
pub use in_memory_store::InMemoryStore;
pub use order_repository::MySqlOrderRepository;
pub use unit_of_work::{MySqlTransaction, MySqlUnitOfWork};
pub use user_repository::MySqlUserRepository;

/// IN句のプレースホルダーを生成する（例: "?, ?, ?"）
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
