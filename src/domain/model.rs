// ドメインモデル（エンティティと値オブジェクト）

mod value_objects;
mod book;
mod user;
mod cart_line;
mod order;

pub use value_objects::{
    UserId, BookId, CartLineId, OrderId,
    Money,
    Address,
    OrderStatus,
};

pub use book::Book;
pub use user::User;
pub use cart_line::CartLine;
pub use order::{Order, OrderedBook};
