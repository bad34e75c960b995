// アプリケーションサービス
// カート操作と注文の状態遷移をユースケースとして公開する

mod address_adapter;
mod cart_service;
mod listing;
mod order_service;

pub use address_adapter::AddressPayload;
pub use cart_service::{CartApplicationService, CartItemView};
pub use listing::Listing;
pub use order_service::OrderApplicationService;
