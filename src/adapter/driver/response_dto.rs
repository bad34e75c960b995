use crate::application::service::CartItemView;
use crate::domain::model::{Address, CartLine, Money, Order, OrderedBook};
use serde::{Deserialize, Serialize};

/// メッセージのみのレスポンスDTO
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// カート明細用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub cart_line_id: String,
    pub user_id: String,
    pub book_id: String,
    pub quantity: u32,
    pub total_price: Money,
}

impl CartLineResponse {
    /// ドメインオブジェクトからCartLineResponseを作成
    pub fn from_cart_line(line: &CartLine) -> Self {
        Self {
            cart_line_id: line.id().to_string(),
            user_id: line.user_id().to_string(),
            book_id: line.book_id().to_string(),
            quantity: line.quantity(),
            total_price: line.total_price(),
        }
    }
}

/// カート操作の結果（メッセージと変更後の明細）
#[derive(Debug, Serialize)]
pub struct CartLineChangedResponse {
    pub message: String,
    pub cart_line: CartLineResponse,
}

/// 書籍情報付きのカート明細用レスポンスDTO
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub cart_line_id: String,
    pub user_id: String,
    pub book_id: String,
    pub book_name: String,
    pub author: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub total_price: Money,
}

impl From<CartItemView> for CartItemResponse {
    fn from(view: CartItemView) -> Self {
        Self {
            cart_line_id: view.cart_line_id.to_string(),
            user_id: view.user_id.to_string(),
            book_id: view.book_id.to_string(),
            book_name: view.book_name,
            author: view.author,
            unit_price: view.unit_price,
            quantity: view.quantity,
            total_price: view.total_price,
        }
    }
}

/// 配送先住所用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub name: String,
    pub phone_number: String,
    pub pin_code: String,
    pub locality: String,
    pub address: String,
    pub city: String,
    pub landmark: Option<String>,
}

impl AddressResponse {
    pub fn from_address(address: &Address) -> Self {
        Self {
            name: address.name().to_string(),
            phone_number: address.phone_number().to_string(),
            pin_code: address.pin_code().to_string(),
            locality: address.locality().to_string(),
            address: address.address().to_string(),
            city: address.city().to_string(),
            landmark: address.landmark().map(str::to_string),
        }
    }
}

/// 注文に含まれる書籍用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct OrderedBookResponse {
    pub book_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub subtotal: Money,
}

impl OrderedBookResponse {
    pub fn from_ordered_book(book: &OrderedBook) -> Self {
        Self {
            book_id: book.book_id().to_string(),
            name: book.name().to_string(),
            unit_price: book.unit_price(),
            quantity: book.quantity(),
            subtotal: book.subtotal(),
        }
    }
}

/// 注文用のレスポンスDTO
/// 金額と数量は注文確定時に固定された値
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub user_id: String,
    pub order_date: String,
    pub price: Money,
    pub quantity: u32,
    pub status: String,
    pub cancelled: bool,
    pub address: AddressResponse,
    pub books: Vec<OrderedBookResponse>,
}

impl OrderResponse {
    /// ドメインオブジェクトからOrderResponseを作成
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            order_date: order.order_date().format("%Y-%m-%d").to_string(),
            price: order.price(),
            quantity: order.quantity(),
            status: order.status().to_string(),
            cancelled: order.is_cancelled(),
            address: AddressResponse::from_address(order.address()),
            books: order
                .books()
                .iter()
                .map(OrderedBookResponse::from_ordered_book)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Book, BookId, CartLineId, OrderId, UserId};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn book() -> Book {
        Book::new(
            BookId::new(),
            "Test Book".to_string(),
            "Author".to_string(),
            "Description".to_string(),
            Money::new(Decimal::from_str("12.50").unwrap()).unwrap(),
            10,
        )
    }

    #[test]
    fn test_order_response_from_order() {
        let user_id = UserId::new();
        let book = book();
        let line = CartLine::new(CartLineId::new(), user_id, &book, 2).unwrap();
        let address = Address::new(
            "John".to_string(),
            "9999999999".to_string(),
            "123456".to_string(),
            "Locality".to_string(),
            "123 Street".to_string(),
            "City".to_string(),
            None,
        );
        let order = Order::place(
            OrderId::new(),
            user_id,
            &[(&line, &book)],
            address,
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        )
        .unwrap();

        let response = OrderResponse::from_order(&order);

        assert_eq!(response.order_id, order.id().to_string());
        assert_eq!(response.order_date, "2024-03-09");
        assert_eq!(response.quantity, 1);
        assert_eq!(response.status, "Placed");
        assert!(!response.cancelled);
        assert_eq!(response.books.len(), 1);
        assert_eq!(response.books[0].subtotal.amount(), Decimal::from(25));
        assert_eq!(response.address.landmark, None);
    }

    #[test]
    fn test_money_is_serialized_as_decimal_string() {
        let line = CartLine::new(CartLineId::new(), UserId::new(), &book(), 3).unwrap();

        let json = serde_json::to_value(CartLineResponse::from_cart_line(&line)).unwrap();

        assert_eq!(json["total_price"], "37.50");
        assert_eq!(json["quantity"], 3);
    }
}
