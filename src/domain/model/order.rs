use crate::domain::error::DomainError;
use crate::domain::model::{Address, Book, BookId, CartLine, Money, OrderId, OrderStatus, UserId};
use crate::domain::service::PricingEngine;
use chrono::NaiveDate;

/// 注文に含まれる書籍のスナップショット
/// 注文確定時点の書名・単価・数量を保持する
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedBook {
    book_id: BookId,
    name: String,
    unit_price: Money,
    quantity: u32,
    subtotal: Money,
}

impl OrderedBook {
    /// スナップショットを作成
    /// 小計が金額の上限を超える場合は `InvalidValue`
    pub fn new(
        book_id: BookId,
        name: String,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            book_id,
            name,
            subtotal: unit_price.multiply(quantity)?,
            unit_price,
            quantity,
        })
    }

    /// 書籍IDを取得
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    /// 書名を取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 確定時の単価を取得
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// 数量を取得
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// 小計（単価 × 数量）
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }
}

/// Order集約
/// カートの変換でのみ生成される。生成後に変更できるのはキャンセルフラグだけ
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    order_date: NaiveDate,
    price: Money,
    quantity: u32,
    address: Address,
    books: Vec<OrderedBook>,
    cancelled: bool,
}

impl Order {
    /// カート明細から注文を確定する
    /// 合計金額と数量はこの時点で固定され、以後再計算しない
    ///
    /// # Arguments
    /// * `id` - 注文ID
    /// * `user_id` - 注文者
    /// * `lines` - 変換するカート明細と、その明細が参照する書籍
    /// * `address` - 配送先住所（リクエストからコピーしたもの）
    /// * `order_date` - 注文日
    ///
    /// # Returns
    /// * `Err(DomainError::InvalidValue)` - 合計金額が上限を超える
    pub fn place(
        id: OrderId,
        user_id: UserId,
        lines: &[(&CartLine, &Book)],
        address: Address,
        order_date: NaiveDate,
    ) -> Result<Self, DomainError> {
        let price = PricingEngine::aggregate(
            lines
                .iter()
                .map(|(line, book)| (*book, line.quantity())),
        )?;

        let books = lines
            .iter()
            .map(|(line, book)| {
                OrderedBook::new(book.id(), book.name().to_string(), book.price(), line.quantity())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            user_id,
            order_date,
            price,
            quantity: lines.len() as u32,
            address,
            books,
            cancelled: false,
        })
    }

    /// データベースから取得したデータで注文を再構築
    /// リポジトリでの使用を想定
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: OrderId,
        user_id: UserId,
        order_date: NaiveDate,
        price: Money,
        quantity: u32,
        address: Address,
        books: Vec<OrderedBook>,
        cancelled: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            order_date,
            price,
            quantity,
            address,
            books,
            cancelled,
        }
    }

    /// 注文IDを取得
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// 注文者のユーザーIDを取得
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// 注文日を取得
    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }

    /// 確定時の合計金額を取得
    pub fn price(&self) -> Money {
        self.price
    }

    /// 変換されたカート明細の数を取得
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// 配送先住所を取得
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// 注文に含まれる書籍を取得
    pub fn books(&self) -> &[OrderedBook] {
        &self.books
    }

    /// キャンセル済みか
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// 注文ステータスを取得
    pub fn status(&self) -> OrderStatus {
        if self.cancelled {
            OrderStatus::Cancelled
        } else {
            OrderStatus::Placed
        }
    }

    /// 指定ユーザーの注文か
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// 注文をキャンセル
    /// 事前条件:
    /// - キャンセル済みでない（Cancelledは終端状態）
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if self.cancelled {
            return Err(DomainError::AlreadyCancelled(self.id));
        }
        self.cancelled = true;
        Ok(())
    }
}
