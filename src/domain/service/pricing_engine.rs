use crate::domain::error::DomainError;
use crate::domain::model::{Book, Money};

/// 価格計算エンジン
/// 明細金額と合計金額を10進数で計算する。副作用なし
pub struct PricingEngine;

impl PricingEngine {
    /// 明細金額（単価 × 数量）
    /// 金額の上限を超える場合は `InvalidValue`
    pub fn line_total(book: &Book, quantity: u32) -> Result<Money, DomainError> {
        book.price().multiply(quantity)
    }

    /// 全明細の合計金額
    /// 明細が無ければ0
    pub fn aggregate<'a, I>(lines: I) -> Result<Money, DomainError>
    where
        I: IntoIterator<Item = (&'a Book, u32)>,
    {
        lines
            .into_iter()
            .try_fold(Money::zero(), |acc, (book, quantity)| {
                acc.add(&Self::line_total(book, quantity)?)
            })
    }
}
