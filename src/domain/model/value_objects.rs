use crate::domain::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// UUIDをラップする識別子型を定義する
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// 新しい一意の識別子を生成
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// UUIDから作成
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// 文字列から作成
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                let uuid = Uuid::parse_str(s)?;
                Ok(Self(uuid))
            }

            /// 内部のUUIDを取得
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

uuid_identifier!(
    /// ユーザーの一意識別子
    UserId
);

uuid_identifier!(
    /// 書籍の一意識別子
    BookId
);

uuid_identifier!(
    /// カート明細の一意識別子
    CartLineId
);

uuid_identifier!(
    /// 注文の一意識別子
    OrderId
);

/// 金額を表す値オブジェクト
/// 浮動小数点を使わず10進数で保持する
/// 上限は永続化先の DECIMAL(12, 2) に収まる 9,999,999,999.99
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    amount: Decimal,
}

impl Money {
    /// 扱える金額の上限
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

    /// 金額から作成
    /// 負の金額と上限を超える金額は受け付けない
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount < Decimal::ZERO {
            return Err(DomainError::InvalidValue(format!(
                "金額は0以上である必要があります: {}",
                amount
            )));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(DomainError::InvalidValue(format!(
                "金額が上限 {} を超えています: {}",
                Self::MAX_AMOUNT,
                amount
            )));
        }
        Ok(Self { amount })
    }

    /// 0円
    pub fn zero() -> Self {
        Self {
            amount: Decimal::ZERO,
        }
    }

    /// 金額を取得
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// 金額を加算
    /// 結果が上限を超える場合は `InvalidValue`
    pub fn add(&self, other: &Money) -> Result<Money, DomainError> {
        let amount = self.amount.checked_add(other.amount).ok_or_else(|| {
            DomainError::InvalidValue(format!("金額の加算が桁あふれしました: {} + {}", self, other))
        })?;
        Money::new(amount)
    }

    /// 金額を乗算
    /// 結果が上限を超える場合は `InvalidValue`
    pub fn multiply(&self, factor: u32) -> Result<Money, DomainError> {
        let amount = self
            .amount
            .checked_mul(Decimal::from(factor))
            .ok_or_else(|| {
                DomainError::InvalidValue(format!("金額の乗算が桁あふれしました: {} × {}", self, factor))
            })?;
        Money::new(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount)
    }
}

/// 配送先住所を表す値オブジェクト
/// 注文に埋め込まれ、独立したライフサイクルを持たない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    name: String,
    phone_number: String,
    pin_code: String,
    locality: String,
    address: String,
    city: String,
    landmark: Option<String>,
}

impl Address {
    /// 新しい配送先住所を作成
    /// 入力の検証は上流（リクエストの解析）で済んでいる前提
    pub fn new(
        name: String,
        phone_number: String,
        pin_code: String,
        locality: String,
        address: String,
        city: String,
        landmark: Option<String>,
    ) -> Self {
        Self {
            name,
            phone_number,
            pin_code,
            locality,
            address,
            city,
            landmark,
        }
    }

    /// 宛名を取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 電話番号を取得
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    /// 郵便番号を取得
    pub fn pin_code(&self) -> &str {
        &self.pin_code
    }

    /// 地域を取得
    pub fn locality(&self) -> &str {
        &self.locality
    }

    /// 番地を取得
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 市区町村を取得
    pub fn city(&self) -> &str {
        &self.city
    }

    /// 目印を取得
    pub fn landmark(&self) -> Option<&str> {
        self.landmark.as_deref()
    }
}

/// 注文のステータス
/// Placed → Cancelled の一方向のみ遷移する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// 注文済み
    Placed,
    /// キャンセル済み（終端状態）
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{}", status_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_identifier_creation() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2, "Each OrderId should be unique");
    }

    #[test]
    fn test_identifier_round_trip_through_string() {
        let id = CartLineId::new();
        let parsed = CartLineId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(BookId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_money_rejects_negative_amount() {
        let result = Money::new(Decimal::from_str("-0.01").unwrap());
        assert!(result.is_err());
        assert!(Money::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_money_addition() {
        let money1 = Money::new(Decimal::from_str("10.10").unwrap()).unwrap();
        let money2 = Money::new(Decimal::from_str("0.20").unwrap()).unwrap();
        let result = money1.add(&money2).unwrap();
        assert_eq!(result.amount(), Decimal::from_str("10.30").unwrap());
    }

    #[test]
    fn test_money_multiplication_is_exact() {
        // 0.1 * 3 が浮動小数点の誤差なく 0.3 になること
        let money = Money::new(Decimal::from_str("0.1").unwrap()).unwrap();
        let result = money.multiply(3).unwrap();
        assert_eq!(result.amount(), Decimal::from_str("0.3").unwrap());
    }

    #[test]
    fn test_money_upper_bound_matches_storage_precision() {
        assert_eq!(Money::MAX_AMOUNT, Decimal::from_str("9999999999.99").unwrap());
        assert!(Money::new(Money::MAX_AMOUNT).is_ok());
        assert!(Money::new(Decimal::from_str("10000000000.00").unwrap()).is_err());
    }

    #[test]
    fn test_money_arithmetic_past_upper_bound_is_invalid_value() {
        let max = Money::new(Money::MAX_AMOUNT).unwrap();
        let cent = Money::new(Decimal::from_str("0.01").unwrap()).unwrap();

        assert!(matches!(max.add(&cent), Err(DomainError::InvalidValue(_))));
        assert!(matches!(max.multiply(2), Err(DomainError::InvalidValue(_))));
        assert_eq!(max.multiply(1).unwrap(), max);
    }

    #[test]
    fn test_money_multiplication_overflowing_decimal_is_invalid_value() {
        // Decimalの表現範囲自体を超える乗算でもpanicしないこと
        let huge = Money {
            amount: Decimal::MAX,
        };
        assert!(matches!(huge.multiply(u32::MAX), Err(DomainError::InvalidValue(_))));
        assert!(matches!(huge.add(&huge), Err(DomainError::InvalidValue(_))));
    }

    #[test]
    fn test_money_serializes_as_decimal_string() {
        let money = Money::new(Decimal::from_str("199.99").unwrap()).unwrap();
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "\"199.99\"");
    }

    #[test]
    fn test_address_landmark_is_optional() {
        let address = Address::new(
            "John".to_string(),
            "9999999999".to_string(),
            "123456".to_string(),
            "Locality".to_string(),
            "123 Street".to_string(),
            "City".to_string(),
            None,
        );
        assert_eq!(address.landmark(), None);
        assert_eq!(address.city(), "City");
    }
}
