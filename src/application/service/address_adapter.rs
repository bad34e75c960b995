use crate::domain::model::Address;

/// 注文確定リクエストに含まれる配送先住所
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPayload {
    pub name: String,
    pub phone_number: String,
    pub pin_code: String,
    pub locality: String,
    pub address: String,
    pub city: String,
    pub landmark: Option<String>,
}

// 項目ごとのコピーのみ。検証はリクエストの解析で済んでいる
impl From<AddressPayload> for Address {
    fn from(payload: AddressPayload) -> Self {
        Address::new(
            payload.name,
            payload.phone_number,
            payload.pin_code,
            payload.locality,
            payload.address,
            payload.city,
            payload.landmark,
        )
    }
}
