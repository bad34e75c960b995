use crate::application::service::AddressPayload;
use serde::{Deserialize, Serialize};

/// カート追加・数量変更用のリクエストDTO
#[derive(Debug, Serialize, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

/// 注文確定用のリクエストDTO（配送先住所）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub name: String,
    pub phone_number: String,
    pub pin_code: String,
    pub locality: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub landmark: Option<String>,
}

impl PlaceOrderRequest {
    /// 必須項目が空でないことを確認する
    /// 住所の形式そのものは検証しない
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("name", &self.name),
            ("phone_number", &self.phone_number),
            ("pin_code", &self.pin_code),
            ("locality", &self.locality),
            ("address", &self.address),
            ("city", &self.city),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(format!("{} must not be empty", field)),
            None => Ok(()),
        }
    }
}

impl From<PlaceOrderRequest> for AddressPayload {
    fn from(request: PlaceOrderRequest) -> Self {
        AddressPayload {
            name: request.name,
            phone_number: request.phone_number,
            pin_code: request.pin_code,
            locality: request.locality,
            address: request.address,
            city: request.city,
            landmark: request.landmark,
        }
    }
}
