// ドメイン層
// エンティティ、値オブジェクト、ドメインサービス、出力ポート

pub mod error;
pub mod model;
pub mod port;
pub mod service;
