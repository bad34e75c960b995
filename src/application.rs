// アプリケーション層
// ユースケースを実装し、ドメインと出力ポートを組み合わせる

pub mod error;
pub mod service;

pub use error::ApplicationError;
