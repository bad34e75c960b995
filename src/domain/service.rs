// ドメインサービス
// 単一のエンティティに属さない純粋なビジネスロジックを実装
// I/Oは持たず、永続化は呼び出し側の責務

mod inventory_guard;
mod pricing_engine;

pub use inventory_guard::InventoryGuard;
pub use pricing_engine::PricingEngine;
