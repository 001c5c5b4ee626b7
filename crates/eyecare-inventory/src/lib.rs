pub mod catalog;
pub mod ledger;
mod text;

pub use catalog::{Catalog, ItemDraft, ItemUpdate, ListItems};
pub use ledger::{AdjustmentOutcome, MovementView, StockAdjustment, StockLedger, StockWarning};
