pub mod amount;
pub mod error;
pub mod events;
pub mod ledger;
pub mod models;
pub mod storage;

pub use amount::{AMOUNT_SCALE, checked_price, line_total, max_price, max_total_value};
pub use error::{LedgerError, LedgerResult};
pub use events::{LowStockAlert, STOCK_ALERTS_CHANNEL, STOCK_MOVEMENTS_CHANNEL, StockMovementRecorded};
pub use ledger::{ChainViolation, Reconciliation, StockPolicy, StockTransition, replay, verify_chain};
pub use models::{
    AppliedMovement, HistoryOrder, HistoryWindow, InventoryItem, ItemFilter, ItemPage, ItemPatch,
    ItemType, MovementDirection, MovementDraft, MovementType, NewItem, StockMovement,
};
pub use storage::{ItemCatalog, MovementLedger, StockStore};
