use async_trait::async_trait;
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::ledger::StockPolicy;
use crate::models::{
    AppliedMovement, HistoryWindow, InventoryItem, ItemFilter, ItemPage, ItemPatch, ItemType,
    MovementDraft, NewItem, StockMovement,
};

/// Item records of both catalogs. `stock_quantity` is never writable here.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn list_items(&self, item_type: ItemType, filter: &ItemFilter) -> LedgerResult<ItemPage>;

    async fn get_item(&self, item_type: ItemType, item_id: Uuid)
    -> LedgerResult<Option<InventoryItem>>;

    /// Inserts the item and, when `opening_stock` is non-zero, its opening
    /// ledger row in the same unit of work.
    async fn create_item(&self, item_type: ItemType, item: NewItem) -> LedgerResult<InventoryItem>;

    async fn update_item(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        patch: ItemPatch,
    ) -> LedgerResult<Option<InventoryItem>>;

    /// Soft delete. Returns `false` when the item does not exist or is
    /// already archived.
    async fn archive_item(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<bool>;

    async fn low_stock_items(&self, item_type: ItemType) -> LedgerResult<Vec<InventoryItem>>;
}

/// Append-only movement ledger.
#[async_trait]
pub trait MovementLedger: Send + Sync {
    /// Reads the current stock, plans the transition under `policy`, appends
    /// the ledger row and moves the catalog stock to `new_stock`, all or
    /// nothing. Archived or unknown items yield `ItemNotFound`.
    async fn apply_movement(
        &self,
        draft: MovementDraft,
        policy: StockPolicy,
    ) -> LedgerResult<AppliedMovement>;

    /// `movement_date` descending, most recent write first within a date.
    async fn history(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        window: HistoryWindow,
    ) -> LedgerResult<Vec<StockMovement>>;

    /// Full ledger of one item in write order.
    async fn ledger(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<Vec<StockMovement>>;
}

pub trait StockStore: ItemCatalog + MovementLedger {}

impl<T: ItemCatalog + MovementLedger> StockStore for T {}
