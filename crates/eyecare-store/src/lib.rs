use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use eyecare_core::{
    AppliedMovement, HistoryOrder, HistoryWindow, InventoryItem, ItemCatalog, ItemFilter, ItemPage,
    ItemPatch, ItemType, LedgerError, LedgerResult, MovementDraft, MovementLedger, NewItem,
    StockMovement, StockPolicy, StockTransition,
};
use tokio::sync::RwLock;
use uuid::Uuid;

type ItemKey = (ItemType, Uuid);

#[derive(Default)]
struct State {
    items: HashMap<ItemKey, InventoryItem>,
    movements: Vec<StockMovement>,
    sequence: i64,
}

impl State {
    /// Plans and commits one movement. Nothing is mutated unless every step
    /// succeeds.
    fn apply(&mut self, draft: MovementDraft, policy: StockPolicy) -> LedgerResult<AppliedMovement> {
        let key = (draft.item_type, draft.item_id);
        let item = self
            .items
            .get(&key)
            .filter(|item| !item.is_archived())
            .ok_or_else(|| LedgerError::not_found(draft.item_type, draft.item_id))?;

        let transition =
            StockTransition::plan(item.stock_quantity, draft.movement_type, draft.quantity, policy)?;
        let item_name = item.name.clone();
        let now = Utc::now();

        let movement = draft.into_movement(
            item_name,
            self.sequence + 1,
            transition.previous_stock,
            transition.new_stock,
            now,
        )?;
        self.sequence = movement.sequence;
        self.movements.push(movement.clone());

        let item = self
            .items
            .get_mut(&key)
            .ok_or_else(|| LedgerError::not_found(key.0, key.1))?;
        item.stock_quantity = transition.new_stock;
        item.updated_at = now;

        Ok(AppliedMovement {
            movement,
            item: item.clone(),
        })
    }
}

/// Catalog and ledger held behind a single lock, so each movement's
/// read-plan-write runs as one critical section.
#[derive(Default)]
pub struct InMemoryStockStore {
    state: RwLock<State>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemCatalog for InMemoryStockStore {
    async fn list_items(&self, item_type: ItemType, filter: &ItemFilter) -> LedgerResult<ItemPage> {
        let state = self.state.read().await;
        let mut matching: Vec<&InventoryItem> = state
            .items
            .values()
            .filter(|item| item.item_type == item_type && filter.matches(item))
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok(ItemPage {
            items,
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    async fn get_item(
        &self,
        item_type: ItemType,
        item_id: Uuid,
    ) -> LedgerResult<Option<InventoryItem>> {
        let state = self.state.read().await;
        Ok(state.items.get(&(item_type, item_id)).cloned())
    }

    async fn create_item(&self, item_type: ItemType, new_item: NewItem) -> LedgerResult<InventoryItem> {
        let mut state = self.state.write().await;

        if state
            .items
            .values()
            .any(|existing| existing.item_type == item_type && existing.sku == new_item.sku)
        {
            return Err(LedgerError::validation(
                "sku",
                format!("sku {} already exists", new_item.sku),
            ));
        }

        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4(),
            item_type,
            sku: new_item.sku.clone(),
            name: new_item.name.clone(),
            category: new_item.category.clone(),
            manufacturer: new_item.manufacturer.clone(),
            description: new_item.description.clone(),
            purchase_price: new_item.purchase_price,
            selling_price: new_item.selling_price,
            mrp: new_item.mrp,
            gst_percentage: new_item.gst_percentage,
            stock_quantity: 0,
            reorder_level: new_item.reorder_level,
            created_at: now,
            updated_at: now,
            archived_at: None,
        };
        state.items.insert((item_type, item.id), item.clone());

        if new_item.opening_stock == 0 {
            return Ok(item);
        }

        let draft = MovementDraft::opening_stock(&item, &new_item);
        match state.apply(draft, StockPolicy::default()) {
            Ok(applied) => Ok(applied.item),
            Err(err) => {
                state.items.remove(&(item_type, item.id));
                Err(err)
            }
        }
    }

    async fn update_item(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        patch: ItemPatch,
    ) -> LedgerResult<Option<InventoryItem>> {
        let mut state = self.state.write().await;

        if let Some(sku) = &patch.sku
            && state.items.values().any(|existing| {
                existing.item_type == item_type && existing.id != item_id && &existing.sku == sku
            })
        {
            return Err(LedgerError::validation("sku", format!("sku {sku} already exists")));
        }

        let Some(item) = state.items.get_mut(&(item_type, item_id)) else {
            return Ok(None);
        };
        patch.apply_to(item);
        item.updated_at = Utc::now();

        Ok(Some(item.clone()))
    }

    async fn archive_item(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<bool> {
        let mut state = self.state.write().await;
        match state.items.get_mut(&(item_type, item_id)) {
            Some(item) if !item.is_archived() => {
                let now = Utc::now();
                item.archived_at = Some(now);
                item.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn low_stock_items(&self, item_type: ItemType) -> LedgerResult<Vec<InventoryItem>> {
        let state = self.state.read().await;
        let mut items: Vec<InventoryItem> = state
            .items
            .values()
            .filter(|item| {
                item.item_type == item_type
                    && !item.is_archived()
                    && item.is_at_or_below_reorder_level()
            })
            .cloned()
            .collect();
        items.sort_by_key(|item| {
            (
                item.stock_quantity.saturating_sub(item.reorder_level),
                item.name.clone(),
            )
        });
        Ok(items)
    }
}

#[async_trait]
impl MovementLedger for InMemoryStockStore {
    async fn apply_movement(
        &self,
        draft: MovementDraft,
        policy: StockPolicy,
    ) -> LedgerResult<AppliedMovement> {
        let mut state = self.state.write().await;
        state.apply(draft, policy)
    }

    async fn history(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        window: HistoryWindow,
    ) -> LedgerResult<Vec<StockMovement>> {
        let state = self.state.read().await;
        let mut rows: Vec<&StockMovement> = state
            .movements
            .iter()
            .filter(|movement| movement.item_type == item_type && movement.item_id == item_id)
            .collect();
        rows.sort_by(|a, b| {
            let oldest_first = a
                .movement_date
                .cmp(&b.movement_date)
                .then(a.sequence.cmp(&b.sequence));
            match window.order {
                HistoryOrder::OldestFirst => oldest_first,
                HistoryOrder::NewestFirst => oldest_first.reverse(),
            }
        });

        Ok(rows
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .cloned()
            .collect())
    }

    async fn ledger(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<Vec<StockMovement>> {
        let state = self.state.read().await;
        Ok(state
            .movements
            .iter()
            .filter(|movement| movement.item_type == item_type && movement.item_id == item_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use eyecare_core::MovementType;
    use rust_decimal::Decimal;

    use super::*;

    fn new_item(sku: &str, opening_stock: i64) -> NewItem {
        NewItem {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            category: "lenses".to_string(),
            manufacturer: None,
            description: None,
            purchase_price: Decimal::new(400, 0),
            selling_price: Decimal::new(650, 0),
            mrp: Decimal::new(700, 0),
            gst_percentage: Decimal::new(12, 0),
            reorder_level: 5,
            opening_stock,
            opening_date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            user_id: None,
        }
    }

    fn draft(item: &InventoryItem, movement_type: MovementType, quantity: i64, day: u32) -> MovementDraft {
        MovementDraft {
            item_type: item.item_type,
            item_id: item.id,
            movement_type,
            movement_date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            quantity,
            unit_price: None,
            reference_number: None,
            supplier: None,
            customer_name: None,
            invoice_id: None,
            notes: None,
            batch_number: None,
            user_id: None,
        }
    }

    #[tokio::test]
    async fn opening_stock_is_written_as_a_movement() {
        let store = InMemoryStockStore::new();
        let item = store.create_item(ItemType::Optical, new_item("LEN-1", 12)).await.unwrap();

        assert_eq!(item.stock_quantity, 12);
        let ledger = store.ledger(ItemType::Optical, item.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].movement_type, MovementType::Adjustment);
        assert_eq!((ledger[0].previous_stock, ledger[0].new_stock), (0, 12));
        assert_eq!(ledger[0].notes.as_deref(), Some("opening stock"));
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected_per_catalog() {
        let store = InMemoryStockStore::new();
        store.create_item(ItemType::Optical, new_item("SKU-9", 0)).await.unwrap();

        let duplicate = store.create_item(ItemType::Optical, new_item("SKU-9", 0)).await;
        assert!(matches!(duplicate, Err(LedgerError::Validation { field: "sku", .. })));

        let other_catalog = store.create_item(ItemType::Pharmacy, new_item("SKU-9", 0)).await;
        assert!(other_catalog.is_ok());
    }

    #[tokio::test]
    async fn movement_against_wrong_catalog_is_not_found() {
        let store = InMemoryStockStore::new();
        let item = store.create_item(ItemType::Optical, new_item("FR-1", 3)).await.unwrap();

        let mut request = draft(&item, MovementType::Purchase, 1, 1);
        request.item_type = ItemType::Pharmacy;
        let result = store.apply_movement(request, StockPolicy::default()).await;

        assert!(matches!(result, Err(LedgerError::ItemNotFound { .. })));
        assert_eq!(store.ledger(ItemType::Optical, item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_movement_leaves_no_trace() {
        let store = InMemoryStockStore::new();
        let item = store.create_item(ItemType::Pharmacy, new_item("DRP-1", 2)).await.unwrap();
        let strict = StockPolicy {
            allow_negative_stock: false,
        };

        let result = store
            .apply_movement(draft(&item, MovementType::Sale, 3, 1), strict)
            .await;

        assert!(matches!(result, Err(LedgerError::InsufficientStock { .. })));
        let current = store.get_item(ItemType::Pharmacy, item.id).await.unwrap().unwrap();
        assert_eq!(current.stock_quantity, 2);
        assert_eq!(store.ledger(ItemType::Pharmacy, item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_orders_by_movement_date_then_write_order() {
        let store = InMemoryStockStore::new();
        let item = store.create_item(ItemType::Pharmacy, new_item("TAB-1", 0)).await.unwrap();
        let policy = StockPolicy::default();

        store.apply_movement(draft(&item, MovementType::Purchase, 10, 5), policy).await.unwrap();
        store.apply_movement(draft(&item, MovementType::Sale, 2, 9), policy).await.unwrap();
        store.apply_movement(draft(&item, MovementType::Sale, 1, 5), policy).await.unwrap();

        let rows = store
            .history(ItemType::Pharmacy, item.id, HistoryWindow::default())
            .await
            .unwrap();
        let order: Vec<(u32, i64)> = rows
            .iter()
            .map(|row| (chrono::Datelike::day(&row.movement_date), row.sequence))
            .collect();
        assert_eq!(order, vec![(9, 2), (5, 3), (5, 1)]);

        let second_page = store
            .history(ItemType::Pharmacy, item.id, HistoryWindow {
                limit: 2,
                offset: 2,
                ..HistoryWindow::default()
            })
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].sequence, 1);

        let oldest_first = store
            .history(
                ItemType::Pharmacy,
                item.id,
                HistoryWindow::default().with_order(HistoryOrder::OldestFirst),
            )
            .await
            .unwrap();
        let sequences: Vec<i64> = oldest_first.iter().map(|row| row.sequence).collect();
        assert_eq!(sequences, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn archived_items_are_hidden_and_frozen() {
        let store = InMemoryStockStore::new();
        let item = store.create_item(ItemType::Optical, new_item("CASE-1", 4)).await.unwrap();

        assert!(store.archive_item(ItemType::Optical, item.id).await.unwrap());
        assert!(!store.archive_item(ItemType::Optical, item.id).await.unwrap());

        let filter = ItemFilter {
            limit: 50,
            ..ItemFilter::default()
        };
        let page = store.list_items(ItemType::Optical, &filter).await.unwrap();
        assert_eq!(page.total, 0);

        let result = store
            .apply_movement(draft(&item, MovementType::Purchase, 1, 1), StockPolicy::default())
            .await;
        assert!(matches!(result, Err(LedgerError::ItemNotFound { .. })));
    }

    #[tokio::test]
    async fn low_stock_orders_deeply_negative_items_first() {
        let store = InMemoryStockStore::new();
        let drained = store.create_item(ItemType::Optical, new_item("PAD-1", 0)).await.unwrap();
        let short = store.create_item(ItemType::Optical, new_item("PAD-2", 3)).await.unwrap();
        let mut bottomless = new_item("PAD-3", 0);
        bottomless.reorder_level = i64::MAX;
        let bottomless = store.create_item(ItemType::Optical, bottomless).await.unwrap();

        store
            .apply_movement(
                draft(&drained, MovementType::Adjustment, i64::MIN + 1, 1),
                StockPolicy::default(),
            )
            .await
            .unwrap();

        let low = store.low_stock_items(ItemType::Optical).await.unwrap();
        let ids: Vec<Uuid> = low.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![drained.id, bottomless.id, short.id]);
    }

    #[tokio::test]
    async fn unpriceable_movement_leaves_no_trace() {
        let store = InMemoryStockStore::new();
        let item = store.create_item(ItemType::Pharmacy, new_item("GEL-1", 4)).await.unwrap();

        let mut request = draft(&item, MovementType::Purchase, 2, 1);
        request.unit_price = Some(Decimal::MAX);
        let result = store.apply_movement(request, StockPolicy::default()).await;

        assert!(matches!(result, Err(LedgerError::Validation { field: "unit_price", .. })));
        let current = store.get_item(ItemType::Pharmacy, item.id).await.unwrap().unwrap();
        assert_eq!(current.stock_quantity, 4);
        let ledger = store.ledger(ItemType::Pharmacy, item.id).await.unwrap();
        assert_eq!(ledger.len(), 1);

        store
            .apply_movement(draft(&item, MovementType::Sale, 1, 2), StockPolicy::default())
            .await
            .unwrap();
        let ledger = store.ledger(ItemType::Pharmacy, item.id).await.unwrap();
        assert_eq!(ledger[1].sequence, ledger[0].sequence + 1);
    }
}
