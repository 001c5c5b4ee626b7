use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use eyecare_core::{
    HistoryOrder, HistoryWindow, InventoryItem, ItemType, LedgerError, LedgerResult,
    MovementDirection, MovementDraft, MovementType, Reconciliation, StockMovement, StockPolicy,
    StockStore, checked_price,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::text::{normalize_optional, normalize_optional_long};

/// A stock movement request as submitted by a caller, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub movement_type: MovementType,
    pub movement_date: Option<NaiveDate>,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub reference_number: Option<String>,
    pub supplier: Option<String>,
    pub customer_name: Option<String>,
    pub invoice_id: Option<String>,
    pub notes: Option<String>,
    pub batch_number: Option<String>,
    pub user_id: Option<String>,
}

impl StockAdjustment {
    /// Rejects anything that must not reach the ledger. `today` fills a
    /// missing `movement_date`.
    pub fn validate(self, today: NaiveDate) -> LedgerResult<MovementDraft> {
        let quantity = whole_quantity(self.quantity)?;
        if self.movement_type.requires_positive_quantity() && quantity < 0 {
            return Err(LedgerError::InvalidQuantity(format!(
                "{} quantity must be positive; record corrections as an adjustment",
                self.movement_type
            )));
        }

        let unit_price = self
            .unit_price
            .map(|price| checked_price("unit_price", price))
            .transpose()?;

        let draft = MovementDraft {
            item_type: self.item_type,
            item_id: self.item_id,
            movement_type: self.movement_type,
            movement_date: self.movement_date.unwrap_or(today),
            quantity,
            unit_price,
            reference_number: normalize_optional("reference_number", self.reference_number)?,
            supplier: normalize_optional("supplier", self.supplier)?,
            customer_name: normalize_optional("customer_name", self.customer_name)?,
            invoice_id: normalize_optional("invoice_id", self.invoice_id)?,
            notes: normalize_optional_long("notes", self.notes)?,
            batch_number: normalize_optional("batch_number", self.batch_number)?,
            user_id: normalize_optional("user_id", self.user_id)?,
        };
        draft.total_value()?;
        Ok(draft)
    }
}

fn whole_quantity(quantity: Decimal) -> LedgerResult<i64> {
    if !quantity.fract().is_zero() {
        return Err(LedgerError::InvalidQuantity(
            "quantity must be a whole number".to_string(),
        ));
    }
    if quantity.is_zero() {
        return Err(LedgerError::InvalidQuantity(
            "quantity must be non-zero".to_string(),
        ));
    }
    quantity
        .trunc()
        .to_i64()
        .ok_or_else(|| LedgerError::InvalidQuantity("quantity is out of range".to_string()))
}

/// Informational outcome flags. They never block a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockWarning {
    NegativeStock { stock_quantity: i64 },
    AtOrBelowReorderLevel { stock_quantity: i64, reorder_level: i64 },
}

impl StockWarning {
    pub fn for_item(item: &InventoryItem) -> Vec<Self> {
        let mut warnings = Vec::new();
        if item.stock_quantity < 0 {
            warnings.push(Self::NegativeStock {
                stock_quantity: item.stock_quantity,
            });
        }
        if item.is_at_or_below_reorder_level() {
            warnings.push(Self::AtOrBelowReorderLevel {
                stock_quantity: item.stock_quantity,
                reorder_level: item.reorder_level,
            });
        }
        warnings
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentOutcome {
    pub movement: StockMovement,
    pub item: InventoryItem,
    pub warnings: Vec<StockWarning>,
}

/// A history row with its display direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementView {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub direction: MovementDirection,
}

impl From<StockMovement> for MovementView {
    fn from(movement: StockMovement) -> Self {
        let direction = movement.direction();
        Self {
            movement,
            direction,
        }
    }
}

pub struct StockLedger<S: StockStore + ?Sized> {
    store: Arc<S>,
    policy: StockPolicy,
    history_limit: i64,
}

impl<S: StockStore + ?Sized> Clone for StockLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
            history_limit: self.history_limit,
        }
    }
}

impl<S: StockStore + ?Sized> StockLedger<S> {
    pub fn new(store: Arc<S>, policy: StockPolicy) -> Self {
        Self {
            store,
            policy,
            history_limit: HistoryWindow::DEFAULT_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, history_limit: i64) -> Self {
        self.history_limit = history_limit.clamp(1, HistoryWindow::MAX_LIMIT);
        self
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    pub fn history_limit(&self) -> i64 {
        self.history_limit
    }

    pub async fn adjust(&self, request: StockAdjustment) -> LedgerResult<AdjustmentOutcome> {
        let draft = request.validate(Utc::now().date_naive())?;
        let applied = self.store.apply_movement(draft, self.policy).await?;
        let warnings = StockWarning::for_item(&applied.item);

        info!(
            item_type = %applied.movement.item_type,
            item_id = %applied.movement.item_id,
            movement_type = %applied.movement.movement_type,
            previous_stock = applied.movement.previous_stock,
            new_stock = applied.movement.new_stock,
            "stock movement recorded"
        );
        if !warnings.is_empty() {
            warn!(
                item_id = %applied.item.id,
                stock_quantity = applied.item.stock_quantity,
                reorder_level = applied.item.reorder_level,
                "stock needs attention"
            );
        }

        Ok(AdjustmentOutcome {
            movement: applied.movement,
            item: applied.item,
            warnings,
        })
    }

    pub async fn history(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
        order: HistoryOrder,
    ) -> LedgerResult<Vec<MovementView>> {
        self.require_item(item_type, item_id).await?;
        let window = HistoryWindow::new(limit, offset, self.history_limit).with_order(order);
        let rows = self.store.history(item_type, item_id, window).await?;
        Ok(rows.into_iter().map(MovementView::from).collect())
    }

    pub async fn reconcile(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<Reconciliation> {
        let item = self.require_item(item_type, item_id).await?;
        let ledger = self.store.ledger(item_type, item_id).await?;
        let reconciliation = Reconciliation::build(item, &ledger);

        if !reconciliation.consistent {
            warn!(
                %item_type,
                %item_id,
                ledger_total = reconciliation.ledger_total,
                catalog_stock = reconciliation.catalog_stock,
                violations = reconciliation.violations.len(),
                "ledger and catalog disagree"
            );
        }

        Ok(reconciliation)
    }

    pub async fn low_stock(&self, item_type: ItemType) -> LedgerResult<Vec<InventoryItem>> {
        self.store.low_stock_items(item_type).await
    }

    async fn require_item(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<InventoryItem> {
        self.store
            .get_item(item_type, item_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(item_type, item_id))
    }
}
