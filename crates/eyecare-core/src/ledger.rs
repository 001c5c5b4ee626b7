//! Pure stock arithmetic shared by every store: the movement plan applied on
//! write and the fold used to reconcile the catalog against the ledger.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{InventoryItem, MovementType, StockMovement};

/// Whether a movement may drive on-hand stock below zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockPolicy {
    pub allow_negative_stock: bool,
}

impl Default for StockPolicy {
    fn default() -> Self {
        Self {
            allow_negative_stock: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransition {
    pub previous_stock: i64,
    pub delta: i64,
    pub new_stock: i64,
}

impl StockTransition {
    pub fn plan(
        previous_stock: i64,
        movement_type: MovementType,
        quantity: i64,
        policy: StockPolicy,
    ) -> LedgerResult<Self> {
        let delta = movement_type.signed_delta(quantity);
        let new_stock = previous_stock
            .checked_add(delta)
            .ok_or(LedgerError::StockOverflow)?;

        if new_stock < 0 && delta < 0 && !policy.allow_negative_stock {
            return Err(LedgerError::InsufficientStock {
                available: previous_stock,
                requested: delta.unsigned_abs(),
            });
        }

        Ok(Self {
            previous_stock,
            delta,
            new_stock,
        })
    }
}

/// Folds signed deltas from a zero baseline.
pub fn replay<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> i64 {
    movements
        .into_iter()
        .fold(0i64, |stock, movement| stock.saturating_add(movement.signed_delta()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainViolation {
    /// `new_stock - previous_stock` disagrees with the type/quantity delta.
    DeltaMismatch {
        movement_id: Uuid,
        sequence: i64,
        expected_delta: i64,
        recorded_delta: i64,
    },
    /// The row did not start where the previous row ended.
    Gap {
        movement_id: Uuid,
        sequence: i64,
        expected_previous: i64,
        recorded_previous: i64,
    },
}

/// Checks rows in write order. The first row may start anywhere only if the
/// caller passes `baseline = None`.
pub fn verify_chain(movements: &[StockMovement], baseline: Option<i64>) -> Vec<ChainViolation> {
    let mut violations = Vec::new();
    let mut running = baseline;

    for movement in movements {
        let expected_delta = movement.signed_delta();
        let recorded_delta = movement.new_stock.saturating_sub(movement.previous_stock);
        if expected_delta != recorded_delta {
            violations.push(ChainViolation::DeltaMismatch {
                movement_id: movement.id,
                sequence: movement.sequence,
                expected_delta,
                recorded_delta,
            });
        }

        if let Some(expected_previous) = running
            && expected_previous != movement.previous_stock
        {
            violations.push(ChainViolation::Gap {
                movement_id: movement.id,
                sequence: movement.sequence,
                expected_previous,
                recorded_previous: movement.previous_stock,
            });
        }

        running = Some(movement.new_stock);
    }

    violations
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    pub item: InventoryItem,
    pub movement_count: usize,
    pub ledger_total: i64,
    pub catalog_stock: i64,
    pub consistent: bool,
    pub violations: Vec<ChainViolation>,
}

impl Reconciliation {
    /// `movements` must be the item's full ledger in write order.
    pub fn build(item: InventoryItem, movements: &[StockMovement]) -> Self {
        let ledger_total = replay(movements);
        let violations = verify_chain(movements, Some(0));
        let catalog_stock = item.stock_quantity;

        Self {
            item,
            movement_count: movements.len(),
            ledger_total,
            catalog_stock,
            consistent: ledger_total == catalog_stock && violations.is_empty(),
            violations,
        }
    }
}
