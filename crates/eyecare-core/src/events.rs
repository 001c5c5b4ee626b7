use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ItemType, MovementType, StockMovement};

pub const STOCK_MOVEMENTS_CHANNEL: &str = "stock.movements";
pub const STOCK_ALERTS_CHANNEL: &str = "stock.alerts";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovementRecorded {
    pub movement_id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub movement_type: MovementType,
    pub movement_date: NaiveDate,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub recorded_at: DateTime<Utc>,
}

impl From<&StockMovement> for StockMovementRecorded {
    fn from(movement: &StockMovement) -> Self {
        Self {
            movement_id: movement.id,
            item_type: movement.item_type,
            item_id: movement.item_id,
            movement_type: movement.movement_type,
            movement_date: movement.movement_date,
            previous_stock: movement.previous_stock,
            new_stock: movement.new_stock,
            recorded_at: movement.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub item_name: String,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub raised_at: DateTime<Utc>,
}
