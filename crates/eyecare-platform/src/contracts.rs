use chrono::NaiveDate;
use eyecare_core::{
    HistoryOrder, InventoryItem, ItemType, LedgerError, LedgerResult, StockMovement,
};
use eyecare_inventory::{MovementView, StockAdjustment, StockWarning};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /stock/movements`. Enumerations arrive as text so that an
/// unknown value is reported against its field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustmentRequest {
    pub item_type: String,
    pub item_id: Uuid,
    pub movement_type: String,
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

impl TryFrom<StockAdjustmentRequest> for StockAdjustment {
    type Error = LedgerError;

    fn try_from(request: StockAdjustmentRequest) -> LedgerResult<Self> {
        Ok(Self {
            item_type: request.item_type.parse()?,
            item_id: request.item_id,
            movement_type: request.movement_type.parse()?,
            movement_date: request.movement_date,
            quantity: request.quantity,
            unit_price: request.unit_price,
            reference_number: request.reference_number,
            supplier: request.supplier,
            customer_name: request.customer_name,
            invoice_id: request.invoice_id,
            notes: request.notes,
            batch_number: request.batch_number,
            user_id: request.user_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustmentResponse {
    pub movement: StockMovement,
    pub item: InventoryItem,
    pub warnings: Vec<StockWarning>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockHistoryQuery {
    pub item_type: Option<String>,
    pub item_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// `desc` (newest first, the default) or `asc` on `movement_date`.
    pub order: Option<String>,
}

impl StockHistoryQuery {
    pub fn order(&self) -> LedgerResult<HistoryOrder> {
        self.order
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(str::parse::<HistoryOrder>)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    pub fn target(&self) -> LedgerResult<(ItemType, Uuid)> {
        let item_type = self
            .item_type
            .as_deref()
            .ok_or_else(|| LedgerError::validation("item_type", "item_type is required"))?
            .parse::<ItemType>()?;
        let item_id = self
            .item_id
            .as_deref()
            .ok_or_else(|| LedgerError::validation("item_id", "item_id is required"))?
            .trim()
            .parse::<Uuid>()
            .map_err(|_| LedgerError::validation("item_id", "item_id must be a UUID"))?;
        Ok((item_type, item_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockHistoryResponse {
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub order: HistoryOrder,
    pub items: Vec<MovementView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockResponse {
    pub item_type: ItemType,
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}
