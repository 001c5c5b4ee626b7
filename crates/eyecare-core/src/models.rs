use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::line_total;
use crate::error::{LedgerError, LedgerResult};

/// The two stocked catalogs. Both share one item shape; only the backing
/// table differs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Pharmacy,
    Optical,
}

impl ItemType {
    pub const ALL: [ItemType; 2] = [ItemType::Pharmacy, ItemType::Optical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pharmacy => "pharmacy",
            Self::Optical => "optical",
        }
    }

    pub fn catalog_table(&self) -> &'static str {
        match self {
            Self::Pharmacy => "pharmacy_items",
            Self::Optical => "optical_items",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pharmacy" => Ok(Self::Pharmacy),
            "optical" => Ok(Self::Optical),
            _ => Err(LedgerError::validation(
                "item_type",
                "item_type must be pharmacy or optical",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Purchase,
    Sale,
    Adjustment,
    Return,
    Expired,
    Damaged,
}

impl MovementType {
    pub const ALL: [MovementType; 6] = [
        MovementType::Purchase,
        MovementType::Sale,
        MovementType::Adjustment,
        MovementType::Return,
        MovementType::Expired,
        MovementType::Damaged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::Adjustment => "adjustment",
            Self::Return => "return",
            Self::Expired => "expired",
            Self::Damaged => "damaged",
        }
    }

    /// Every type except `adjustment` takes an unsigned magnitude; the sign
    /// comes from the type.
    pub fn requires_positive_quantity(&self) -> bool {
        !matches!(self, Self::Adjustment)
    }

    /// Signed effect of `quantity` on the on-hand stock.
    pub fn signed_delta(&self, quantity: i64) -> i64 {
        match self {
            Self::Purchase | Self::Return | Self::Adjustment => quantity,
            Self::Sale | Self::Expired | Self::Damaged => -quantity,
        }
    }

    pub fn direction(&self, quantity: i64) -> MovementDirection {
        MovementDirection::of_delta(self.signed_delta(quantity))
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
            .ok_or_else(|| {
                LedgerError::validation(
                    "movement_type",
                    "movement_type must be one of purchase, sale, adjustment, return, expired, damaged",
                )
            })
    }
}

/// Display classification of a movement. Never used to recompute stock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Increase,
    Decrease,
}

impl MovementDirection {
    pub fn of_delta(delta: i64) -> Self {
        if delta < 0 { Self::Decrease } else { Self::Increase }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub item_type: ItemType,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub mrp: Decimal,
    pub gst_percentage: Decimal,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn is_at_or_below_reorder_level(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }
}

/// Validated input for a new catalog item. `opening_stock` is recorded as a
/// ledger movement, never written directly to `stock_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub mrp: Decimal,
    pub gst_percentage: Decimal,
    pub reorder_level: i64,
    pub opening_stock: i64,
    pub opening_date: NaiveDate,
    pub user_id: Option<String>,
}

/// Partial update of the non-stock fields of an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub mrp: Option<Decimal>,
    pub gst_percentage: Option<Decimal>,
    pub reorder_level: Option<i64>,
}

impl ItemPatch {
    pub fn apply_to(&self, item: &mut InventoryItem) {
        if let Some(sku) = &self.sku {
            item.sku = sku.clone();
        }
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
        if let Some(manufacturer) = &self.manufacturer {
            item.manufacturer = Some(manufacturer.clone());
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(purchase_price) = self.purchase_price {
            item.purchase_price = purchase_price;
        }
        if let Some(selling_price) = self.selling_price {
            item.selling_price = selling_price;
        }
        if let Some(mrp) = self.mrp {
            item.mrp = mrp;
        }
        if let Some(gst_percentage) = self.gst_percentage {
            item.gst_percentage = gst_percentage;
        }
        if let Some(reorder_level) = self.reorder_level {
            item.reorder_level = reorder_level;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub include_archived: bool,
    pub limit: i64,
    pub offset: i64,
}

impl ItemFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if !self.include_archived && item.is_archived() {
            return false;
        }
        if let Some(category) = &self.category
            && !item.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !item.name.to_lowercase().contains(&needle)
                && !item.sku.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPage {
    pub items: Vec<InventoryItem>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// One immutable ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    pub id: Uuid,
    pub sequence: i64,
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub item_name: String,
    pub movement_type: MovementType,
    pub movement_date: NaiveDate,
    pub quantity: i64,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reference_number: Option<String>,
    pub supplier: Option<String>,
    pub customer_name: Option<String>,
    pub invoice_id: Option<String>,
    pub notes: Option<String>,
    pub batch_number: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn signed_delta(&self) -> i64 {
        self.movement_type.signed_delta(self.quantity)
    }

    pub fn direction(&self) -> MovementDirection {
        self.movement_type.direction(self.quantity)
    }
}

/// A validated movement request, ready for a store to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementDraft {
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub movement_type: MovementType,
    pub movement_date: NaiveDate,
    pub quantity: i64,
    pub unit_price: Option<Decimal>,
    pub reference_number: Option<String>,
    pub supplier: Option<String>,
    pub customer_name: Option<String>,
    pub invoice_id: Option<String>,
    pub notes: Option<String>,
    pub batch_number: Option<String>,
    pub user_id: Option<String>,
}

impl MovementDraft {
    pub fn total_value(&self) -> LedgerResult<Option<Decimal>> {
        self.unit_price
            .map(|unit_price| line_total(unit_price, self.quantity))
            .transpose()
    }

    /// Ledger row that brings a freshly created item from 0 to its opening stock.
    pub fn opening_stock(item: &InventoryItem, new_item: &NewItem) -> Self {
        Self {
            item_type: item.item_type,
            item_id: item.id,
            movement_type: MovementType::Adjustment,
            movement_date: new_item.opening_date,
            quantity: new_item.opening_stock,
            unit_price: Some(new_item.purchase_price),
            reference_number: None,
            supplier: None,
            customer_name: None,
            invoice_id: None,
            notes: Some("opening stock".to_string()),
            batch_number: None,
            user_id: new_item.user_id.clone(),
        }
    }

    pub fn into_movement(
        self,
        item_name: String,
        sequence: i64,
        previous_stock: i64,
        new_stock: i64,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<StockMovement> {
        let total_value = self.total_value()?;
        Ok(StockMovement {
            id: Uuid::new_v4(),
            sequence,
            item_type: self.item_type,
            item_id: self.item_id,
            item_name,
            movement_type: self.movement_type,
            movement_date: self.movement_date,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_value,
            previous_stock,
            new_stock,
            reference_number: self.reference_number,
            supplier: self.supplier,
            customer_name: self.customer_name,
            invoice_id: self.invoice_id,
            notes: self.notes,
            batch_number: self.batch_number,
            user_id: self.user_id,
            created_at,
        })
    }
}

/// Result of a committed movement: the ledger row plus the item as it stands
/// after the catalog update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedMovement {
    pub movement: StockMovement,
    pub item: InventoryItem,
}

/// Sort direction of a history page on `movement_date`, ties broken by write
/// order in the same direction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum HistoryOrder {
    #[default]
    #[serde(rename = "desc")]
    NewestFirst,
    #[serde(rename = "asc")]
    OldestFirst,
}

impl HistoryOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewestFirst => "desc",
            Self::OldestFirst => "asc",
        }
    }
}

impl FromStr for HistoryOrder {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "desc" => Ok(Self::NewestFirst),
            "asc" => Ok(Self::OldestFirst),
            other => Err(LedgerError::validation(
                "order",
                format!("order must be asc or desc, got {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryWindow {
    pub limit: i64,
    pub offset: i64,
    pub order: HistoryOrder,
}

impl HistoryWindow {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 500;

    pub fn new(limit: Option<i64>, offset: Option<i64>, default_limit: i64) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
            order: HistoryOrder::default(),
        }
    }

    pub fn with_order(mut self, order: HistoryOrder) -> Self {
        self.order = order;
        self
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
            order: HistoryOrder::NewestFirst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_table_matches_movement_types() {
        assert_eq!(MovementType::Purchase.signed_delta(20), 20);
        assert_eq!(MovementType::Return.signed_delta(4), 4);
        assert_eq!(MovementType::Adjustment.signed_delta(-5), -5);
        assert_eq!(MovementType::Adjustment.signed_delta(7), 7);
        assert_eq!(MovementType::Sale.signed_delta(15), -15);
        assert_eq!(MovementType::Expired.signed_delta(3), -3);
        assert_eq!(MovementType::Damaged.signed_delta(10), -10);
    }

    #[test]
    fn direction_follows_sign() {
        assert_eq!(
            MovementType::Adjustment.direction(-1),
            MovementDirection::Decrease
        );
        assert_eq!(
            MovementType::Adjustment.direction(1),
            MovementDirection::Increase
        );
        assert_eq!(MovementType::Sale.direction(2), MovementDirection::Decrease);
        assert_eq!(MovementType::Return.direction(2), MovementDirection::Increase);
    }

    #[test]
    fn parses_types_case_insensitively() {
        assert_eq!(" Optical ".parse::<ItemType>().ok(), Some(ItemType::Optical));
        assert_eq!("DAMAGED".parse::<MovementType>().ok(), Some(MovementType::Damaged));
        assert!("transfer".parse::<MovementType>().is_err());
        assert!("surgical".parse::<ItemType>().is_err());
    }

    #[test]
    fn total_value_uses_magnitude() {
        let draft = MovementDraft {
            item_type: ItemType::Pharmacy,
            item_id: Uuid::new_v4(),
            movement_type: MovementType::Adjustment,
            movement_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap_or_default(),
            quantity: -4,
            unit_price: Some(Decimal::new(1250, 2)),
            reference_number: None,
            supplier: None,
            customer_name: None,
            invoice_id: None,
            notes: None,
            batch_number: None,
            user_id: None,
        };

        assert_eq!(draft.total_value().unwrap(), Some(Decimal::new(5000, 2)));
    }

    #[test]
    fn total_value_overflow_is_a_unit_price_error() {
        let draft = MovementDraft {
            item_type: ItemType::Optical,
            item_id: Uuid::new_v4(),
            movement_type: MovementType::Purchase,
            movement_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap_or_default(),
            quantity: 2,
            unit_price: Some(Decimal::MAX),
            reference_number: None,
            supplier: None,
            customer_name: None,
            invoice_id: None,
            notes: None,
            batch_number: None,
            user_id: None,
        };

        let err = draft.total_value().unwrap_err();
        assert_eq!(err.field(), Some("unit_price"));
    }

    #[test]
    fn history_window_clamps() {
        assert_eq!(HistoryWindow::new(None, None, 100).limit, 100);
        assert_eq!(HistoryWindow::new(Some(0), Some(-3), 100), HistoryWindow {
            limit: 1,
            offset: 0,
            order: HistoryOrder::NewestFirst,
        });
        assert_eq!(HistoryWindow::new(Some(10_000), None, 100).limit, 500);
    }

    #[test]
    fn history_order_parses_asc_and_desc() {
        assert_eq!("ASC".parse::<HistoryOrder>().ok(), Some(HistoryOrder::OldestFirst));
        assert_eq!(" desc ".parse::<HistoryOrder>().ok(), Some(HistoryOrder::NewestFirst));
        let err = "sideways".parse::<HistoryOrder>().unwrap_err();
        assert_eq!(err.field(), Some("order"));
    }
}
