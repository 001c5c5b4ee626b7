use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use eyecare_core::{
    AMOUNT_SCALE, InventoryItem, ItemCatalog, ItemFilter, ItemPage, ItemPatch, ItemType,
    LedgerError, LedgerResult, NewItem, checked_price, line_total,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::text::{normalize_optional, normalize_optional_long, normalize_required};

const DEFAULT_CATEGORY: &str = "general";
const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDraft {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub mrp: Option<Decimal>,
    pub gst_percentage: Option<Decimal>,
    pub reorder_level: Option<i64>,
    pub opening_stock: Option<i64>,
    pub opening_date: Option<NaiveDate>,
    pub user_id: Option<String>,
}

impl ItemDraft {
    pub fn validate(self, today: NaiveDate) -> LedgerResult<NewItem> {
        let opening_stock = self.opening_stock.unwrap_or(0);
        if opening_stock < 0 {
            return Err(LedgerError::validation(
                "opening_stock",
                "opening_stock must be non-negative",
            ));
        }

        let purchase_price =
            non_negative_amount("purchase_price", self.purchase_price)?.unwrap_or(Decimal::ZERO);
        // The opening movement is valued at the purchase price.
        line_total(purchase_price, opening_stock).map_err(|_| {
            LedgerError::validation(
                "opening_stock",
                "opening_stock is too large to value at the purchase price",
            )
        })?;

        Ok(NewItem {
            sku: normalize_sku(&self.sku)?,
            name: normalize_required("name", &self.name)?,
            category: normalize_optional("category", self.category)?
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            manufacturer: normalize_optional("manufacturer", self.manufacturer)?,
            description: normalize_optional_long("description", self.description)?,
            purchase_price,
            selling_price: non_negative_amount("selling_price", self.selling_price)?
                .unwrap_or(Decimal::ZERO),
            mrp: non_negative_amount("mrp", self.mrp)?.unwrap_or(Decimal::ZERO),
            gst_percentage: gst_percentage(self.gst_percentage)?.unwrap_or(Decimal::ZERO),
            reorder_level: reorder_level(self.reorder_level)?.unwrap_or(0),
            opening_stock,
            opening_date: self.opening_date.unwrap_or(today),
            user_id: normalize_optional("user_id", self.user_id)?,
        })
    }
}

/// Changes to an existing item. `stock_quantity` is accepted only so that an
/// attempt to set it can be refused explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemUpdate {
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
    pub stock_quantity: Option<i64>,
}

impl ItemUpdate {
    pub fn validate(self) -> LedgerResult<ItemPatch> {
        if self.stock_quantity.is_some() {
            return Err(LedgerError::validation(
                "stock_quantity",
                "stock_quantity changes only through stock movements",
            ));
        }

        Ok(ItemPatch {
            sku: self.sku.as_deref().map(normalize_sku).transpose()?,
            name: self
                .name
                .as_deref()
                .map(|name| normalize_required("name", name))
                .transpose()?,
            category: normalize_optional("category", self.category)?,
            manufacturer: normalize_optional("manufacturer", self.manufacturer)?,
            description: normalize_optional_long("description", self.description)?,
            purchase_price: non_negative_amount("purchase_price", self.purchase_price)?,
            selling_price: non_negative_amount("selling_price", self.selling_price)?,
            mrp: non_negative_amount("mrp", self.mrp)?,
            gst_percentage: gst_percentage(self.gst_percentage)?,
            reorder_level: reorder_level(self.reorder_level)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListItems {
    pub category: Option<String>,
    pub search: Option<String>,
    pub include_archived: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListItems {
    pub fn into_filter(self) -> LedgerResult<ItemFilter> {
        Ok(ItemFilter {
            category: normalize_optional("category", self.category)?,
            search: normalize_optional("search", self.search)?,
            include_archived: self.include_archived.unwrap_or(false),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0).max(0),
        })
    }
}

fn normalize_sku(value: &str) -> LedgerResult<String> {
    Ok(normalize_required("sku", value)?.to_ascii_uppercase())
}

fn non_negative_amount(field: &'static str, value: Option<Decimal>) -> LedgerResult<Option<Decimal>> {
    value.map(|amount| checked_price(field, amount)).transpose()
}

fn gst_percentage(value: Option<Decimal>) -> LedgerResult<Option<Decimal>> {
    match value {
        Some(pct) if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED => Err(
            LedgerError::validation("gst_percentage", "gst_percentage must be between 0 and 100"),
        ),
        Some(pct) if pct.normalize().scale() > AMOUNT_SCALE => Err(LedgerError::validation(
            "gst_percentage",
            format!("gst_percentage must have at most {AMOUNT_SCALE} decimal places"),
        )),
        other => Ok(other),
    }
}

fn reorder_level(value: Option<i64>) -> LedgerResult<Option<i64>> {
    match value {
        Some(level) if level < 0 => Err(LedgerError::validation(
            "reorder_level",
            "reorder_level must be non-negative",
        )),
        other => Ok(other),
    }
}

/// Catalog maintenance for both item kinds.
pub struct Catalog<S: ItemCatalog + ?Sized> {
    store: Arc<S>,
}

impl<S: ItemCatalog + ?Sized> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ItemCatalog + ?Sized> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn list(&self, item_type: ItemType, query: ListItems) -> LedgerResult<ItemPage> {
        let filter = query.into_filter()?;
        self.store.list_items(item_type, &filter).await
    }

    pub async fn get(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<InventoryItem> {
        self.store
            .get_item(item_type, item_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(item_type, item_id))
    }

    pub async fn create(&self, item_type: ItemType, draft: ItemDraft) -> LedgerResult<InventoryItem> {
        let new_item = draft.validate(Utc::now().date_naive())?;
        let item = self.store.create_item(item_type, new_item).await?;
        info!(%item_type, item_id = %item.id, sku = %item.sku, stock_quantity = item.stock_quantity, "catalog item created");
        Ok(item)
    }

    pub async fn update(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        update: ItemUpdate,
    ) -> LedgerResult<InventoryItem> {
        let patch = update.validate()?;
        self.store
            .update_item(item_type, item_id, patch)
            .await?
            .ok_or_else(|| LedgerError::not_found(item_type, item_id))
    }

    pub async fn archive(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<()> {
        if !self.store.archive_item(item_type, item_id).await? {
            return Err(LedgerError::not_found(item_type, item_id));
        }
        info!(%item_type, %item_id, "catalog item archived");
        Ok(())
    }
}
