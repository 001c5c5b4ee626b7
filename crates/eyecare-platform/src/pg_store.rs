use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use eyecare_core::{
    AppliedMovement, HistoryOrder, HistoryWindow, InventoryItem, ItemCatalog, ItemFilter, ItemPage,
    ItemPatch, ItemType, LedgerError, LedgerResult, MovementDraft, MovementLedger, NewItem,
    StockMovement, StockPolicy, StockTransition,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, sku, name, category, manufacturer, description, purchase_price, \
     selling_price, mrp, gst_percentage, stock_quantity, reorder_level, created_at, updated_at, \
     archived_at";

const MOVEMENT_COLUMNS: &str = "id, sequence, item_type, item_id, item_name, movement_type, \
     movement_date, quantity, unit_price, total_value, previous_stock, new_stock, \
     reference_number, supplier, customer_name, invoice_id, notes, batch_number, user_id, \
     created_at";

/// Postgres-backed catalog and ledger. Each movement locks its catalog row,
/// increments stock server-side and appends the ledger row in one
/// transaction.
#[derive(Clone)]
pub struct PgStockStore {
    pool: PgPool,
}

impl PgStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ItemCatalog for PgStockStore {
    async fn list_items(&self, item_type: ItemType, filter: &ItemFilter) -> LedgerResult<ItemPage> {
        let table = item_type.catalog_table();
        let search = filter.search.as_deref().map(like_pattern);
        let predicate = r#"
            ($1::text IS NULL OR lower(category) = lower($1))
              AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)
              AND ($3 OR archived_at IS NULL)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {table} WHERE {predicate}"
        ))
        .bind(filter.category.as_deref())
        .bind(search.as_deref())
        .bind(filter.include_archived)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM {table}
            WHERE {predicate}
            ORDER BY name ASC, id ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.category.as_deref())
        .bind(search.as_deref())
        .bind(filter.include_archived)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(item_from_row(item_type, &row)?);
        }

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
        let table = item_type.catalog_table();
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM {table} WHERE id = $1"))
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(|row| item_from_row(item_type, &row)).transpose()
    }

    async fn create_item(&self, item_type: ItemType, new_item: NewItem) -> LedgerResult<InventoryItem> {
        let table = item_type.catalog_table();
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO {table} (
                id, sku, name, category, manufacturer, description, purchase_price,
                selling_price, mrp, gst_percentage, stock_quantity, reorder_level,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, $12, $12)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_item.sku)
        .bind(&new_item.name)
        .bind(&new_item.category)
        .bind(&new_item.manufacturer)
        .bind(&new_item.description)
        .bind(new_item.purchase_price)
        .bind(new_item.selling_price)
        .bind(new_item.mrp)
        .bind(new_item.gst_percentage)
        .bind(new_item.reorder_level)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| write_error(err, &new_item.sku))?;
        let item = item_from_row(item_type, &row)?;

        let item = if new_item.opening_stock == 0 {
            item
        } else {
            let draft = MovementDraft::opening_stock(&item, &new_item);
            apply_in_tx(&mut tx, draft, StockPolicy::default()).await?.item
        };

        tx.commit().await.map_err(storage_error)?;
        Ok(item)
    }

    async fn update_item(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        patch: ItemPatch,
    ) -> LedgerResult<Option<InventoryItem>> {
        let table = item_type.catalog_table();
        let sku = patch.sku.clone().unwrap_or_default();

        let row = sqlx::query(&format!(
            r#"
            UPDATE {table}
            SET sku = COALESCE($2, sku),
                name = COALESCE($3, name),
                category = COALESCE($4, category),
                manufacturer = COALESCE($5, manufacturer),
                description = COALESCE($6, description),
                purchase_price = COALESCE($7, purchase_price),
                selling_price = COALESCE($8, selling_price),
                mrp = COALESCE($9, mrp),
                gst_percentage = COALESCE($10, gst_percentage),
                reorder_level = COALESCE($11, reorder_level),
                updated_at = $12
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(patch.sku)
        .bind(patch.name)
        .bind(patch.category)
        .bind(patch.manufacturer)
        .bind(patch.description)
        .bind(patch.purchase_price)
        .bind(patch.selling_price)
        .bind(patch.mrp)
        .bind(patch.gst_percentage)
        .bind(patch.reorder_level)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| write_error(err, &sku))?;

        row.map(|row| item_from_row(item_type, &row)).transpose()
    }

    async fn archive_item(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<bool> {
        let table = item_type.catalog_table();
        let result = sqlx::query(&format!(
            "UPDATE {table} SET archived_at = $2, updated_at = $2 WHERE id = $1 AND archived_at IS NULL"
        ))
        .bind(item_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn low_stock_items(&self, item_type: ItemType) -> LedgerResult<Vec<InventoryItem>> {
        let table = item_type.catalog_table();
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM {table}
            WHERE archived_at IS NULL AND stock_quantity <= reorder_level
            ORDER BY stock_quantity::NUMERIC - reorder_level ASC, name ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(|row| item_from_row(item_type, row)).collect()
    }
}

#[async_trait]
impl MovementLedger for PgStockStore {
    async fn apply_movement(
        &self,
        draft: MovementDraft,
        policy: StockPolicy,
    ) -> LedgerResult<AppliedMovement> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        let applied = apply_in_tx(&mut tx, draft, policy).await?;
        tx.commit().await.map_err(storage_error)?;
        Ok(applied)
    }

    async fn history(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        window: HistoryWindow,
    ) -> LedgerResult<Vec<StockMovement>> {
        let direction = match window.order {
            HistoryOrder::NewestFirst => "DESC",
            HistoryOrder::OldestFirst => "ASC",
        };
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE item_type = $1 AND item_id = $2
            ORDER BY movement_date {direction}, sequence {direction}
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(item_type.as_str())
        .bind(item_id)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(movement_from_row).collect()
    }

    async fn ledger(&self, item_type: ItemType, item_id: Uuid) -> LedgerResult<Vec<StockMovement>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE item_type = $1 AND item_id = $2
            ORDER BY sequence ASC
            "#
        ))
        .bind(item_type.as_str())
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(movement_from_row).collect()
    }
}

async fn apply_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    draft: MovementDraft,
    policy: StockPolicy,
) -> LedgerResult<AppliedMovement> {
    let table = draft.item_type.catalog_table();

    let current = sqlx::query(&format!(
        "SELECT name, stock_quantity FROM {table} WHERE id = $1 AND archived_at IS NULL FOR UPDATE"
    ))
    .bind(draft.item_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(storage_error)?;

    let Some(current) = current else {
        return Err(LedgerError::not_found(draft.item_type, draft.item_id));
    };
    let item_name: String = current.try_get("name").map_err(storage_error)?;
    let stock_quantity: i64 = current.try_get("stock_quantity").map_err(storage_error)?;

    let transition =
        StockTransition::plan(stock_quantity, draft.movement_type, draft.quantity, policy)?;
    let now = Utc::now();

    let item_row = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET stock_quantity = stock_quantity + $2,
            updated_at = $3
        WHERE id = $1
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(draft.item_id)
    .bind(transition.delta)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .map_err(storage_error)?;
    let item = item_from_row(draft.item_type, &item_row)?;

    if item.stock_quantity != transition.new_stock {
        return Err(LedgerError::Storage(anyhow::anyhow!(
            "catalog stock {} diverged from planned {} for {} item {}",
            item.stock_quantity,
            transition.new_stock,
            item.item_type,
            item.id
        )));
    }

    let mut movement =
        draft.into_movement(item_name, 0, transition.previous_stock, transition.new_stock, now)?;

    movement.sequence = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO stock_movements (
            id, item_type, item_id, item_name, movement_type, movement_date, quantity,
            unit_price, total_value, previous_stock, new_stock, reference_number, supplier,
            customer_name, invoice_id, notes, batch_number, user_id, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING sequence
        "#,
    )
    .bind(movement.id)
    .bind(movement.item_type.as_str())
    .bind(movement.item_id)
    .bind(&movement.item_name)
    .bind(movement.movement_type.as_str())
    .bind(movement.movement_date)
    .bind(movement.quantity)
    .bind(movement.unit_price)
    .bind(movement.total_value)
    .bind(movement.previous_stock)
    .bind(movement.new_stock)
    .bind(&movement.reference_number)
    .bind(&movement.supplier)
    .bind(&movement.customer_name)
    .bind(&movement.invoice_id)
    .bind(&movement.notes)
    .bind(&movement.batch_number)
    .bind(&movement.user_id)
    .bind(movement.created_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(storage_error)?;

    debug!(
        movement_id = %movement.id,
        sequence = movement.sequence,
        "stock movement appended"
    );

    Ok(AppliedMovement { movement, item })
}

fn item_from_row(item_type: ItemType, row: &PgRow) -> LedgerResult<InventoryItem> {
    Ok(InventoryItem {
        id: row.try_get("id").map_err(storage_error)?,
        item_type,
        sku: row.try_get("sku").map_err(storage_error)?,
        name: row.try_get("name").map_err(storage_error)?,
        category: row.try_get("category").map_err(storage_error)?,
        manufacturer: row.try_get("manufacturer").map_err(storage_error)?,
        description: row.try_get("description").map_err(storage_error)?,
        purchase_price: row.try_get("purchase_price").map_err(storage_error)?,
        selling_price: row.try_get("selling_price").map_err(storage_error)?,
        mrp: row.try_get("mrp").map_err(storage_error)?,
        gst_percentage: row.try_get("gst_percentage").map_err(storage_error)?,
        stock_quantity: row.try_get("stock_quantity").map_err(storage_error)?,
        reorder_level: row.try_get("reorder_level").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
        updated_at: row.try_get("updated_at").map_err(storage_error)?,
        archived_at: row.try_get("archived_at").map_err(storage_error)?,
    })
}

fn movement_from_row(row: &PgRow) -> LedgerResult<StockMovement> {
    let item_type: String = row.try_get("item_type").map_err(storage_error)?;
    let movement_type: String = row.try_get("movement_type").map_err(storage_error)?;

    Ok(StockMovement {
        id: row.try_get("id").map_err(storage_error)?,
        sequence: row.try_get("sequence").map_err(storage_error)?,
        item_type: item_type
            .parse()
            .with_context(|| format!("unexpected item_type {item_type} in stock_movements"))?,
        item_id: row.try_get("item_id").map_err(storage_error)?,
        item_name: row.try_get("item_name").map_err(storage_error)?,
        movement_type: movement_type
            .parse()
            .with_context(|| format!("unexpected movement_type {movement_type} in stock_movements"))?,
        movement_date: row.try_get("movement_date").map_err(storage_error)?,
        quantity: row.try_get("quantity").map_err(storage_error)?,
        unit_price: row.try_get("unit_price").map_err(storage_error)?,
        total_value: row.try_get("total_value").map_err(storage_error)?,
        previous_stock: row.try_get("previous_stock").map_err(storage_error)?,
        new_stock: row.try_get("new_stock").map_err(storage_error)?,
        reference_number: row.try_get("reference_number").map_err(storage_error)?,
        supplier: row.try_get("supplier").map_err(storage_error)?,
        customer_name: row.try_get("customer_name").map_err(storage_error)?,
        invoice_id: row.try_get("invoice_id").map_err(storage_error)?,
        notes: row.try_get("notes").map_err(storage_error)?,
        batch_number: row.try_get("batch_number").map_err(storage_error)?,
        user_id: row.try_get("user_id").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
    })
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn storage_error(err: sqlx::Error) -> LedgerError {
    LedgerError::Storage(err.into())
}

fn write_error(err: sqlx::Error, sku: &str) -> LedgerError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return LedgerError::validation("sku", format!("sku {sku} already exists"));
    }
    storage_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("lens"), "%lens%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
