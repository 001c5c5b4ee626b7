use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use eyecare_core::{InventoryItem, LowStockAlert, STOCK_MOVEMENTS_CHANNEL, StockMovementRecorded};
use eyecare_inventory::StockLedger;
use eyecare_platform::{PgStockStore, RedisBus, ServiceConfig, connect_database};
use futures_util::StreamExt;
use redis::Msg;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "eyecare_ops=info".to_string()),
        )
        .init();

    let config = ServiceConfig::worker_from_env()?;
    let pool = connect_database(config.require_database_url()?, config.db_max_connections).await?;
    let redis_url = config.redis_url.as_deref().context("REDIS_URL is required")?;
    let redis = RedisBus::connect(redis_url)?;
    let ledger = StockLedger::new(Arc::new(PgStockStore::new(pool)), config.stock_policy);

    let mut pubsub = redis.subscribe(STOCK_MOVEMENTS_CHANNEL).await?;
    let mut messages = pubsub.on_message();

    info!("ops worker subscribed to {STOCK_MOVEMENTS_CHANNEL}");

    loop {
        let msg = messages
            .next()
            .await
            .with_context(|| format!("{STOCK_MOVEMENTS_CHANNEL} stream ended unexpectedly"))?;
        if let Err(err) = handle_message(&ledger, &redis, msg).await {
            error!("failed to process stock movement: {err:#}");
        }
    }
}

async fn handle_message(
    ledger: &StockLedger<PgStockStore>,
    redis: &RedisBus,
    msg: Msg,
) -> Result<()> {
    let payload: String = msg.get_payload()?;
    let event: StockMovementRecorded = serde_json::from_str(&payload)?;

    // The event is only a hint; both checks re-read committed state.
    let reconciliation = ledger.reconcile(event.item_type, event.item_id).await?;
    if !reconciliation.consistent {
        error!(
            item_type = %event.item_type,
            item_id = %event.item_id,
            movement_id = %event.movement_id,
            ledger_total = reconciliation.ledger_total,
            catalog_stock = reconciliation.catalog_stock,
            "stock ledger does not reconcile: {:?}",
            reconciliation.violations
        );
    }

    if let Some(alert) = low_stock_alert(&reconciliation.item, Utc::now()) {
        redis.publish_low_stock(&alert).await?;
        warn!(
            item_type = %alert.item_type,
            item_id = %alert.item_id,
            stock_quantity = alert.stock_quantity,
            reorder_level = alert.reorder_level,
            "{} is at or below its reorder level",
            alert.item_name
        );
    }

    Ok(())
}

fn low_stock_alert(item: &InventoryItem, raised_at: DateTime<Utc>) -> Option<LowStockAlert> {
    if item.is_archived() || !item.is_at_or_below_reorder_level() {
        return None;
    }

    Some(LowStockAlert {
        item_type: item.item_type,
        item_id: item.id,
        item_name: item.name.clone(),
        stock_quantity: item.stock_quantity,
        reorder_level: item.reorder_level,
        raised_at,
    })
}
