use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use eyecare_core::{
    InventoryItem, ItemPage, ItemType, LedgerError, Reconciliation, StockMovementRecorded,
    StockPolicy, StockStore,
};
use eyecare_inventory::{Catalog, ItemDraft, ItemUpdate, ListItems, StockAdjustment, StockLedger};
use eyecare_platform::{
    LowStockResponse, RedisBus, StockAdjustmentRequest, StockAdjustmentResponse,
    StockHistoryQuery, StockHistoryResponse,
};
use tracing::error;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub ledger: StockLedger<dyn StockStore>,
    pub catalog: Catalog<dyn StockStore>,
    pub events: Option<RedisBus>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn StockStore>,
        policy: StockPolicy,
        history_limit: i64,
        events: Option<RedisBus>,
    ) -> Self {
        Self {
            catalog: Catalog::new(Arc::clone(&store)),
            ledger: StockLedger::new(store, policy).with_history_limit(history_limit),
            events,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/items/{item_type}", get(list_items).post(create_item))
        .route("/items/{item_type}/low-stock", get(low_stock))
        .route(
            "/items/{item_type}/{item_id}",
            get(get_item).patch(update_item).delete(archive_item),
        )
        .route(
            "/items/{item_type}/{item_id}/reconciliation",
            get(reconcile_item),
        )
        .route("/stock/movements", get(stock_history).post(record_movement))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_items(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
    Query(query): Query<ListItems>,
) -> Result<Json<ItemPage>, ApiError> {
    let item_type = parse_item_type(&item_type)?;
    Ok(Json(state.catalog.list(item_type, query).await?))
}

async fn create_item(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
    payload: Result<Json<ItemDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let item_type = parse_item_type(&item_type)?;
    let Json(draft) = payload.map_err(body_error)?;
    let item = state.catalog.create(item_type, draft).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(String, String)>,
) -> Result<Json<InventoryItem>, ApiError> {
    let (item_type, item_id) = parse_target(&item_type, &item_id)?;
    Ok(Json(state.catalog.get(item_type, item_id).await?))
}

async fn update_item(
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(String, String)>,
    payload: Result<Json<ItemUpdate>, JsonRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let (item_type, item_id) = parse_target(&item_type, &item_id)?;
    let Json(update) = payload.map_err(body_error)?;
    Ok(Json(state.catalog.update(item_type, item_id, update).await?))
}

async fn archive_item(
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let (item_type, item_id) = parse_target(&item_type, &item_id)?;
    state.catalog.archive(item_type, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reconcile_item(
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(String, String)>,
) -> Result<Json<Reconciliation>, ApiError> {
    let (item_type, item_id) = parse_target(&item_type, &item_id)?;
    Ok(Json(state.ledger.reconcile(item_type, item_id).await?))
}

async fn low_stock(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
) -> Result<Json<LowStockResponse>, ApiError> {
    let item_type = parse_item_type(&item_type)?;
    let items = state.ledger.low_stock(item_type).await?;
    Ok(Json(LowStockResponse { item_type, items }))
}

async fn record_movement(
    State(state): State<AppState>,
    payload: Result<Json<StockAdjustmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StockAdjustmentResponse>), ApiError> {
    let Json(payload) = payload.map_err(body_error)?;
    let adjustment = StockAdjustment::try_from(payload)?;
    let outcome = state.ledger.adjust(adjustment).await?;

    if let Some(events) = &state.events {
        let event = StockMovementRecorded::from(&outcome.movement);
        if let Err(err) = events.publish_movement(&event).await {
            error!("failed to publish stock movement {}: {err:#}", event.movement_id);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(StockAdjustmentResponse {
            movement: outcome.movement,
            item: outcome.item,
            warnings: outcome.warnings,
        }),
    ))
}

async fn stock_history(
    State(state): State<AppState>,
    Query(query): Query<StockHistoryQuery>,
) -> Result<Json<StockHistoryResponse>, ApiError> {
    let (item_type, item_id) = query.target()?;
    let order = query.order()?;
    let items = state
        .ledger
        .history(item_type, item_id, query.limit, query.offset, order)
        .await?;

    Ok(Json(StockHistoryResponse {
        item_type,
        item_id,
        order,
        items,
    }))
}

fn parse_item_type(value: &str) -> Result<ItemType, ApiError> {
    Ok(value.parse::<ItemType>()?)
}

fn parse_target(item_type: &str, item_id: &str) -> Result<(ItemType, Uuid), ApiError> {
    let item_type = parse_item_type(item_type)?;
    let item_id = item_id
        .parse::<Uuid>()
        .map_err(|_| LedgerError::validation("item_id", "item_id must be a UUID"))?;
    Ok((item_type, item_id))
}

fn body_error(rejection: JsonRejection) -> ApiError {
    LedgerError::validation("body", rejection.body_text()).into()
}
