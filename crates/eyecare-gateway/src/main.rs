mod error;
mod routes;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use eyecare_core::StockStore;
use eyecare_platform::{
    PgStockStore, RedisBus, ServiceConfig, StorageBackend, connect_database, run_migrations,
};
use eyecare_store::InMemoryStockStore;
use tracing::{info, warn};

use crate::routes::{AppState, router};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "eyecare_gateway=info,eyecare_inventory=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let store = open_store(&config).await?;
    let events = match config.redis_url.as_deref() {
        Some(redis_url) => Some(RedisBus::connect(redis_url)?),
        None => {
            warn!("REDIS_URL not set; stock movement events will not be published");
            None
        }
    };

    let state = AppState::new(store, config.stock_policy, config.history_limit, events);
    let app = router(state);

    let addr: SocketAddr = config
        .http_addr
        .parse()
        .with_context(|| format!("invalid HTTP_ADDR {}", config.http_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        allow_negative_stock = config.stock_policy.allow_negative_stock,
        "eyecare-gateway listening on {addr}"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn StockStore>> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let pool =
                connect_database(config.require_database_url()?, config.db_max_connections).await?;
            if config.run_migrations {
                run_migrations(&pool).await?;
            }
            Ok(Arc::new(PgStockStore::new(pool)))
        }
        StorageBackend::Memory => {
            warn!("using in-memory stock store; data is lost on restart");
            Ok(Arc::new(InMemoryStockStore::new()))
        }
    }
}
