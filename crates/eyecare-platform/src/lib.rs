pub mod config;
pub mod contracts;
pub mod db;
pub mod pg_store;
pub mod redis_bus;

pub use config::{ServiceConfig, StorageBackend};
pub use contracts::{
    ErrorResponse, LowStockResponse, StockAdjustmentRequest, StockAdjustmentResponse,
    StockHistoryQuery, StockHistoryResponse,
};
pub use db::{connect_database, run_migrations};
pub use pg_store::PgStockStore;
pub use redis_bus::RedisBus;
