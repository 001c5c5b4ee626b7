use anyhow::{Context, Result};
use eyecare_core::{HistoryWindow, StockPolicy};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub http_addr: String,
    pub storage_backend: StorageBackend,
    pub stock_policy: StockPolicy,
    pub history_limit: i64,
    pub run_migrations: bool,
    pub db_max_connections: u32,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    /// Workers always run against Postgres and Redis.
    pub fn worker_from_env() -> Result<Self> {
        let config = Self::from_lookup("", |key| std::env::var(key).ok())?;
        if config.storage_backend != StorageBackend::Postgres {
            anyhow::bail!("workers require STORAGE_BACKEND=postgres");
        }
        config.redis_url.as_ref().context("REDIS_URL is required")?;
        Ok(config)
    }

    fn from_lookup(
        default_http_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let storage_backend = match lookup("STORAGE_BACKEND")
            .map(|value| value.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("") | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => anyhow::bail!("unsupported STORAGE_BACKEND {other}"),
        };

        let database_url = lookup("DATABASE_URL").filter(|value| !value.trim().is_empty());
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required");
        }

        let redis_url = lookup("REDIS_URL").filter(|value| !value.trim().is_empty());
        let http_addr = lookup("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string());

        let allow_negative_stock = parse_bool(&lookup, "ALLOW_NEGATIVE_STOCK", true)?;
        let run_migrations = parse_bool(&lookup, "RUN_MIGRATIONS", true)?;
        let history_limit = match lookup("HISTORY_LIMIT") {
            Some(value) => value
                .trim()
                .parse::<i64>()
                .context("HISTORY_LIMIT must be an integer")?
                .clamp(1, HistoryWindow::MAX_LIMIT),
            None => HistoryWindow::DEFAULT_LIMIT,
        };
        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?
                .max(1),
            None => 10,
        };

        Ok(Self {
            database_url,
            redis_url,
            http_addr,
            storage_backend,
            stock_policy: StockPolicy {
                allow_negative_stock,
            },
            history_limit,
            run_migrations,
            db_max_connections,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL is required")
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{key} must be a boolean, got {other}"),
    }
}
