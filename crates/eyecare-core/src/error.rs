use thiserror::Error;
use uuid::Uuid;

use crate::models::ItemType;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{item_type} item {item_id} not found")]
    ItemNotFound { item_type: ItemType, item_id: Uuid },

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("insufficient stock: {available} on hand, movement needs {requested}")]
    InsufficientStock { available: i64, requested: u64 },

    #[error("stock quantity out of range")]
    StockOverflow,

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(item_type: ItemType, item_id: Uuid) -> Self {
        Self::ItemNotFound { item_type, item_id }
    }

    /// Field the error relates to, when it came from request validation.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::InvalidQuantity(_) => Some("quantity"),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
