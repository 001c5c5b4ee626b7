use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eyecare_core::LedgerError;
use eyecare_platform::ErrorResponse;
use tracing::error;

pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            LedgerError::ItemNotFound { .. } => (StatusCode::NOT_FOUND, "item_not_found"),
            LedgerError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, "invalid_quantity"),
            LedgerError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_failed"),
            LedgerError::InsufficientStock { .. } => (StatusCode::CONFLICT, "insufficient_stock"),
            LedgerError::StockOverflow => (StatusCode::UNPROCESSABLE_ENTITY, "stock_out_of_range"),
            LedgerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_failure"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            error!("request failed: {:#}", self.0);
            "storage failure; no changes were applied".to_string()
        };

        let body = ErrorResponse {
            error: kind.to_string(),
            message,
            field: self.0.field().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}
