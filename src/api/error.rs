//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::domain::aggregates::CartError;
use crate::storage::StoreError;
use crate::StorefrontError;

/// Error response with a JSON body `{ "error": code, "message": text }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }
}

impl From<StorefrontError> for ApiError {
    fn from(err: StorefrontError) -> Self {
        let (status, code) = match &err {
            StorefrontError::NotFound(_) | StorefrontError::Cart(CartError::ItemNotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            StorefrontError::Cart(_) => (StatusCode::UNPROCESSABLE_ENTITY, "cart_rule"),
            StorefrontError::Receipt(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_receipt"),
            StorefrontError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            StorefrontError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            StorefrontError::Payment(_) => (StatusCode::BAD_GATEWAY, "payment_failed"),
            StorefrontError::PaymentNotCompleted(_) => (StatusCode::PAYMENT_REQUIRED, "payment_not_completed"),
            StorefrontError::PaymentsUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "payments_unavailable"),
            StorefrontError::Storage(e) => {
                error!(error = %e, "storage failure");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal server error");
            }
        };
        Self::new(status, code, err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self { StorefrontError::from(errors).into() }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self { StorefrontError::from(err).into() }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.code, "message": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
