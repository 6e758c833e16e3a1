//! Error handling for the Plant Inventory server
//!
//! Every failure maps to a stable error code and a message the caller can act on

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Lifecycle and ledger errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            details: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

fn domain_error_detail(err: &DomainError) -> (StatusCode, ErrorDetail) {
    let message = err.to_string();
    match err {
        DomainError::Validation { field, message } => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field),
        ),
        DomainError::InvalidQuantity(_) => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new("INVALID_QUANTITY", message).with_field("quantity"),
        ),
        DomainError::DuplicateBatch { .. } => (
            StatusCode::CONFLICT,
            ErrorDetail::new("DUPLICATE_BATCH", message).with_field("batch_id"),
        ),
        DomainError::ItemNotFound(_)
        | DomainError::BatchNotFound { .. }
        | DomainError::RequestNotFound => {
            (StatusCode::NOT_FOUND, ErrorDetail::new("NOT_FOUND", message))
        }
        DomainError::InsufficientStock {
            batch_id,
            requested,
            available,
            ..
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("INSUFFICIENT_STOCK", message).with_details(serde_json::json!({
                "batch_id": batch_id,
                "requested": requested,
                "available": available,
                "shortfall": *requested - *available,
            })),
        ),
        DomainError::NoApproverFound { departments } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("NO_APPROVER_FOUND", message)
                .with_details(serde_json::json!({ "departments": departments })),
        ),
        DomainError::InvalidState { current, .. } => (
            StatusCode::CONFLICT,
            ErrorDetail::new("INVALID_STATE", message)
                .with_details(serde_json::json!({ "current_status": current })),
        ),
        DomainError::ForbiddenTransition(_) => (
            StatusCode::FORBIDDEN,
            ErrorDetail::new("FORBIDDEN_TRANSITION", message),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", msg.clone()),
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new("FORBIDDEN", msg.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Domain(err) => domain_error_detail(err),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!(code = %error_detail.code, "Rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), "Invalid input".to_string()));

        AppError::Validation { field, message }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
