//! Domain error taxonomy for the request lifecycle and batch ledger

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::RequestStatus;

/// Errors raised by the core domain rules.
///
/// Every variant is scoped to the single operation that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Quantity must be greater than zero, got {0}")]
    InvalidQuantity(Decimal),

    #[error("Batch {batch_id} already exists for item {item}")]
    DuplicateBatch { item: String, batch_id: String },

    #[error("Inventory item not found: {0}")]
    ItemNotFound(String),

    #[error("Batch {batch_id} not found for item {item}")]
    BatchNotFound { item: String, batch_id: String },

    #[error("Inventory request not found")]
    RequestNotFound,

    #[error(
        "Insufficient stock in batch {batch_id} of {item}. Requested: {requested}, Available: {available}"
    )]
    InsufficientStock {
        item: String,
        batch_id: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("No department head found for departments: {}", .departments.join(", "))]
    NoApproverFound { departments: Vec<String> },

    #[error("Cannot {attempted} a request that is {current}")]
    InvalidState {
        current: RequestStatus,
        attempted: &'static str,
    },

    #[error("Forbidden: {0}")]
    ForbiddenTransition(String),
}

impl DomainError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Shortfall between requested and available quantity, if this is a capacity error
    pub fn shortfall(&self) -> Option<Decimal> {
        match self {
            DomainError::InsufficientStock {
                requested,
                available,
                ..
            } => Some(*requested - *available),
            _ => None,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
