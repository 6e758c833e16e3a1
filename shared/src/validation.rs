//! Input validation shared by every inventory operation.
//!
//! Validation runs before any state is touched.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Require a non-blank string no longer than `max_len` characters; returns it trimmed
pub fn validate_text(field: &str, value: &str, max_len: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(DomainError::validation(
            field,
            format!("{} must be at most {} characters", field, max_len),
        ));
    }
    Ok(trimmed.to_string())
}

/// Decimal places stored for quantities (`NUMERIC(14, 3)`)
pub const QUANTITY_SCALE: u32 = 3;

/// Largest quantity the ledger columns can hold
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 3);

/// Quantities moved through the ledger must be strictly positive and fit the
/// stored precision exactly; nothing is rounded on the way to the database.
pub fn validate_positive_quantity(quantity: Decimal) -> DomainResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(DomainError::InvalidQuantity(quantity));
    }
    if quantity.normalize().scale() > QUANTITY_SCALE {
        return Err(DomainError::validation(
            "quantity",
            format!("Quantity allows at most {} decimal places", QUANTITY_SCALE),
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(DomainError::validation(
            "quantity",
            format!("Quantity cannot exceed {}", MAX_QUANTITY),
        ));
    }
    Ok(())
}

/// Rates may be zero (donated or sample stock) but never negative; stored to the cent
pub fn validate_rate(rate: Decimal) -> DomainResult<()> {
    if rate < Decimal::ZERO {
        return Err(DomainError::validation("rate", "Rate cannot be negative"));
    }
    if rate.normalize().scale() > 2 {
        return Err(DomainError::validation("rate", "Rate allows at most 2 decimal places"));
    }
    Ok(())
}

/// Unit of measure, e.g. "pcs", "box"
pub fn validate_unit(unit: &str) -> DomainResult<String> {
    validate_text("unit", unit, 32)
}

/// Resolve the unit recorded on a new request: the stocked item's unit wins,
/// then the requester's, then "N/A"
pub fn resolve_request_unit(stocked_unit: Option<&str>, requested_unit: Option<&str>) -> String {
    stocked_unit
        .or(requested_unit)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or("N/A")
        .to_string()
}
