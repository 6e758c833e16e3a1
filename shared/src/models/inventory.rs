//! Batch-tracked inventory models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::validation::{validate_positive_quantity, validate_rate};

/// Canonical matching key for free-text item names.
///
/// Case and whitespace are ignored, so "Nitrile  Gloves" and "nitrilegloves"
/// refer to the same item. Request creation, issuance and usage lookups all
/// go through this one function.
pub fn normalize_item_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A stocked consumable, identified by its unique name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub item_name: String,
    /// Unit of measure, e.g. pcs, box, bottle
    pub unit: String,
    pub batches: Vec<Batch>,
    pub created_at: DateTime<Utc>,
}

/// A received lot of an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    /// Unique within the owning item only
    pub batch_id: String,
    pub quantity: Decimal,
    pub issued: Decimal,
    pub rate: Decimal,
    pub added_by: Uuid,
    pub added_at: DateTime<Utc>,
}

impl Batch {
    /// Create a freshly received batch with nothing issued
    pub fn receive(
        batch_id: impl Into<String>,
        quantity: Decimal,
        rate: Decimal,
        added_by: Uuid,
        added_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let batch_id = batch_id.into();
        if batch_id.trim().is_empty() {
            return Err(DomainError::validation("batch_id", "Batch ID is required"));
        }
        validate_positive_quantity(quantity)?;
        validate_rate(rate)?;

        Ok(Self {
            batch_id: batch_id.trim().to_string(),
            quantity,
            issued: Decimal::ZERO,
            rate,
            added_by,
            added_at,
        })
    }

    /// Available balance, always derived
    pub fn balance(&self) -> Decimal {
        self.quantity - self.issued
    }

    /// Issue `quantity` units from this batch and return the new balance.
    ///
    /// The check and the increment happen in one call so `0 <= issued <=
    /// quantity` holds after every invocation. On failure nothing changes.
    pub fn try_issue(&mut self, item: &str, quantity: Decimal) -> DomainResult<Decimal> {
        validate_positive_quantity(quantity)?;
        let available = self.balance();
        if quantity > available {
            return Err(DomainError::InsufficientStock {
                item: item.to_string(),
                batch_id: self.batch_id.clone(),
                requested: quantity,
                available,
            });
        }
        self.issued += quantity;
        Ok(self.balance())
    }
}

impl InventoryItem {
    /// Append a received batch, rejecting duplicate batch ids within this item
    pub fn add_batch(&mut self, batch: Batch) -> DomainResult<&Batch> {
        if self.batch(&batch.batch_id).is_some() {
            return Err(DomainError::DuplicateBatch {
                item: self.item_name.clone(),
                batch_id: batch.batch_id,
            });
        }
        self.batches.push(batch);
        Ok(&self.batches[self.batches.len() - 1])
    }

    pub fn batch(&self, batch_id: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.batch_id == batch_id.trim())
    }

    /// Issue from one batch of this item
    pub fn issue(&mut self, batch_id: &str, quantity: Decimal) -> DomainResult<Decimal> {
        let item_name = self.item_name.clone();
        let batch = self
            .batches
            .iter_mut()
            .find(|b| b.batch_id == batch_id.trim())
            .ok_or_else(|| DomainError::BatchNotFound {
                item: item_name.clone(),
                batch_id: batch_id.to_string(),
            })?;
        batch.try_issue(&item_name, quantity)
    }

    /// Per-batch and total balances, re-summed on every call
    pub fn balance(&self) -> ItemBalance {
        let batches: Vec<BatchBalance> = self.batches.iter().map(BatchBalance::from).collect();
        ItemBalance {
            item_name: self.item_name.clone(),
            unit: self.unit.clone(),
            total_available: batches.iter().map(|b| b.balance).sum(),
            batches,
        }
    }
}

/// Balance view of a single batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchBalance {
    pub batch_id: String,
    pub quantity: Decimal,
    pub issued: Decimal,
    pub balance: Decimal,
    pub rate: Decimal,
}

impl From<&Batch> for BatchBalance {
    fn from(batch: &Batch) -> Self {
        Self {
            batch_id: batch.batch_id.clone(),
            quantity: batch.quantity,
            issued: batch.issued,
            balance: batch.balance(),
            rate: batch.rate,
        }
    }
}

/// Balance view of an item across all its batches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemBalance {
    pub item_name: String,
    pub unit: String,
    pub total_available: Decimal,
    pub batches: Vec<BatchBalance>,
}

/// Advisory attached to a new request when stock cannot cover it
pub fn stock_warning(
    total_available: Decimal,
    requested: Decimal,
    unit: &str,
) -> Option<String> {
    if total_available < requested {
        Some(format!(
            "Only {} {} in stock, but {} requested.",
            total_available.normalize(),
            unit,
            requested.normalize()
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item_with(quantity: Decimal, issued: Decimal) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            item_name: "Gloves".to_string(),
            unit: "pcs".to_string(),
            batches: vec![Batch {
                batch_id: "B1".to_string(),
                quantity,
                issued,
                rate: dec!(2.5),
                added_by: Uuid::new_v4(),
                added_at: Utc::now(),
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn normalization_ignores_case_and_whitespace() {
        assert_eq!(normalize_item_name("  Nitrile Gloves "), "nitrilegloves");
        assert_eq!(
            normalize_item_name("Nitrile  Gloves"),
            normalize_item_name("NITRILE\tgloves")
        );
        assert_ne!(normalize_item_name("Gloves"), normalize_item_name("Glove"));
    }

    #[test]
    fn overdraw_leaves_batch_untouched() {
        let mut item = item_with(dec!(100), dec!(90));
        let err = item.issue("B1", dec!(20)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                item: "Gloves".to_string(),
                batch_id: "B1".to_string(),
                requested: dec!(20),
                available: dec!(10),
            }
        );
        assert_eq!(err.shortfall(), Some(dec!(10)));
        assert_eq!(item.batches[0].issued, dec!(90));
    }

    #[test]
    fn duplicate_batch_rejected_within_item() {
        let mut item = item_with(dec!(10), dec!(0));
        let dup = Batch::receive("B1", dec!(5), dec!(1), Uuid::new_v4(), Utc::now()).unwrap();
        assert!(matches!(
            item.add_batch(dup),
            Err(DomainError::DuplicateBatch { .. })
        ));
    }

    #[test]
    fn stock_warning_only_when_short() {
        assert_eq!(stock_warning(dec!(50), dec!(50), "pcs"), None);
        assert_eq!(
            stock_warning(dec!(10), dec!(50), "pcs").as_deref(),
            Some("Only 10 pcs in stock, but 50 requested.")
        );
    }
}
