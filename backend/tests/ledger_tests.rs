//! Batch ledger tests
//!
//! Tests for per-batch stock tracking including:
//! - Receipts and duplicate batch detection
//! - Issuance bounded by the batch balance
//! - Balances are re-derived, never drift

mod common;

use common::{staffed_plant, t0};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    normalize_item_name, stock_warning, Batch, DomainError, InventoryItem,
};
use uuid::Uuid;

fn batch(batch_id: &str, quantity: Decimal) -> Batch {
    Batch::receive(batch_id, quantity, dec!(12.50), Uuid::new_v4(), t0()).unwrap()
}

fn gloves() -> InventoryItem {
    InventoryItem {
        id: Uuid::new_v4(),
        item_name: "Gloves".to_string(),
        unit: "pcs".to_string(),
        batches: Vec::new(),
        created_at: t0(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A new batch starts with nothing issued
    #[test]
    fn test_receive_starts_unissued() {
        let b = batch(" B1 ", dec!(100));
        assert_eq!(b.batch_id, "B1");
        assert_eq!(b.issued, dec!(0));
        assert_eq!(b.balance(), dec!(100));
    }

    /// Non-positive receipts are rejected
    #[test]
    fn test_receive_rejects_bad_quantities() {
        let by = Uuid::new_v4();
        assert_eq!(
            Batch::receive("B1", dec!(0), dec!(1), by, t0()).unwrap_err(),
            DomainError::InvalidQuantity(dec!(0))
        );
        assert_eq!(
            Batch::receive("B1", dec!(-3), dec!(1), by, t0()).unwrap_err(),
            DomainError::InvalidQuantity(dec!(-3))
        );
        assert!(matches!(
            Batch::receive("B1", dec!(3), dec!(-1), by, t0()),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            Batch::receive("  ", dec!(3), dec!(1), by, t0()),
            Err(DomainError::Validation { .. })
        ));
    }

    /// Batch ids are unique per item, not globally
    #[test]
    fn test_duplicate_batch_scoped_to_item() {
        let (mut plant, cast) = staffed_plant();
        plant
            .receive(&cast.issuer, "Gloves", "pcs", "B1", dec!(10))
            .unwrap();

        let err = plant
            .receive(&cast.issuer, "  gloves ", "pcs", "B1", dec!(5))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::DuplicateBatch {
                item: "Gloves".to_string(),
                batch_id: "B1".to_string(),
            }
        );

        // Same batch id under a different item is fine
        plant
            .receive(&cast.issuer, "Face Masks", "box", "B1", dec!(5))
            .unwrap();
        assert_eq!(plant.item("Gloves").unwrap().batches.len(), 1);
        assert_eq!(plant.items.len(), 2);
    }

    /// Balance over 90 issued of 100 refuses 20
    #[test]
    fn test_insufficient_stock_reports_numbers() {
        let mut b = batch("B1", dec!(100));
        b.try_issue("Gloves", dec!(90)).unwrap();

        let err = b.try_issue("Gloves", dec!(20)).unwrap_err();

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
        let message = err.to_string();
        assert!(message.contains("Requested: 20"));
        assert!(message.contains("Available: 10"));
        assert_eq!(b.issued, dec!(90));
    }

    /// Issuing the exact remaining balance empties the batch
    #[test]
    fn test_issue_exact_balance() {
        let mut b = batch("B1", dec!(10));
        assert_eq!(b.try_issue("Gloves", dec!(10)).unwrap(), dec!(0));
        assert!(matches!(
            b.try_issue("Gloves", dec!(0.001)),
            Err(DomainError::InsufficientStock { .. })
        ));
    }

    /// Zero or negative issue amounts are invalid
    #[test]
    fn test_issue_rejects_non_positive() {
        let mut b = batch("B1", dec!(10));
        assert_eq!(
            b.try_issue("Gloves", dec!(0)).unwrap_err(),
            DomainError::InvalidQuantity(dec!(0))
        );
        assert_eq!(
            b.try_issue("Gloves", dec!(-1)).unwrap_err(),
            DomainError::InvalidQuantity(dec!(-1))
        );
        assert_eq!(b.issued, dec!(0));
    }

    /// 100 received, 30 and 20 issued in either order leaves 50
    #[test]
    fn test_issue_order_does_not_matter() {
        for order in [[dec!(30), dec!(20)], [dec!(20), dec!(30)]] {
            let mut item = gloves();
            item.add_batch(batch("B1", dec!(100))).unwrap();
            for amount in order {
                item.issue("B1", amount).unwrap();
            }
            assert_eq!(item.balance().total_available, dec!(50));
        }
    }

    /// Unknown batch on a known item
    #[test]
    fn test_issue_from_missing_batch() {
        let mut item = gloves();
        item.add_batch(batch("B1", dec!(5))).unwrap();
        assert!(matches!(
            item.issue("B2", dec!(1)),
            Err(DomainError::BatchNotFound { .. })
        ));
    }

    /// Item totals are re-summed across batches
    #[test]
    fn test_item_balance_sums_batches() {
        let mut item = gloves();
        item.add_batch(batch("B1", dec!(40))).unwrap();
        item.add_batch(batch("B2", dec!(60))).unwrap();
        item.issue("B2", dec!(15)).unwrap();

        let balance = item.balance();
        assert_eq!(balance.total_available, dec!(85));
        assert_eq!(balance.batches.len(), 2);
        assert_eq!(balance.batches[1].issued, dec!(15));
        assert_eq!(balance.batches[1].balance, dec!(45));
    }

    /// Name matching ignores case and whitespace
    #[test]
    fn test_item_name_normalization() {
        assert_eq!(normalize_item_name("  Nitrile  Gloves "), "nitrilegloves");
        assert_eq!(normalize_item_name("Nitrile Gloves"), normalize_item_name("NITRILEGLOVES"));
        assert_eq!(normalize_item_name("Face\tMask"), normalize_item_name("face mask"));
        assert_ne!(normalize_item_name("Face Mask"), normalize_item_name("Face Masks"));
    }

    /// Advisory text for short stock
    #[test]
    fn test_stock_warning_text() {
        assert_eq!(
            stock_warning(dec!(10), dec!(50), "pcs").as_deref(),
            Some("Only 10 pcs in stock, but 50 requested.")
        );
        assert_eq!(
            stock_warning(dec!(2.500), dec!(3), "kg").as_deref(),
            Some("Only 2.5 kg in stock, but 3 requested.")
        );
        assert_eq!(stock_warning(dec!(50), dec!(50), "pcs"), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Whole-unit quantities
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..200).prop_map(Decimal::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// 0 <= issued <= quantity after every attempt, successful or not
        #[test]
        fn prop_issued_stays_within_bounds(
            received in quantity_strategy(),
            attempts in prop::collection::vec(quantity_strategy(), 0..20)
        ) {
            let mut b = batch("B1", received);
            let mut expected_issued = Decimal::ZERO;

            for amount in attempts {
                let before = b.issued;
                match b.try_issue("Gloves", amount) {
                    Ok(balance) => {
                        expected_issued += amount;
                        prop_assert_eq!(balance, received - expected_issued);
                    }
                    Err(DomainError::InsufficientStock { available, requested, .. }) => {
                        prop_assert_eq!(b.issued, before);
                        prop_assert_eq!(available, received - before);
                        prop_assert!(requested > available);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
                prop_assert!(b.issued >= Decimal::ZERO);
                prop_assert!(b.issued <= b.quantity);
            }
            prop_assert_eq!(b.issued, expected_issued);
        }

        /// The final balance does not depend on issue order when all fit
        #[test]
        fn prop_issue_order_commutes(
            mut amounts in prop::collection::vec(1i64..20, 1..6),
            extra in 0i64..50
        ) {
            let total: i64 = amounts.iter().sum();
            let received = Decimal::from(total + extra);

            let mut forward = batch("B1", received);
            for a in &amounts {
                forward.try_issue("Gloves", Decimal::from(*a)).unwrap();
            }
            amounts.reverse();
            let mut backward = batch("B1", received);
            for a in &amounts {
                backward.try_issue("Gloves", Decimal::from(*a)).unwrap();
            }

            prop_assert_eq!(forward.balance(), Decimal::from(extra));
            prop_assert_eq!(forward.balance(), backward.balance());
        }
    }
}

// ============================================================================
// Ledger and Request Integration
// ============================================================================

#[cfg(test)]
mod integration_tests {
    use super::*;
    use shared::{RequestStatus, Transition};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Quantities issued to requests from one batch never exceed what it received
        #[test]
        fn prop_issued_to_requests_within_receipt(
            received in 10i64..100,
            asks in prop::collection::vec(1i64..40, 1..8)
        ) {
            let (mut plant, cast) = staffed_plant();
            plant.receive(&cast.issuer, "Gloves", "pcs", "B1", Decimal::from(received)).unwrap();

            let mut ids = Vec::new();
            for ask in &asks {
                let (id, _) = plant.create(&cast.director, "Gloves", Decimal::from(*ask), t0()).unwrap();
                ids.push((id, Decimal::from(*ask)));
            }
            for (id, ask) in &ids {
                let _ = plant.transition(
                    &cast.issuer,
                    *id,
                    Transition::Issue { batch_id: "B1".to_string(), quantity: *ask },
                    t0(),
                );
            }

            let issued_to_requests: Decimal = plant
                .requests
                .values()
                .filter(|r| r.status == RequestStatus::Issued)
                .filter_map(|r| r.quantity_issued)
                .sum();
            let batch = &plant.item("Gloves").unwrap().batches[0];

            prop_assert!(issued_to_requests <= Decimal::from(received));
            prop_assert_eq!(issued_to_requests, batch.issued);
            prop_assert!(plant.alerts_consistent());
        }
    }
}
