//! Stock reservation with compensating rollback.
//!
//! Every reservation is one atomic conditional decrement on a single product
//! row, so concurrent checkouts for the same product are serialized by the
//! store. There is no transaction spanning products and the order: a failed
//! checkout undoes its reservations with independent increments instead.

use std::sync::Arc;
use std::thread;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::domain::product::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedQuantity {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Reservations taken so far by one checkout attempt. Never persisted.
#[derive(Debug, Default)]
pub struct ReservationLedger {
    entries: Vec<ReservedQuantity>,
}

impl ReservationLedger {
    pub fn entries(&self) -> &[ReservedQuantity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Product state right after a successful decrement.
#[derive(Debug, Clone)]
pub struct ReservedLine {
    pub product: Product,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationOutcome {
    Restored {
        product_id: Uuid,
        quantity: i32,
        new_stock: i32,
    },
    Failed {
        product_id: Uuid,
        quantity: i32,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockRestoreReport {
    pub outcomes: Vec<CompensationOutcome>,
}

impl StockRestoreReport {
    pub fn successful(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CompensationOutcome::Restored { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.successful()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CompensationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CompensationOutcome::Failed { .. }))
    }
}

#[derive(Clone)]
pub struct StockReservation {
    catalog: Arc<dyn CatalogRepository>,
}

impl StockReservation {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Reserves `quantity` units and records them in `ledger`.
    pub fn reserve(
        &self,
        ledger: &mut ReservationLedger,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<ReservedLine, DomainError> {
        match self.catalog.conditional_decrement_stock(product_id, quantity)? {
            Some(product) => {
                ledger.entries.push(ReservedQuantity {
                    product_id,
                    quantity,
                });
                Ok(ReservedLine { product, quantity })
            }
            None => Err(self.refusal(product_id, quantity)),
        }
    }

    /// Works out why a conditional decrement matched nothing.
    fn refusal(&self, product_id: Uuid, quantity: i32) -> DomainError {
        match self.catalog.find_by_id(product_id) {
            Err(err) => err,
            Ok(None) => DomainError::NotFound(format!("Product not found: {product_id}")),
            Ok(Some(product)) if !product.is_active => DomainError::NotFound(format!(
                "Product {} is no longer available",
                product.name
            )),
            Ok(Some(product)) if product.stock < quantity => DomainError::InsufficientStock {
                product_id,
                product_name: product.name,
                available: product.stock,
                requested: quantity,
            },
            Ok(Some(product)) => DomainError::ReservationConflict(product.name),
        }
    }

    /// Releases everything in `ledger`. Failures are logged for manual
    /// reconciliation and returned, never raised.
    pub fn rollback(&self, ledger: ReservationLedger) -> StockRestoreReport {
        let report = self.restore(ledger.entries());
        for failure in report.failures() {
            if let CompensationOutcome::Failed {
                product_id,
                quantity,
                reason,
            } = failure
            {
                log::error!(
                    target: "stock_reconciliation",
                    "CRITICAL: stock rollback failed for product {} ({} units): {}. Manual reconciliation required.",
                    product_id,
                    quantity,
                    reason
                );
            }
        }
        report
    }

    /// Increments stock for every entry concurrently. Each increment is
    /// independent; one failing does not stop the others.
    pub fn restore(&self, entries: &[ReservedQuantity]) -> StockRestoreReport {
        let catalog = &self.catalog;
        let outcomes = thread::scope(|scope| {
            let pending: Vec<_> = entries
                .iter()
                .map(|&entry| {
                    let handle = scope
                        .spawn(move || catalog.increment_stock(entry.product_id, entry.quantity));
                    (entry, handle)
                })
                .collect();

            pending
                .into_iter()
                .map(|(entry, handle)| {
                    let ReservedQuantity {
                        product_id,
                        quantity,
                    } = entry;
                    match handle.join() {
                        Ok(Ok(Some(product))) => CompensationOutcome::Restored {
                            product_id,
                            quantity,
                            new_stock: product.stock,
                        },
                        Ok(Ok(None)) => CompensationOutcome::Failed {
                            product_id,
                            quantity,
                            reason: format!("Failed to update stock for product {product_id}"),
                        },
                        Ok(Err(err)) => CompensationOutcome::Failed {
                            product_id,
                            quantity,
                            reason: err.to_string(),
                        },
                        Err(_) => CompensationOutcome::Failed {
                            product_id,
                            quantity,
                            reason: "stock restore task panicked".to_string(),
                        },
                    }
                })
                .collect()
        });
        StockRestoreReport { outcomes }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};

    use super::*;
    use crate::application::testing::InMemoryCatalog;

    fn reservation(catalog: &InMemoryCatalog) -> StockReservation {
        StockReservation::new(Arc::new(catalog.clone()))
    }

    #[test]
    fn reserve_decrements_and_records_entry() {
        let catalog = InMemoryCatalog::default();
        let id = catalog.add("lamp", "40", "0", 5);
        let mut ledger = ReservationLedger::default();

        let line = reservation(&catalog)
            .reserve(&mut ledger, id, 3)
            .expect("reserve failed");

        assert_eq!(line.product.stock, 2);
        assert_eq!(catalog.stock(id), 2);
        assert_eq!(
            ledger.entries(),
            &[ReservedQuantity {
                product_id: id,
                quantity: 3
            }]
        );
    }

    #[test]
    fn insufficient_stock_reports_available_quantity() {
        let catalog = InMemoryCatalog::default();
        let id = catalog.add("lamp", "40", "0", 2);
        let mut ledger = ReservationLedger::default();

        let err = reservation(&catalog)
            .reserve(&mut ledger, id, 3)
            .expect_err("should refuse");

        match err {
            DomainError::InsufficientStock {
                available,
                requested,
                product_name,
                ..
            } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
                assert_eq!(product_name, "lamp");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ledger.is_empty());
        assert_eq!(catalog.stock(id), 2);
    }

    #[test]
    fn missing_and_inactive_products_are_not_found() {
        let catalog = InMemoryCatalog::default();
        let inactive = catalog.add("retired", "10", "0", 50);
        catalog.deactivate(inactive);
        let mut ledger = ReservationLedger::default();
        let reservation = reservation(&catalog);

        assert!(matches!(
            reservation.reserve(&mut ledger, Uuid::new_v4(), 1),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            reservation.reserve(&mut ledger, inactive, 1),
            Err(DomainError::NotFound(_))
        ));
        assert_eq!(catalog.stock(inactive), 50);
    }

    #[test]
    fn rollback_restores_every_reserved_product() {
        let catalog = InMemoryCatalog::default();
        let a = catalog.add("a", "1", "0", 10);
        let b = catalog.add("b", "1", "0", 4);
        let reservation = reservation(&catalog);
        let mut ledger = ReservationLedger::default();
        reservation.reserve(&mut ledger, a, 7).unwrap();
        reservation.reserve(&mut ledger, b, 4).unwrap();

        let report = reservation.rollback(ledger);

        assert_eq!(report.successful(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(catalog.stock(a), 10);
        assert_eq!(catalog.stock(b), 4);
    }

    #[test]
    fn one_failed_compensation_does_not_block_the_others() {
        let catalog = InMemoryCatalog::default();
        let a = catalog.add("a", "1", "0", 10);
        let b = catalog.add("b", "1", "0", 10);
        let c = catalog.add("c", "1", "0", 10);
        let reservation = reservation(&catalog);
        let mut ledger = ReservationLedger::default();
        for id in [a, b, c] {
            reservation.reserve(&mut ledger, id, 2).unwrap();
        }
        catalog.fail_increments_for(b);

        let report = reservation.rollback(ledger);

        assert_eq!(report.successful(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(catalog.stock(a), 10);
        assert_eq!(catalog.stock(b), 8);
        assert_eq!(catalog.stock(c), 10);
        assert!(matches!(
            report.failures().next(),
            Some(CompensationOutcome::Failed { product_id, quantity: 2, .. }) if *product_id == b
        ));
    }

    #[test]
    fn restore_reports_vanished_products_as_failed() {
        let catalog = InMemoryCatalog::default();
        let id = catalog.add("gone", "1", "0", 3);
        catalog.remove(id);

        let report = reservation(&catalog).restore(&[ReservedQuantity {
            product_id: id,
            quantity: 1,
        }]);

        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn concurrent_reservations_never_oversell() {
        let catalog = InMemoryCatalog::default();
        let id = catalog.add("limited", "25", "0", 7);
        let reservation = reservation(&catalog);
        let reserved = AtomicI32::new(0);

        thread::scope(|scope| {
            for _ in 0..32 {
                scope.spawn(|| {
                    let mut ledger = ReservationLedger::default();
                    if reservation.reserve(&mut ledger, id, 1).is_ok() {
                        reserved.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(reserved.load(Ordering::SeqCst), 7);
        assert_eq!(catalog.stock(id), 0);
    }
}
