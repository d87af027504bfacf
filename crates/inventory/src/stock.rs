use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomerp_core::{DomainError, DomainResult, Entity, LocationId, VariantId};

/// Key of one stock line: a variant held at a location.
///
/// Ordered (variant, then location) so operations touching several keys can
/// acquire their locks in a stable global order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub variant: VariantId,
    pub location: LocationId,
}

impl StockKey {
    pub fn new(variant: VariantId, location: LocationId) -> Self {
        Self { variant, location }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.variant, self.location)
    }
}

/// The signed effect one ledger operation had on a record.
///
/// Carried into the matching `StockTransaction` so the audit log replays to
/// the exact record state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub quantity_delta: i64,
    pub reserved_delta: i64,
}

/// Current stock counters for one (variant, location) pair.
///
/// Created lazily on the first stock-affecting event at that pair, never
/// deleted. `reserved` and `available` never go negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    key: StockKey,
    quantity: i64,
    reserved: i64,
    last_updated: DateTime<Utc>,
}

impl StockRecord {
    /// Fresh empty record (quantity = 0, nothing reserved).
    pub fn empty(key: StockKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            quantity: 0,
            reserved: 0,
            last_updated: now,
        }
    }

    pub fn key(&self) -> StockKey {
        self.key
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    /// Quantity available for new orders.
    pub fn available(&self) -> i64 {
        (self.quantity - self.reserved).max(0)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn ensure_positive(qty: i64) -> DomainResult<()> {
        if qty <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    fn insufficient(&self, requested: i64, available: i64) -> DomainError {
        DomainError::InsufficientStock {
            variant: self.key.variant,
            location: self.key.location,
            requested,
            available,
        }
    }

    /// Soft-hold `qty` against available stock for a pending order.
    pub fn reserve(&mut self, qty: i64, now: DateTime<Utc>) -> DomainResult<StockMovement> {
        Self::ensure_positive(qty)?;
        if self.available() < qty {
            return Err(self.insufficient(qty, self.available()));
        }
        self.reserved += qty;
        self.last_updated = now;
        Ok(StockMovement {
            quantity_delta: 0,
            reserved_delta: qty,
        })
    }

    /// Release a reservation. Clamped at zero: a double-release must not
    /// drive `reserved` negative.
    pub fn release(&mut self, qty: i64, now: DateTime<Utc>) -> DomainResult<StockMovement> {
        Self::ensure_positive(qty)?;
        let released = qty.min(self.reserved);
        self.reserved -= released;
        self.last_updated = now;
        Ok(StockMovement {
            quantity_delta: 0,
            reserved_delta: -released,
        })
    }

    /// Convert a reservation into an actual sale: both counters drop by `qty`.
    pub fn confirm_sale(&mut self, qty: i64, now: DateTime<Utc>) -> DomainResult<StockMovement> {
        Self::ensure_positive(qty)?;
        if self.quantity < qty {
            return Err(self.insufficient(qty, self.quantity));
        }
        if self.reserved < qty {
            return Err(self.insufficient(qty, self.reserved));
        }
        self.quantity -= qty;
        self.reserved -= qty;
        self.last_updated = now;
        Ok(StockMovement {
            quantity_delta: -qty,
            reserved_delta: -qty,
        })
    }

    /// Goods receipt: on-hand quantity only, no reservation interplay.
    pub fn receive(&mut self, qty: i64, now: DateTime<Utc>) -> DomainResult<StockMovement> {
        Self::ensure_positive(qty)?;
        self.quantity += qty;
        self.last_updated = now;
        Ok(StockMovement {
            quantity_delta: qty,
            reserved_delta: 0,
        })
    }

    /// Reverse an earlier `confirm_sale` (cancellation of a confirmed order):
    /// quantity comes back, any remaining reservation for the line is
    /// released (clamped, since confirm already released it).
    pub fn restock(&mut self, qty: i64, now: DateTime<Utc>) -> DomainResult<StockMovement> {
        Self::ensure_positive(qty)?;
        let released = qty.min(self.reserved);
        self.quantity += qty;
        self.reserved -= released;
        self.last_updated = now;
        Ok(StockMovement {
            quantity_delta: qty,
            reserved_delta: -released,
        })
    }

    /// Manual correction: arbitrary signed delta on `quantity`.
    ///
    /// Checked against current `quantity`, not `available` — adjustments are
    /// not reservation-aware.
    pub fn adjust(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<StockMovement> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_quantity = self.quantity + delta;
        if new_quantity < 0 {
            return Err(self.insufficient(-delta, self.quantity));
        }
        self.quantity = new_quantity;
        self.last_updated = now;
        Ok(StockMovement {
            quantity_delta: delta,
            reserved_delta: 0,
        })
    }
}

impl Entity for StockRecord {
    type Id = StockKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_key() -> StockKey {
        StockKey::new(VariantId::new(), LocationId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn stocked(qty: i64) -> StockRecord {
        let mut rec = StockRecord::empty(test_key(), test_time());
        rec.receive(qty, test_time()).unwrap();
        rec
    }

    #[test]
    fn reserve_succeeds_when_available_covers_quantity() {
        let mut rec = stocked(100);
        let mv = rec.reserve(30, test_time()).unwrap();
        assert_eq!(mv.reserved_delta, 30);
        assert_eq!(mv.quantity_delta, 0);
        assert_eq!(rec.reserved(), 30);
        assert_eq!(rec.available(), 70);
    }

    #[test]
    fn reserve_fails_on_empty_record() {
        // Lazily created records start at zero: you cannot reserve stock
        // that was never stocked.
        let mut rec = StockRecord::empty(test_key(), test_time());
        let err = rec.reserve(1, test_time()).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 1);
                assert_eq!(available, 0);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(rec.quantity(), 0);
        assert_eq!(rec.reserved(), 0);
    }

    #[test]
    fn reserve_fails_when_reservations_exhaust_availability() {
        let mut rec = stocked(10);
        rec.reserve(8, test_time()).unwrap();
        assert!(rec.reserve(3, test_time()).is_err());
        assert_eq!(rec.reserved(), 8);
    }

    #[test]
    fn release_is_clamped_at_zero() {
        let mut rec = stocked(10);
        rec.reserve(4, test_time()).unwrap();
        let mv = rec.release(9, test_time()).unwrap();
        assert_eq!(mv.reserved_delta, -4);
        assert_eq!(rec.reserved(), 0);
    }

    #[test]
    fn confirm_sale_decrements_both_counters() {
        let mut rec = stocked(100);
        rec.reserve(30, test_time()).unwrap();
        let mv = rec.confirm_sale(30, test_time()).unwrap();
        assert_eq!(mv.quantity_delta, -30);
        assert_eq!(mv.reserved_delta, -30);
        assert_eq!(rec.quantity(), 70);
        assert_eq!(rec.reserved(), 0);
        assert_eq!(rec.available(), 70);
    }

    #[test]
    fn confirm_sale_requires_a_matching_reservation() {
        let mut rec = stocked(100);
        assert!(rec.confirm_sale(30, test_time()).is_err());
    }

    #[test]
    fn restock_returns_quantity_without_resurrecting_reservation() {
        let mut rec = stocked(100);
        rec.reserve(30, test_time()).unwrap();
        rec.confirm_sale(30, test_time()).unwrap();
        // Cancel after confirm: reservation is already gone, only quantity
        // comes back.
        let mv = rec.restock(30, test_time()).unwrap();
        assert_eq!(mv.quantity_delta, 30);
        assert_eq!(mv.reserved_delta, 0);
        assert_eq!(rec.quantity(), 100);
        assert_eq!(rec.reserved(), 0);
    }

    #[test]
    fn adjust_rejects_driving_quantity_negative() {
        let mut rec = stocked(5);
        let err = rec.adjust(-6, test_time()).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(rec.quantity(), 5);
    }

    #[test]
    fn adjust_ignores_reservations() {
        let mut rec = stocked(10);
        rec.reserve(8, test_time()).unwrap();
        // available is 2, but adjust checks quantity, so -5 is fine.
        rec.adjust(-5, test_time()).unwrap();
        assert_eq!(rec.quantity(), 5);
        assert_eq!(rec.reserved(), 8);
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        let mut rec = stocked(10);
        assert!(rec.reserve(0, test_time()).is_err());
        assert!(rec.release(-1, test_time()).is_err());
        assert!(rec.confirm_sale(0, test_time()).is_err());
        assert!(rec.receive(-3, test_time()).is_err());
        assert!(rec.adjust(0, test_time()).is_err());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Receive(i64),
        Reserve(i64),
        Release(i64),
        ConfirmSale(i64),
        Restock(i64),
        Adjust(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..50).prop_map(Op::Receive),
            (1i64..50).prop_map(Op::Reserve),
            (1i64..50).prop_map(Op::Release),
            (1i64..50).prop_map(Op::ConfirmSale),
            (1i64..50).prop_map(Op::Restock),
            (-50i64..50).prop_map(Op::Adjust),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of ledger operations on one key, the
        /// settled record keeps `reserved >= 0` and `available >= 0`, and a
        /// failed operation changes nothing.
        #[test]
        fn counters_stay_consistent(ops in prop::collection::vec(op_strategy(), 1..64)) {
            let mut rec = StockRecord::empty(test_key(), test_time());

            for op in ops {
                // Failed operations must leave the record untouched.
                let before = rec.clone();
                let result = match op {
                    Op::Receive(q) => rec.receive(q, test_time()),
                    Op::Reserve(q) => rec.reserve(q, test_time()),
                    Op::Release(q) => rec.release(q, test_time()),
                    Op::ConfirmSale(q) => rec.confirm_sale(q, test_time()),
                    Op::Restock(q) => rec.restock(q, test_time()),
                    Op::Adjust(d) => rec.adjust(d, test_time()),
                };
                if result.is_err() {
                    prop_assert_eq!(before.quantity(), rec.quantity());
                    prop_assert_eq!(before.reserved(), rec.reserved());
                }

                prop_assert!(rec.reserved() >= 0);
                prop_assert!(rec.available() >= 0);
            }
        }
    }
}
