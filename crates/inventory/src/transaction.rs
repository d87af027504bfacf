use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomerp_core::{AggregateId, LocationId, UserId, VariantId};

use crate::stock::{StockKey, StockMovement};

/// Stock transaction identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub AggregateId);

impl TransactionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Direction/category of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    In,
    Out,
    Transfer,
    Adjustment,
    Return,
}

/// Kind of business document a transaction points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    SalesOrder,
    PurchaseOrder,
    Transfer,
    Return,
    Adjustment,
}

/// Link from a ledger mutation back to the document that caused it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub id: AggregateId,
}

impl Reference {
    pub fn sales_order(id: AggregateId) -> Self {
        Self {
            kind: ReferenceKind::SalesOrder,
            id,
        }
    }

    pub fn purchase_order(id: AggregateId) -> Self {
        Self {
            kind: ReferenceKind::PurchaseOrder,
            id,
        }
    }

    pub fn sales_return(id: AggregateId) -> Self {
        Self {
            kind: ReferenceKind::Return,
            id,
        }
    }

    pub fn adjustment(id: AggregateId) -> Self {
        Self {
            kind: ReferenceKind::Adjustment,
            id,
        }
    }
}

/// Immutable audit entry: one ledger mutation.
///
/// Carries the on-hand delta and the reservation delta separately so that
/// replaying a key's log from `(0, 0)` reproduces the current record exactly.
/// Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: TransactionId,
    pub key: StockKey,
    pub kind: TransactionKind,
    pub quantity_delta: i64,
    pub reserved_delta: i64,
    pub reference: Reference,
    pub performed_by: Option<UserId>,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

impl StockTransaction {
    pub fn new(
        key: StockKey,
        kind: TransactionKind,
        movement: StockMovement,
        reference: Reference,
        performed_by: Option<UserId>,
        note: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(AggregateId::new()),
            key,
            kind,
            quantity_delta: movement.quantity_delta,
            reserved_delta: movement.reserved_delta,
            reference,
            performed_by,
            note: note.into(),
            timestamp,
        }
    }
}

/// Query filter over the transaction log.
///
/// Empty filter matches everything; the canonical audit view orders matches
/// newest first (the log store applies the ordering).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub variant: Option<VariantId>,
    pub location: Option<LocationId>,
    pub kind: Option<TransactionKind>,
    pub reference_kind: Option<ReferenceKind>,
    pub reference_id: Option<AggregateId>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn for_key(key: StockKey) -> Self {
        Self {
            variant: Some(key.variant),
            location: Some(key.location),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference_kind = Some(reference.kind);
        self.reference_id = Some(reference.id);
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn matches(&self, txn: &StockTransaction) -> bool {
        if let Some(v) = self.variant {
            if txn.key.variant != v {
                return false;
            }
        }
        if let Some(l) = self.location {
            if txn.key.location != l {
                return false;
            }
        }
        if let Some(k) = self.kind {
            if txn.kind != k {
                return false;
            }
        }
        if let Some(rk) = self.reference_kind {
            if txn.reference.kind != rk {
                return false;
            }
        }
        if let Some(rid) = self.reference_id {
            if txn.reference.id != rid {
                return false;
            }
        }
        if let Some(since) = self.since {
            if txn.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if txn.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// Replay a key's audit trail from `(quantity = 0, reserved = 0)`.
///
/// Returns the `(quantity, reserved)` the log accounts for. Must equal the
/// live record for a correctly maintained ledger.
pub fn replay<'a>(
    key: StockKey,
    transactions: impl IntoIterator<Item = &'a StockTransaction>,
) -> (i64, i64) {
    transactions
        .into_iter()
        .filter(|t| t.key == key)
        .fold((0, 0), |(qty, res), t| {
            (qty + t.quantity_delta, res + t.reserved_delta)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::StockRecord;
    use loomerp_core::AggregateId;

    fn test_key() -> StockKey {
        StockKey::new(VariantId::new(), LocationId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn txn(key: StockKey, kind: TransactionKind, movement: StockMovement) -> StockTransaction {
        StockTransaction::new(
            key,
            kind,
            movement,
            Reference::adjustment(AggregateId::new()),
            None,
            "",
            test_time(),
        )
    }

    #[test]
    fn filter_by_key_and_kind() {
        let key = test_key();
        let other = test_key();
        let movement = StockMovement {
            quantity_delta: 5,
            reserved_delta: 0,
        };

        let entries = vec![
            txn(key, TransactionKind::In, movement),
            txn(other, TransactionKind::In, movement),
            txn(key, TransactionKind::Adjustment, movement),
        ];

        let filter = TransactionFilter::for_key(key).with_kind(TransactionKind::In);
        let matched: Vec<_> = entries.iter().filter(|t| filter.matches(t)).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].key, key);
        assert_eq!(matched[0].kind, TransactionKind::In);
    }

    #[test]
    fn filter_by_reference() {
        let key = test_key();
        let order_id = AggregateId::new();
        let movement = StockMovement {
            quantity_delta: 0,
            reserved_delta: 3,
        };

        let entries = vec![
            StockTransaction::new(
                key,
                TransactionKind::Out,
                movement,
                Reference::sales_order(order_id),
                None,
                "",
                test_time(),
            ),
            StockTransaction::new(
                key,
                TransactionKind::Out,
                movement,
                Reference::sales_order(AggregateId::new()),
                None,
                "",
                test_time(),
            ),
        ];

        let filter = TransactionFilter::default().with_reference(Reference::sales_order(order_id));
        let matched: Vec<_> = entries.iter().filter(|t| filter.matches(t)).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].reference.id, order_id);
    }

    #[test]
    fn filter_by_time_range() {
        let key = test_key();
        let movement = StockMovement {
            quantity_delta: 1,
            reserved_delta: 0,
        };

        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::hours(1);
        let t2 = t0 + chrono::Duration::hours(2);

        let mut early = txn(key, TransactionKind::In, movement);
        early.timestamp = t0;
        let mut late = txn(key, TransactionKind::In, movement);
        late.timestamp = t2;

        let filter = TransactionFilter::default().between(t1, t2);
        assert!(!filter.matches(&early));
        assert!(filter.matches(&late));
    }

    #[test]
    fn replay_reproduces_record_state() {
        let key = test_key();
        let now = test_time();
        let mut rec = StockRecord::empty(key, now);
        let mut log = Vec::new();

        let reference = Reference::adjustment(AggregateId::new());
        let mut apply = |kind: TransactionKind, movement: StockMovement, log: &mut Vec<StockTransaction>| {
            log.push(StockTransaction::new(
                key, kind, movement, reference, None, "", now,
            ));
        };

        apply(TransactionKind::In, rec.receive(100, now).unwrap(), &mut log);
        apply(TransactionKind::Out, rec.reserve(30, now).unwrap(), &mut log);
        apply(
            TransactionKind::Out,
            rec.confirm_sale(30, now).unwrap(),
            &mut log,
        );
        apply(TransactionKind::Out, rec.reserve(10, now).unwrap(), &mut log);
        apply(TransactionKind::Out, rec.release(10, now).unwrap(), &mut log);
        apply(
            TransactionKind::Adjustment,
            rec.adjust(-5, now).unwrap(),
            &mut log,
        );

        let (quantity, reserved) = replay(key, &log);
        assert_eq!(quantity, rec.quantity());
        assert_eq!(reserved, rec.reserved());
        assert_eq!(quantity, 65);
        assert_eq!(reserved, 0);
    }
}
