use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomerp_core::{AggregateId, Entity};

use crate::stock::{StockKey, StockRecord};

/// Stock alert identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub AggregateId);

impl AlertId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AlertId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Low-stock alert configuration for one (variant, location) pair.
///
/// Stateless relative to the stock record: evaluated on demand against the
/// current ledger state, never materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: AlertId,
    pub key: StockKey,
    pub threshold: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl StockAlert {
    pub fn new(key: StockKey, threshold: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: AlertId::new(AggregateId::new()),
            key,
            threshold,
            is_active: true,
            created_at: now,
        }
    }

    /// An alert fires when available stock is below the threshold.
    /// A missing record means zero stock, which always fires.
    pub fn is_triggered(&self, record: Option<&StockRecord>) -> bool {
        match record {
            Some(rec) => rec.available() < self.threshold,
            None => true,
        }
    }
}

impl Entity for StockAlert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomerp_core::{LocationId, VariantId};

    fn test_key() -> StockKey {
        StockKey::new(VariantId::new(), LocationId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn missing_record_triggers() {
        let alert = StockAlert::new(test_key(), 10, test_time());
        assert!(alert.is_triggered(None));
    }

    #[test]
    fn available_below_threshold_triggers() {
        let key = test_key();
        let alert = StockAlert::new(key, 10, test_time());

        let mut rec = StockRecord::empty(key, test_time());
        rec.receive(15, test_time()).unwrap();
        assert!(!alert.is_triggered(Some(&rec)));

        // Reservations eat into availability.
        rec.reserve(8, test_time()).unwrap();
        assert_eq!(rec.available(), 7);
        assert!(alert.is_triggered(Some(&rec)));
    }

    #[test]
    fn threshold_is_exclusive() {
        let key = test_key();
        let alert = StockAlert::new(key, 10, test_time());

        let mut rec = StockRecord::empty(key, test_time());
        rec.receive(10, test_time()).unwrap();
        assert!(!alert.is_triggered(Some(&rec)));
    }
}
