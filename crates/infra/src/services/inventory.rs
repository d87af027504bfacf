use std::sync::Arc;

use chrono::{DateTime, Utc};

use loomerp_core::{AggregateId, DomainResult, UserId};
use loomerp_inventory::{
    AlertId, Reference, StockAlert, StockKey, StockRecord, StockTransaction, TransactionFilter,
};

use crate::repository::InMemoryRepository;
use crate::stock_ledger::StockLedger;

/// Direct inventory operations: manual adjustments, stock queries, the
/// audit trail, and low-stock alerting.
pub struct InventoryService {
    ledger: Arc<StockLedger>,
    alerts: Arc<InMemoryRepository<StockAlert>>,
}

impl InventoryService {
    pub fn new(ledger: Arc<StockLedger>, alerts: Arc<InMemoryRepository<StockAlert>>) -> Self {
        Self { ledger, alerts }
    }

    /// Manual stock correction (count, damage, shrinkage). The reason lands
    /// in the audit entry.
    pub fn adjust_stock(
        &self,
        key: StockKey,
        delta: i64,
        reason: impl Into<String>,
        performed_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<StockRecord> {
        let reason = reason.into();
        let record = self.ledger.adjust(
            key,
            delta,
            Reference::adjustment(AggregateId::new()),
            performed_by,
            reason.clone(),
            now,
        )?;
        tracing::info!("Adjusted stock for {} by {}: {}", key, delta, reason);
        Ok(record)
    }

    pub fn stock_record(&self, key: StockKey) -> DomainResult<Option<StockRecord>> {
        self.ledger.record(key)
    }

    pub fn stock_levels(&self) -> DomainResult<Vec<StockRecord>> {
        self.ledger.records()
    }

    pub fn low_stock(&self, threshold: i64) -> DomainResult<Vec<StockRecord>> {
        self.ledger.low_stock(threshold)
    }

    pub fn transactions(&self, filter: &TransactionFilter) -> DomainResult<Vec<StockTransaction>> {
        self.ledger.transactions(filter)
    }

    pub fn create_alert(
        &self,
        key: StockKey,
        threshold: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<StockAlert> {
        let alert = StockAlert::new(key, threshold, now);
        self.alerts.insert(alert.clone())?;
        Ok(alert)
    }

    pub fn deactivate_alert(&self, id: AlertId) -> DomainResult<StockAlert> {
        self.alerts.update(&id, |alert| {
            alert.is_active = false;
            Ok(alert.clone())
        })
    }

    /// Alerts currently firing, evaluated against live ledger state.
    pub fn triggered_alerts(&self) -> DomainResult<Vec<StockAlert>> {
        let alerts = self.alerts.all()?;
        self.ledger.triggered_alerts(&alerts)
    }
}
