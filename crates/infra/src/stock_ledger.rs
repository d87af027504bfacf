use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use loomerp_core::{DomainError, DomainResult, UserId};
use loomerp_inventory::{
    Reference, StockAlert, StockKey, StockMovement, StockRecord, StockTransaction,
    TransactionFilter, TransactionKind, replay,
};

fn poisoned(_: impl core::fmt::Debug) -> DomainError {
    DomainError::conflict("stock ledger lock poisoned")
}

/// One primitive transition to apply to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    Reserve(i64),
    Release(i64),
    ConfirmSale(i64),
    Receive(i64),
    Restock(i64),
    Adjust(i64),
}

impl LedgerAction {
    fn kind(self) -> TransactionKind {
        match self {
            LedgerAction::Reserve(_) | LedgerAction::ConfirmSale(_) => TransactionKind::Out,
            LedgerAction::Release(_) | LedgerAction::Restock(_) => TransactionKind::Return,
            LedgerAction::Receive(_) => TransactionKind::In,
            LedgerAction::Adjust(_) => TransactionKind::Adjustment,
        }
    }

    fn apply(self, record: &mut StockRecord, now: DateTime<Utc>) -> DomainResult<StockMovement> {
        match self {
            LedgerAction::Reserve(qty) => record.reserve(qty, now),
            LedgerAction::Release(qty) => record.release(qty, now),
            LedgerAction::ConfirmSale(qty) => record.confirm_sale(qty, now),
            LedgerAction::Receive(qty) => record.receive(qty, now),
            LedgerAction::Restock(qty) => record.restock(qty, now),
            LedgerAction::Adjust(delta) => record.adjust(delta, now),
        }
    }
}

/// One line of an atomic ledger batch: what to do, to which key, and how the
/// resulting audit entry is tagged.
#[derive(Debug, Clone)]
pub struct LedgerOp {
    pub key: StockKey,
    pub action: LedgerAction,
    pub reference: Reference,
    pub performed_by: Option<UserId>,
    pub note: String,
}

/// The stock ledger: per-(variant, location) counters plus the append-only
/// transaction log.
///
/// Every mutation goes through [`StockLedger::execute`], which locks the
/// records a batch touches in stable key order, applies every transition to
/// working copies, and commits counters and audit entries together — or
/// nothing at all. Two concurrent batches against the same key serialize on
/// that record's lock; the loser either waits or fails cleanly with
/// `InsufficientStock`.
#[derive(Debug, Default)]
pub struct StockLedger {
    records: RwLock<HashMap<StockKey, Arc<Mutex<StockRecord>>>>,
    log: Mutex<Vec<StockTransaction>>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a batch of operations atomically.
    ///
    /// Locks are acquired in ascending `StockKey` order across all keys the
    /// batch touches, so concurrent multi-line batches cannot deadlock.
    /// Records are created lazily (quantity = 0); a reservation against a
    /// never-stocked line therefore fails with `InsufficientStock`.
    pub fn execute(
        &self,
        batch: &[LedgerOp],
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<StockTransaction>> {
        if batch.is_empty() {
            return Err(DomainError::validation("ledger batch cannot be empty"));
        }

        let mut keys: Vec<StockKey> = batch.iter().map(|op| op.key).collect();
        keys.sort();
        keys.dedup();

        // Lazily create any missing records, then pin the Arcs so the map
        // lock is not held while record locks are taken.
        let handles: Vec<(StockKey, Arc<Mutex<StockRecord>>)> = {
            let mut map = self.records.write().map_err(poisoned)?;
            keys.iter()
                .map(|key| {
                    let handle = map
                        .entry(*key)
                        .or_insert_with(|| Arc::new(Mutex::new(StockRecord::empty(*key, now))))
                        .clone();
                    (*key, handle)
                })
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for (key, handle) in &handles {
            guards.push((*key, handle.lock().map_err(poisoned)?));
        }

        // All transitions run against working copies; the live records stay
        // untouched until the whole batch has validated.
        let mut working: HashMap<StockKey, StockRecord> = guards
            .iter()
            .map(|(key, guard)| (*key, (**guard).clone()))
            .collect();

        let mut entries = Vec::with_capacity(batch.len());
        for op in batch {
            let record = working
                .get_mut(&op.key)
                .ok_or_else(DomainError::not_found)?;
            let movement = op.action.apply(record, now)?;
            entries.push(StockTransaction::new(
                op.key,
                op.action.kind(),
                movement,
                op.reference,
                op.performed_by,
                op.note.clone(),
                now,
            ));
        }

        // Commit: counters first, then the audit entries, under the same
        // record locks.
        for (key, guard) in &mut guards {
            if let Some(updated) = working.remove(key) {
                **guard = updated;
            }
        }
        self.log.lock().map_err(poisoned)?.extend(entries.clone());

        Ok(entries)
    }

    /// Single-op convenience: execute and return the updated record.
    fn apply_one(&self, op: LedgerOp, now: DateTime<Utc>) -> DomainResult<StockRecord> {
        let key = op.key;
        self.execute(&[op], now)?;
        self.record(key)?.ok_or_else(DomainError::not_found)
    }

    /// Soft-hold `qty` for a pending order.
    pub fn reserve(
        &self,
        key: StockKey,
        qty: i64,
        reference: Reference,
        performed_by: Option<UserId>,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<StockRecord> {
        self.apply_one(
            LedgerOp {
                key,
                action: LedgerAction::Reserve(qty),
                reference,
                performed_by,
                note: note.into(),
            },
            now,
        )
    }

    /// Release a reservation (clamped at zero).
    pub fn release(
        &self,
        key: StockKey,
        qty: i64,
        reference: Reference,
        performed_by: Option<UserId>,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<StockRecord> {
        self.apply_one(
            LedgerOp {
                key,
                action: LedgerAction::Release(qty),
                reference,
                performed_by,
                note: note.into(),
            },
            now,
        )
    }

    /// Convert a reservation into an actual sale.
    pub fn confirm_sale(
        &self,
        key: StockKey,
        qty: i64,
        reference: Reference,
        performed_by: Option<UserId>,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<StockRecord> {
        self.apply_one(
            LedgerOp {
                key,
                action: LedgerAction::ConfirmSale(qty),
                reference,
                performed_by,
                note: note.into(),
            },
            now,
        )
    }

    /// Goods receipt against a purchase order.
    pub fn receive_stock(
        &self,
        key: StockKey,
        qty: i64,
        reference: Reference,
        performed_by: Option<UserId>,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<StockRecord> {
        self.apply_one(
            LedgerOp {
                key,
                action: LedgerAction::Receive(qty),
                reference,
                performed_by,
                note: note.into(),
            },
            now,
        )
    }

    /// Manual correction with an arbitrary signed delta.
    pub fn adjust(
        &self,
        key: StockKey,
        delta: i64,
        reference: Reference,
        performed_by: Option<UserId>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<StockRecord> {
        self.apply_one(
            LedgerOp {
                key,
                action: LedgerAction::Adjust(delta),
                reference,
                performed_by,
                note: reason.into(),
            },
            now,
        )
    }

    /// Current record for one key, if it has ever been touched.
    pub fn record(&self, key: StockKey) -> DomainResult<Option<StockRecord>> {
        let map = self.records.read().map_err(poisoned)?;
        match map.get(&key) {
            Some(handle) => Ok(Some(handle.lock().map_err(poisoned)?.clone())),
            None => Ok(None),
        }
    }

    /// All records, ordered by key.
    pub fn records(&self) -> DomainResult<Vec<StockRecord>> {
        let map = self.records.read().map_err(poisoned)?;
        let mut out = Vec::with_capacity(map.len());
        for handle in map.values() {
            out.push(handle.lock().map_err(poisoned)?.clone());
        }
        out.sort_by_key(|r| r.key());
        Ok(out)
    }

    /// Records whose on-hand quantity is at or below `threshold`.
    pub fn low_stock(&self, threshold: i64) -> DomainResult<Vec<StockRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.quantity() <= threshold)
            .collect())
    }

    /// Audit view: matching entries, newest first.
    pub fn transactions(&self, filter: &TransactionFilter) -> DomainResult<Vec<StockTransaction>> {
        let log = self.log.lock().map_err(poisoned)?;
        // Descending timestamp, with append order breaking ties so entries
        // logged at the same instant still come back newest first.
        let mut matched: Vec<(usize, &StockTransaction)> = log
            .iter()
            .enumerate()
            .filter(|(_, t)| filter.matches(t))
            .collect();
        matched.sort_by(|(ai, a), (bi, b)| b.timestamp.cmp(&a.timestamp).then(bi.cmp(ai)));
        Ok(matched.into_iter().map(|(_, t)| t.clone()).collect())
    }

    /// Rebuild a key's `(quantity, reserved)` purely from the audit trail.
    pub fn replay(&self, key: StockKey) -> DomainResult<(i64, i64)> {
        let log = self.log.lock().map_err(poisoned)?;
        Ok(replay(key, log.iter()))
    }

    /// Active alerts currently firing against ledger state.
    pub fn triggered_alerts(&self, alerts: &[StockAlert]) -> DomainResult<Vec<StockAlert>> {
        let mut out = Vec::new();
        for alert in alerts {
            if !alert.is_active {
                continue;
            }
            let record = self.record(alert.key)?;
            if alert.is_triggered(record.as_ref()) {
                out.push(alert.clone());
            }
        }
        Ok(out)
    }
}
