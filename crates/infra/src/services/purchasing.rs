use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use loomerp_core::{AggregateId, DomainError, DomainResult, LocationId, UserId, VariantId};
use loomerp_inventory::{Reference, StockKey};
use loomerp_purchasing::{
    GoodsReceiptNote, GrnId, GrnLine, PurchaseOrder, PurchaseOrderId, SupplierId,
};

use crate::docnum::DocumentSequence;
use crate::repository::InMemoryRepository;
use crate::stock_ledger::{LedgerAction, LedgerOp, StockLedger};

/// Purchase-side workflow: PO lifecycle and goods receipt.
pub struct PurchasingService {
    ledger: Arc<StockLedger>,
    purchase_orders: Arc<InMemoryRepository<PurchaseOrder>>,
    receipts: Arc<InMemoryRepository<GoodsReceiptNote>>,
    sequence: Arc<DocumentSequence>,
}

impl PurchasingService {
    pub fn new(
        ledger: Arc<StockLedger>,
        purchase_orders: Arc<InMemoryRepository<PurchaseOrder>>,
        receipts: Arc<InMemoryRepository<GoodsReceiptNote>>,
        sequence: Arc<DocumentSequence>,
    ) -> Self {
        Self {
            ledger,
            purchase_orders,
            receipts,
            sequence,
        }
    }

    /// Create a Draft purchase order. Lines are `(variant, quantity,
    /// unit_price)` triples; no stock moves until goods are received.
    pub fn create_purchase_order(
        &self,
        supplier: SupplierId,
        location: LocationId,
        lines: &[(VariantId, i64, u64)],
        expected_delivery: Option<NaiveDate>,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<PurchaseOrder> {
        let number = self.sequence.next("PO", now.date_naive());
        let po = PurchaseOrder::create(
            PurchaseOrderId::new(AggregateId::new()),
            number,
            supplier,
            location,
            lines,
            expected_delivery,
            created_by,
            now,
        )?;
        self.purchase_orders.insert(po.clone())?;

        tracing::info!(
            "Created purchase order {} with {} lines",
            po.number(),
            po.items().len()
        );
        Ok(po)
    }

    pub fn send_order(&self, id: PurchaseOrderId, now: DateTime<Utc>) -> DomainResult<PurchaseOrder> {
        self.transition(id, |po| po.send(now))
    }

    /// Supplier-side acknowledgement. The supplier id must match the order.
    pub fn confirm_order(
        &self,
        id: PurchaseOrderId,
        supplier: SupplierId,
        now: DateTime<Utc>,
    ) -> DomainResult<PurchaseOrder> {
        self.transition(id, |po| po.confirm(supplier, now))
    }

    pub fn mark_shipped(
        &self,
        id: PurchaseOrderId,
        supplier: SupplierId,
        now: DateTime<Utc>,
    ) -> DomainResult<PurchaseOrder> {
        self.transition(id, |po| po.mark_shipped(supplier, now))
    }

    pub fn cancel_order(
        &self,
        id: PurchaseOrderId,
        now: DateTime<Utc>,
    ) -> DomainResult<PurchaseOrder> {
        let po = self.transition(id, |po| po.cancel(now))?;
        tracing::info!("Cancelled purchase order {}", po.number());
        Ok(po)
    }

    /// Record a goods receipt against a Confirmed or Shipped purchase order.
    ///
    /// The GRN is validated line by line against the order before anything
    /// happens; accepted quantities then increment stock as one atomic
    /// batch, and the order moves to Received — also on a partial receipt.
    /// Rejected quantities are recorded on the GRN but never touch stock.
    pub fn receive_goods(
        &self,
        id: PurchaseOrderId,
        lines: &[GrnLine],
        received_by: Option<UserId>,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<GoodsReceiptNote> {
        let notes = notes.into();
        // The receivability check, the stock increment, and the move to
        // Received run under the order's write lock: a second receipt racing
        // this one finds the order already Received and fails the check.
        let grn = self.purchase_orders.update(&id, |po| {
            if !po.is_receivable() {
                return Err(DomainError::invalid_transition(
                    po.status().as_str(),
                    "received",
                ));
            }

            let mut next = po.clone();
            let number = self.sequence.next("GRN", now.date_naive());
            let grn = GoodsReceiptNote::create(
                GrnId::new(AggregateId::new()),
                number,
                &next,
                lines,
                received_by,
                notes,
                now,
            )?;

            let reference = Reference::purchase_order(next.id_typed().0);
            let batch: Vec<LedgerOp> = grn
                .stock_increments()
                .map(|(variant, qty)| LedgerOp {
                    key: StockKey::new(variant, next.location()),
                    action: LedgerAction::Receive(qty),
                    reference,
                    performed_by: received_by,
                    note: format!("goods receipt {}", grn.number()),
                })
                .collect();
            // An all-rejected receipt moves no stock but still documents the
            // delivery.
            if !batch.is_empty() {
                self.ledger.execute(&batch, now)?;
            }

            next.mark_received(now)?;
            *po = next;
            Ok(grn)
        })?;
        self.receipts.insert(grn.clone())?;

        tracing::info!(
            "Received goods against purchase order {}: receipt {}",
            id,
            grn.number()
        );
        Ok(grn)
    }

    pub fn purchase_order(&self, id: PurchaseOrderId) -> DomainResult<Option<PurchaseOrder>> {
        self.purchase_orders.get(&id)
    }

    pub fn receipts_for(&self, id: PurchaseOrderId) -> DomainResult<Vec<GoodsReceiptNote>> {
        let mut found = self.receipts.find(|g| g.purchase_order() == id)?;
        found.sort_by_key(|g| g.created_at());
        Ok(found)
    }

    fn transition(
        &self,
        id: PurchaseOrderId,
        apply: impl FnOnce(&mut PurchaseOrder) -> DomainResult<()>,
    ) -> DomainResult<PurchaseOrder> {
        self.purchase_orders.update(&id, |po| {
            apply(po)?;
            Ok(po.clone())
        })
    }
}
