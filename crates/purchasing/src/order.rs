use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use loomerp_core::{AggregateId, DomainError, DomainResult, Entity, LocationId, UserId, VariantId};

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Supplier identifier (party the PO is addressed to).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub AggregateId);

impl SupplierId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Confirmed,
    Shipped,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Sent => "sent",
            PurchaseOrderStatus::Confirmed => "confirmed",
            PurchaseOrderStatus::Shipped => "shipped",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled
        )
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase order line: variant, ordered quantity, agreed unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub line_no: u32,
    pub variant: VariantId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl PurchaseOrderItem {
    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(self.quantity as u64)
    }
}

/// Purchase order to a supplier, receiving into one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    number: String,
    supplier: SupplierId,
    location: LocationId,
    status: PurchaseOrderStatus,
    items: Vec<PurchaseOrderItem>,
    total_amount: u64,
    expected_delivery: Option<NaiveDate>,
    created_by: Option<UserId>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Build a Draft purchase order with numbered lines and a computed total.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: PurchaseOrderId,
        number: impl Into<String>,
        supplier: SupplierId,
        location: LocationId,
        lines: &[(VariantId, i64, u64)],
        expected_delivery: Option<NaiveDate>,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation(
                "purchase order must have at least one line",
            ));
        }

        let mut items = Vec::with_capacity(lines.len());
        for (idx, (variant, quantity, unit_price)) in lines.iter().enumerate() {
            if *quantity <= 0 {
                return Err(DomainError::validation("line quantity must be positive"));
            }
            items.push(PurchaseOrderItem {
                line_no: (idx as u32) + 1,
                variant: *variant,
                quantity: *quantity,
                unit_price: *unit_price,
            });
        }

        let total_amount = items
            .iter()
            .try_fold(0u64, |acc, item| acc.checked_add(item.line_total()))
            .ok_or_else(|| DomainError::validation("purchase order total overflow"))?;

        Ok(Self {
            id,
            number: number.into(),
            supplier,
            location,
            status: PurchaseOrderStatus::Draft,
            items,
            total_amount,
            expected_delivery,
            created_by,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn supplier(&self) -> SupplierId {
        self.supplier
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn items(&self) -> &[PurchaseOrderItem] {
        &self.items
    }

    pub fn item(&self, line_no: u32) -> Option<&PurchaseOrderItem> {
        self.items.iter().find(|i| i.line_no == line_no)
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn expected_delivery(&self) -> Option<NaiveDate> {
        self.expected_delivery
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Goods can be received only once the supplier has confirmed (or
    /// shipped) the order.
    pub fn is_receivable(&self) -> bool {
        matches!(
            self.status,
            PurchaseOrderStatus::Confirmed | PurchaseOrderStatus::Shipped
        )
    }

    fn transition(
        &mut self,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != from {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                to.as_str(),
            ));
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Draft -> Sent.
    pub fn send(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(PurchaseOrderStatus::Draft, PurchaseOrderStatus::Sent, now)
    }

    /// Sent -> Confirmed, by the owning supplier.
    pub fn confirm(&mut self, supplier: SupplierId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_supplier(supplier)?;
        self.transition(PurchaseOrderStatus::Sent, PurchaseOrderStatus::Confirmed, now)
    }

    /// Confirmed -> Shipped, by the owning supplier.
    pub fn mark_shipped(&mut self, supplier: SupplierId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_supplier(supplier)?;
        self.transition(
            PurchaseOrderStatus::Confirmed,
            PurchaseOrderStatus::Shipped,
            now,
        )
    }

    /// Confirmed | Shipped -> Received. Fires after any goods receipt, even a
    /// partial one; multiple receipts against one PO are not distinguished by
    /// the status field.
    pub fn mark_received(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_receivable() {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                PurchaseOrderStatus::Received.as_str(),
            ));
        }
        self.status = PurchaseOrderStatus::Received;
        self.updated_at = now;
        Ok(())
    }

    /// Any non-terminal state -> Cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                PurchaseOrderStatus::Cancelled.as_str(),
            ));
        }
        self.status = PurchaseOrderStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_supplier(&self, supplier: SupplierId) -> DomainResult<()> {
        if self.supplier != supplier {
            return Err(DomainError::conflict(
                "purchase order belongs to a different supplier",
            ));
        }
        Ok(())
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_po_id() -> PurchaseOrderId {
        PurchaseOrderId::new(AggregateId::new())
    }

    fn test_supplier() -> SupplierId {
        SupplierId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn draft_po(supplier: SupplierId) -> PurchaseOrder {
        PurchaseOrder::create(
            test_po_id(),
            "PO-20260830-0001",
            supplier,
            LocationId::new(),
            &[(VariantId::new(), 50, 900), (VariantId::new(), 20, 1200)],
            None,
            None,
            test_time(),
        )
        .unwrap()
    }

    #[test]
    fn create_numbers_lines_and_totals() {
        let po = draft_po(test_supplier());
        assert_eq!(po.status(), PurchaseOrderStatus::Draft);
        assert_eq!(po.items().len(), 2);
        assert_eq!(po.items()[0].line_no, 1);
        assert_eq!(po.items()[1].line_no, 2);
        assert_eq!(po.total_amount(), 50 * 900 + 20 * 1200);
    }

    #[test]
    fn lifecycle_draft_to_received() {
        let supplier = test_supplier();
        let mut po = draft_po(supplier);

        po.send(test_time()).unwrap();
        assert_eq!(po.status(), PurchaseOrderStatus::Sent);
        po.confirm(supplier, test_time()).unwrap();
        assert_eq!(po.status(), PurchaseOrderStatus::Confirmed);
        po.mark_shipped(supplier, test_time()).unwrap();
        assert_eq!(po.status(), PurchaseOrderStatus::Shipped);
        po.mark_received(test_time()).unwrap();
        assert_eq!(po.status(), PurchaseOrderStatus::Received);
    }

    #[test]
    fn receive_is_allowed_straight_from_confirmed() {
        let supplier = test_supplier();
        let mut po = draft_po(supplier);
        po.send(test_time()).unwrap();
        po.confirm(supplier, test_time()).unwrap();
        assert!(po.is_receivable());
        po.mark_received(test_time()).unwrap();
    }

    #[test]
    fn confirm_requires_the_owning_supplier() {
        let supplier = test_supplier();
        let mut po = draft_po(supplier);
        po.send(test_time()).unwrap();

        let err = po.confirm(test_supplier(), test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(po.status(), PurchaseOrderStatus::Sent);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let supplier = test_supplier();
        let mut po = draft_po(supplier);

        assert!(po.confirm(supplier, test_time()).is_err());
        assert!(po.mark_shipped(supplier, test_time()).is_err());
        assert!(po.mark_received(test_time()).is_err());
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        let supplier = test_supplier();

        let mut po = draft_po(supplier);
        assert!(po.cancel(test_time()).is_ok());

        let mut po = draft_po(supplier);
        po.send(test_time()).unwrap();
        po.confirm(supplier, test_time()).unwrap();
        assert!(po.cancel(test_time()).is_ok());

        let mut po = draft_po(supplier);
        po.send(test_time()).unwrap();
        po.confirm(supplier, test_time()).unwrap();
        po.mark_received(test_time()).unwrap();
        assert!(po.cancel(test_time()).is_err());
    }
}
