use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomerp_core::{AggregateId, DomainError, DomainResult, Entity, UserId, VariantId};

use crate::order::{PurchaseOrder, PurchaseOrderId};

/// Goods receipt note identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrnId(pub AggregateId);

impl GrnId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for GrnId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Requested receipt line: which PO line, how much arrived, how much was
/// turned away at the dock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnLine {
    pub po_line_no: u32,
    pub quantity_received: i64,
    pub quantity_rejected: i64,
    pub remarks: String,
}

/// Validated receipt line inside a GRN, with the variant resolved from the
/// referenced PO line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnItem {
    pub po_line_no: u32,
    pub variant: VariantId,
    pub quantity_received: i64,
    pub quantity_rejected: i64,
    pub remarks: String,
}

/// Record of one physical receipt event against a purchase order.
///
/// Per-line invariant: `received + rejected <= ordered`. A PO may take
/// multiple partial receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceiptNote {
    id: GrnId,
    number: String,
    purchase_order: PurchaseOrderId,
    received_by: Option<UserId>,
    items: Vec<GrnItem>,
    notes: String,
    created_at: DateTime<Utc>,
}

impl GoodsReceiptNote {
    /// Validate every line against the PO before anything exists: unknown PO
    /// lines, negative quantities, and over-receipts all fail the whole GRN.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: GrnId,
        number: impl Into<String>,
        po: &PurchaseOrder,
        lines: &[GrnLine],
        received_by: Option<UserId>,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation(
                "goods receipt must have at least one line",
            ));
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let po_item = po
                .item(line.po_line_no)
                .ok_or_else(|| {
                    DomainError::validation(format!(
                        "purchase order {} has no line {}",
                        po.number(),
                        line.po_line_no
                    ))
                })?;

            if line.quantity_received < 0 || line.quantity_rejected < 0 {
                return Err(DomainError::validation(
                    "received and rejected quantities cannot be negative",
                ));
            }
            if line.quantity_received + line.quantity_rejected == 0 {
                return Err(DomainError::validation(
                    "receipt line must receive or reject something",
                ));
            }
            if line.quantity_received + line.quantity_rejected > po_item.quantity {
                return Err(DomainError::OverReceipt {
                    ordered: po_item.quantity,
                    received: line.quantity_received,
                    rejected: line.quantity_rejected,
                });
            }

            items.push(GrnItem {
                po_line_no: line.po_line_no,
                variant: po_item.variant,
                quantity_received: line.quantity_received,
                quantity_rejected: line.quantity_rejected,
                remarks: line.remarks.clone(),
            });
        }

        Ok(Self {
            id,
            number: number.into(),
            purchase_order: po.id_typed(),
            received_by,
            items,
            notes: notes.into(),
            created_at: now,
        })
    }

    pub fn id_typed(&self) -> GrnId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn purchase_order(&self) -> PurchaseOrderId {
        self.purchase_order
    }

    pub fn received_by(&self) -> Option<UserId> {
        self.received_by
    }

    pub fn items(&self) -> &[GrnItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The stock increments this receipt produces: one per line with a
    /// positive received quantity. Rejected goods never touch the ledger.
    pub fn stock_increments(&self) -> impl Iterator<Item = (VariantId, i64)> + '_ {
        self.items
            .iter()
            .filter(|i| i.quantity_received > 0)
            .map(|i| (i.variant, i.quantity_received))
    }
}

impl Entity for GoodsReceiptNote {
    type Id = GrnId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
