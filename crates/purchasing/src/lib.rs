//! Purchasing domain module: purchase orders and goods receipt.
//!
//! This crate contains the business rules for the supply side, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Stock
//! increments on receipt are executed by the ledger in `loomerp-infra`.

pub mod grn;
pub mod order;

pub use grn::{GoodsReceiptNote, GrnId, GrnItem, GrnLine};
pub use order::{
    PurchaseOrder, PurchaseOrderId, PurchaseOrderItem, PurchaseOrderStatus, SupplierId,
};
