//! Sales orders domain module.
//!
//! This crate contains the business rules for retail/wholesale sales orders,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Stock effects are decided here (as `CancelEffect` etc.) and
//! executed by the ledger in `loomerp-infra`.

pub mod order;

pub use order::{
    CancelEffect, NewOrderLine, Order, OrderId, OrderItem, OrderStatus, OrderType, PaymentStatus,
    VariantPrices,
};
