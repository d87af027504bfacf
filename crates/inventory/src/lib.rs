//! Inventory domain module: the stock ledger.
//!
//! This crate contains the business rules for per-(variant, location) stock,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Locking and atomic multi-line execution live in `loomerp-infra`.

pub mod alert;
pub mod stock;
pub mod transaction;

pub use alert::{AlertId, StockAlert};
pub use stock::{StockKey, StockMovement, StockRecord};
pub use transaction::{
    Reference, ReferenceKind, StockTransaction, TransactionFilter, TransactionId, TransactionKind,
    replay,
};
