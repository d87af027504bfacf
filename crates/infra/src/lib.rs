//! Infrastructure layer: stores, locking, document numbering, services.
//!
//! Domain crates stay pure; everything stateful lives here. The
//! `StockLedger` is the single mutation path for stock, the services wire
//! the lifecycle state machines to it.

pub mod docnum;
pub mod repository;
pub mod services;
pub mod stock_ledger;


pub use docnum::DocumentSequence;
pub use repository::InMemoryRepository;
pub use services::{InventoryService, InvoicingService, PurchasingService, SalesService};
pub use stock_ledger::{LedgerAction, LedgerOp, StockLedger};
