//! Application services: document numbering, persistence, and ledger
//! coordination for each business workflow.
//!
//! Services own the write path. Each mutation validates the document state
//! machine first, then runs the stock side as one atomic ledger batch, and
//! only persists the document once the ledger accepted the batch. A ledger
//! rejection therefore leaves both the counters and the documents exactly
//! as they were.

mod inventory;
mod invoicing;
mod purchasing;
mod sales;

pub use inventory::InventoryService;
pub use invoicing::InvoicingService;
pub use purchasing::PurchasingService;
pub use sales::SalesService;
