//! Invoicing domain module: invoices and payments against sales orders.
//!
//! Derived bookkeeping on top of completed orders; never touches the stock
//! ledger. Pure deterministic domain logic (no IO, no HTTP, no storage).

pub mod invoice;

pub use invoice::{Invoice, InvoiceId, Payment, PaymentId, PaymentMethod};
