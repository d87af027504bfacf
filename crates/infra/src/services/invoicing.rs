use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use loomerp_core::{AggregateId, DomainError, DomainResult};
use loomerp_invoicing::{Invoice, InvoiceId, Payment, PaymentId, PaymentMethod};
use loomerp_sales::{Order, OrderId, OrderStatus};

use crate::docnum::DocumentSequence;
use crate::repository::InMemoryRepository;

/// Invoicing workflow: one invoice per confirmed order, payments against
/// the invoice balance, payment status mirrored back onto the order.
pub struct InvoicingService {
    invoices: Arc<InMemoryRepository<Invoice>>,
    payments: Arc<InMemoryRepository<Payment>>,
    orders: Arc<InMemoryRepository<Order>>,
    sequence: Arc<DocumentSequence>,
}

impl InvoicingService {
    pub fn new(
        invoices: Arc<InMemoryRepository<Invoice>>,
        payments: Arc<InMemoryRepository<Payment>>,
        orders: Arc<InMemoryRepository<Order>>,
        sequence: Arc<DocumentSequence>,
    ) -> Self {
        Self {
            invoices,
            payments,
            orders,
            sequence,
        }
    }

    /// Issue an invoice for a confirmed (or further progressed) order, for
    /// the order's total. At most one invoice exists per order.
    pub fn issue_invoice(
        &self,
        order_id: OrderId,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Invoice> {
        let order = self.orders.require(&order_id)?;
        match order.status() {
            OrderStatus::Confirmed | OrderStatus::Shipped | OrderStatus::Delivered => {}
            OrderStatus::Pending | OrderStatus::Cancelled => {
                return Err(DomainError::conflict(format!(
                    "order {} is {} and cannot be invoiced",
                    order.number(),
                    order.status()
                )));
            }
        }
        let number = self.sequence.next("INV", now.date_naive());
        let invoice = Invoice::issue(
            InvoiceId::new(AggregateId::new()),
            number,
            order_id,
            order.total_amount(),
            due_date,
            now,
        );
        // Uniqueness is checked under the invoice repository's write lock,
        // so two racing issues for one order cannot both get through.
        self.invoices.insert_unique(
            invoice.clone(),
            |i| i.order() == order_id,
            format!("order {} is already invoiced", order.number()),
        )?;

        tracing::info!(
            "Issued invoice {} for order {}, amount {}",
            invoice.number(),
            order.number(),
            invoice.amount()
        );
        Ok(invoice)
    }

    /// Record a payment against an invoice and mirror the resulting payment
    /// status onto the order. Rejects zero amounts and overpayment.
    pub fn record_payment(
        &self,
        invoice_id: InvoiceId,
        amount: u64,
        method: PaymentMethod,
        reference_number: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Payment> {
        // The balance check and the balance update share the invoice's write
        // lock; concurrent payments serialize and cannot jointly overpay.
        let (invoice, payment_status) = self.invoices.update(&invoice_id, |invoice| {
            let status = invoice.record_payment(amount)?;
            Ok((invoice.clone(), status))
        })?;

        let payment = Payment {
            id: PaymentId::new(AggregateId::new()),
            invoice: invoice_id,
            amount,
            method,
            reference_number: reference_number.into(),
            note: String::new(),
            paid_at: now,
        };
        self.payments.insert(payment.clone())?;

        self.orders.update(&invoice.order(), |order| {
            order.set_payment_status(payment_status, now);
            Ok(())
        })?;

        tracing::info!(
            "Recorded payment of {} against invoice {}, balance {}",
            amount,
            invoice.number(),
            invoice.balance()
        );
        Ok(payment)
    }

    pub fn invoice(&self, id: InvoiceId) -> DomainResult<Option<Invoice>> {
        self.invoices.get(&id)
    }

    pub fn invoice_for_order(&self, order_id: OrderId) -> DomainResult<Option<Invoice>> {
        Ok(self
            .invoices
            .find(|i| i.order() == order_id)?
            .into_iter()
            .next())
    }

    pub fn payments_for(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Payment>> {
        let mut found = self.payments.find(|p| p.invoice == invoice_id)?;
        found.sort_by_key(|p| p.paid_at);
        Ok(found)
    }
}
