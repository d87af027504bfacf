use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use loomerp_core::{AggregateId, DomainError, DomainResult, Entity};
use loomerp_sales::{OrderId, PaymentStatus};

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Payment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub AggregateId);

impl PaymentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Upi,
    Cheque,
}

/// Payment record against an invoice. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice: InvoiceId,
    /// Amount in smallest currency unit (e.g., cents).
    pub amount: u64,
    pub method: PaymentMethod,
    pub reference_number: String,
    pub note: String,
    pub paid_at: DateTime<Utc>,
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Invoice for one sales order. `balance = amount - paid_amount`, recomputed
/// on every payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    number: String,
    order: OrderId,
    due_date: NaiveDate,
    /// Amounts in smallest currency unit.
    amount: u64,
    paid_amount: u64,
    created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn issue(
        id: InvoiceId,
        number: impl Into<String>,
        order: OrderId,
        amount: u64,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            number: number.into(),
            order,
            due_date,
            amount,
            paid_amount: 0,
            created_at: now,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn order(&self) -> OrderId {
        self.order
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn paid_amount(&self) -> u64 {
        self.paid_amount
    }

    pub fn balance(&self) -> u64 {
        self.amount.saturating_sub(self.paid_amount)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Apply a payment. Rejects zero and anything above the remaining
    /// balance; returns the payment status the parent order must take.
    pub fn record_payment(&mut self, amount: u64) -> DomainResult<PaymentStatus> {
        if amount == 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        if amount > self.balance() {
            return Err(DomainError::OverPayment {
                balance: self.balance(),
                amount,
            });
        }

        self.paid_amount = self
            .paid_amount
            .checked_add(amount)
            .ok_or_else(|| DomainError::validation("paid amount overflow"))?;

        Ok(if self.balance() == 0 {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        })
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
