//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// state-machine rules, stock arithmetic). Infrastructure concerns belong
/// elsewhere. Stock errors carry enough context to render a user-facing
/// message without another lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state-machine rule was violated.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// A reservation, sale confirmation, or adjustment would go negative.
    #[error(
        "insufficient stock for variant {variant} at {location}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        variant: crate::VariantId,
        location: crate::LocationId,
        requested: i64,
        available: i64,
    },

    /// A goods-receipt line exceeds the ordered quantity.
    #[error("over-receipt: received {received} + rejected {rejected} exceeds ordered {ordered}")]
    OverReceipt {
        ordered: i64,
        received: i64,
        rejected: i64,
    },

    /// A payment exceeds the remaining invoice balance.
    #[error("over-payment: amount {amount} exceeds balance {balance}")]
    OverPayment { balance: u64, amount: u64 },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested entity was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. duplicate document, stale state).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
