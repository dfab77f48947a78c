//! The module contains the errors the ledger can return.
//!
//! Two kinds are safe to retry automatically:
//!
//! - [`Conflict`] a lost optimistic-concurrency race on a parent balance.
//! - [`TransientFailure`] the database was unreachable.
//!
//! Everything else requires new input or admin action.
//!
//! [`Conflict`]: LedgerError::Conflict
//! [`TransientFailure`]: LedgerError::TransientFailure
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Order total does not match its items: {0}")]
    AmountMismatch(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid order status transition: {0}")]
    InvalidTransition(String),
    #[error("Concurrent update lost: {0}")]
    Conflict(String),
    #[error("Backend unreachable: {0}")]
    TransientFailure(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error(transparent)]
    Database(DbErr),
}

impl From<DbErr> for LedgerError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::Conn(run_err) => Self::TransientFailure(run_err.to_string()),
            DbErr::ConnectionAcquire(acquire_err) => {
                Self::TransientFailure(acquire_err.to_string())
            }
            other => Self::Database(other),
        }
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::AmountMismatch(a), Self::AmountMismatch(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::TransientFailure(a), Self::TransientFailure(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl LedgerError {
    /// Whether a caller may retry the failed operation as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::TransientFailure(_))
    }
}
