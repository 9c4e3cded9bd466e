//! The module contains the error the engine can throw.
//!
//! Every failure has its own variant so callers can show an actionable
//! message instead of a generic one:
//!
//! - [`NotFound`] thrown when an expense, group, balance or settlement id does
//!   not exist.
//! - [`AllocationMismatch`] thrown when split amounts do not add up to the
//!   expense total.
//! - [`PercentageMismatch`] thrown when split percentages do not add up to
//!   100%.
//! - [`MissingMethod`] thrown when a settlement has no payment method.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`AllocationMismatch`]: EngineError::AllocationMismatch
//!  [`PercentageMismatch`]: EngineError::PercentageMismatch
//!  [`MissingMethod`]: EngineError::MissingMethod
use sea_orm::DbErr;
use thiserror::Error;

use crate::{Money, Percent};

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    /// `difference` is `total - allocated`: positive means something is left
    /// to allocate, negative means the split is over-allocated.
    #[error("Split amounts do not match the total (difference: {difference})")]
    AllocationMismatch { difference: Money },
    /// `difference` is `100% - allocated`.
    #[error("Percentages must total 100% (difference: {difference}%)")]
    PercentageMismatch { difference: Percent },
    #[error("A payment method must be selected")]
    MissingMethod,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Corrupted record: {0}")]
    Corrupted(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` when the operation may succeed if simply retried.
    ///
    /// Only a timed-out or refused pool acquisition qualifies: the operation
    /// never reached the database, so nothing was written.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(DbErr::ConnectionAcquire(_)))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (
                Self::AllocationMismatch { difference: a },
                Self::AllocationMismatch { difference: b },
            ) => a == b,
            (
                Self::PercentageMismatch { difference: a },
                Self::PercentageMismatch { difference: b },
            ) => a == b,
            (Self::MissingMethod, Self::MissingMethod) => true,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::Corrupted(a), Self::Corrupted(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
