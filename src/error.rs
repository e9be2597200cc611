use crate::normalizer::{FieldError, ValidationError};
use thiserror::Error;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Submitted data failed validation. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No stored item has this id.
    #[error("item {0} not found")]
    NotFound(i64),

    /// The store failed to begin, execute or commit; the transaction was rolled back.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("ledger connection lock poisoned")]
    LockPoisoned,
}

impl From<FieldError> for LedgerError {
    fn from(err: FieldError) -> Self {
        LedgerError::Validation(err.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
