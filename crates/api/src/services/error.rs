//! Error type shared by the profile, catalog and order services.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationError;

/// Errors from marketplace operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The addressed document does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller may not act on the document.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The request broke a document rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation clashes with existing state.
    #[error("{0}")]
    Conflict(String),

    /// A multi-document write failed part way and was undone.
    #[error("{0}")]
    RolledBack(&'static str),

    /// Store failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Shorthand for a validation failure with a custom message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError(message.into()))
    }
}

/// Attempts made for a read-modify-write before a stale write is surfaced.
pub const MAX_ATTEMPTS: u32 = 3;

/// Whether a failed write made on `attempt` should be retried from a fresh read.
#[must_use]
pub fn should_retry(err: &RepositoryError, attempt: u32) -> bool {
    if matches!(err, RepositoryError::Stale) && attempt < MAX_ATTEMPTS {
        tracing::debug!(attempt, "stale write, retrying");
        return true;
    }
    false
}
