use chksync_store::StoreError;
use chksync_types::Kind;
use thiserror::Error;

/// Errors from checksum tree operations.
///
/// `Clone` so every waiter on a shared construction receives an identical
/// copy of its outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    /// The caller's token fired, or the shared construction was abandoned.
    /// Never cached; safe to retry.
    #[error("operation cancelled")]
    Cancelled,

    /// The construction callback failed. Never cached.
    #[error("construction of {kind} for {key} failed: {reason}")]
    ConstructionFailed {
        key: String,
        kind: Kind,
        reason: String,
    },

    /// Caller misuse. Retrying with the same inputs fails the same way.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type TreeResult<T> = Result<T, TreeError>;

impl TreeError {
    /// Whether a fresh call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled | Self::ConstructionFailed { .. })
    }
}
