use chksync_crypto::HasherError;
use chksync_types::Checksum;

/// Errors from checksum object and store operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The object's recorded checksum does not match its content.
    #[error("checksum mismatch: recorded {recorded}, computed {computed}")]
    ChecksumMismatch {
        recorded: Checksum,
        computed: Checksum,
    },

    /// Attempted to store an object with the null checksum.
    #[error("cannot store object with null checksum")]
    NullChecksum,

    /// Payload encoding or decoding failure.
    #[error(transparent)]
    Hasher(#[from] HasherError),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
