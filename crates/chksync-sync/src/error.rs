use chksync_store::StoreError;
use chksync_tree::TreeError;
use chksync_types::Checksum;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("host does not know checksum {0}")]
    UnknownChecksum(Checksum),

    #[error("host did not return requested object {0}")]
    MissingObject(Checksum),

    #[error("host sent unrequested object {0}")]
    UnexpectedObject(Checksum),

    #[error("object {checksum} failed verification: {reason}")]
    VerificationFailed { checksum: Checksum, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

pub type SyncResult<T> = Result<T, SyncError>;
