use async_trait::async_trait;
use chksync_store::ChecksumObject;
use chksync_types::Checksum;

use crate::error::SyncResult;

/// The peer's view of a host serving one checksum tree.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Checksum of the top-level object the host is offering.
    async fn root_checksum(&self) -> SyncResult<Checksum>;

    /// Fetch full objects, returned in request order.
    ///
    /// Fails with [`SyncError::UnknownChecksum`](crate::SyncError::UnknownChecksum)
    /// if the host cannot resolve one of them.
    async fn fetch_objects(&self, checksums: &[Checksum]) -> SyncResult<Vec<ChecksumObject>>;
}
