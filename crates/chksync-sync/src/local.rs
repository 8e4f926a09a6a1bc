use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chksync_store::ChecksumObject;
use chksync_types::Checksum;

use crate::error::SyncResult;
use crate::source::AssetSource;
use crate::transport::RemoteTransport;
use crate::types::TransferStats;

/// In-process transport that talks to an [`AssetSource`] directly.
pub struct LocalTransport<S> {
    source: Arc<AssetSource<S>>,
    requests: AtomicU64,
    objects_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl<S> LocalTransport<S> {
    pub fn new(source: Arc<AssetSource<S>>) -> Self {
        Self {
            source,
            requests: AtomicU64::new(0),
            objects_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> TransferStats {
        TransferStats {
            requests: self.requests.load(Ordering::Relaxed),
            objects_sent: self.objects_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> RemoteTransport for LocalTransport<S> {
    async fn root_checksum(&self) -> SyncResult<Checksum> {
        Ok(self.source.root())
    }

    async fn fetch_objects(&self, checksums: &[Checksum]) -> SyncResult<Vec<ChecksumObject>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let objects = self.source.get_many(checksums)?;
        let bytes: u64 = objects.iter().map(ChecksumObject::size).sum();
        self.objects_sent.fetch_add(objects.len() as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
        Ok(objects)
    }
}
