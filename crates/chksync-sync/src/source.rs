use std::sync::Arc;

use chksync_store::ChecksumObject;
use chksync_tree::RootChecksumTreeNode;
use chksync_types::Checksum;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Host side: serves objects out of a built checksum tree.
pub struct AssetSource<S> {
    tree: Arc<RootChecksumTreeNode<S>>,
    root: Checksum,
}

impl<S> AssetSource<S> {
    /// `root` must already be a completed object somewhere in `tree`.
    pub fn new(tree: Arc<RootChecksumTreeNode<S>>, root: Checksum) -> SyncResult<Self> {
        if tree.find(&root).is_none() {
            return Err(SyncError::UnknownChecksum(root));
        }
        Ok(Self { tree, root })
    }

    pub fn root(&self) -> Checksum {
        self.root
    }

    pub fn tree(&self) -> &Arc<RootChecksumTreeNode<S>> {
        &self.tree
    }

    pub fn get(&self, checksum: &Checksum) -> SyncResult<ChecksumObject> {
        self.tree
            .find(checksum)
            .ok_or(SyncError::UnknownChecksum(*checksum))
    }

    pub fn get_many(&self, checksums: &[Checksum]) -> SyncResult<Vec<ChecksumObject>> {
        let objects = checksums
            .iter()
            .map(|c| self.get(c))
            .collect::<SyncResult<Vec<_>>>()?;
        debug!(count = objects.len(), "served objects");
        Ok(objects)
    }
}
