use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};

use chksync_store::{Asset, ChecksumObject};
use chksync_types::Checksum;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::TreeConfig;
use crate::error::{TreeError, TreeResult};
use crate::node::ChecksumTreeNode;

/// The top of a checksum tree, bound to one immutable snapshot.
///
/// Derefs to its [`ChecksumTreeNode`], so callers descend from it directly.
/// Besides the key hierarchy it keeps a bag of additional assets that are
/// addressable only by checksum, for content with no natural key path.
pub struct RootChecksumTreeNode<S> {
    snapshot: Arc<S>,
    node: ChecksumTreeNode,
    additional_assets: RwLock<HashMap<Checksum, Asset>>,
}

impl<S> RootChecksumTreeNode<S> {
    /// Create an empty tree for `snapshot` with the default [`TreeConfig`].
    pub fn new(snapshot: Arc<S>) -> Self {
        Self::with_config(snapshot, TreeConfig::default())
    }

    /// Create an empty tree for `snapshot`. Every node below the root
    /// shares `config`.
    pub fn with_config(snapshot: Arc<S>, config: TreeConfig) -> Self {
        Self {
            snapshot,
            node: ChecksumTreeNode::with_config(Arc::new(config)),
            additional_assets: RwLock::new(HashMap::new()),
        }
    }

    /// The snapshot this tree was built for.
    pub fn snapshot(&self) -> &Arc<S> {
        &self.snapshot
    }

    /// The root node of the key hierarchy.
    pub fn node(&self) -> &ChecksumTreeNode {
        &self.node
    }

    /// Register an asset that has no key path.
    ///
    /// De-duplicated by checksum: returns `false` when an asset with the
    /// same checksum is already registered, which leaves the first one in
    /// place. Assets whose checksum does not match their content are
    /// rejected.
    pub fn add_additional_asset(&self, asset: Asset, cancel: &CancellationToken) -> TreeResult<bool> {
        if cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }
        asset.verify()?;

        let checksum = asset.checksum();
        let mut assets = self
            .additional_assets
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if assets.contains_key(&checksum) {
            return Ok(false);
        }
        debug!(checksum = %checksum.short_hex(), kind = %asset.kind(), "added additional asset");
        assets.insert(checksum, asset);
        Ok(true)
    }

    /// An additional asset by checksum. Keyed nodes are not searched; use
    /// [`find`](Self::find) for that.
    pub fn additional_asset(&self, checksum: &Checksum) -> Option<Asset> {
        self.additional_assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(checksum)
            .cloned()
    }

    pub fn additional_asset_count(&self) -> usize {
        self.additional_assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Resolve a checksum anywhere in this tree, additional assets first.
    pub fn find(&self, checksum: &Checksum) -> Option<ChecksumObject> {
        self.additional_asset(checksum)
            .map(ChecksumObject::Asset)
            .or_else(|| self.node.find(checksum))
    }

    pub fn find_many(&self, checksums: &[Checksum]) -> Vec<Option<ChecksumObject>> {
        checksums.iter().map(|c| self.find(c)).collect()
    }
}

impl<S> Deref for RootChecksumTreeNode<S> {
    type Target = ChecksumTreeNode;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

impl<S> fmt::Debug for RootChecksumTreeNode<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootChecksumTreeNode")
            .field("node", &self.node)
            .field("additional_assets", &self.additional_asset_count())
            .finish()
    }
}
