use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use chksync_store::{Asset, ChecksumObject, ChecksumObjectWithChildren};
use chksync_types::{Checksum, Kind, TreeKey};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::TreeConfig;
use crate::error::{TreeError, TreeResult};
use crate::flight::{lock, InFlight, Interest, Outcome, Publisher, ResultMap, Slot, SlotKey};

/// Memoizing cache for one level of the checksum hierarchy.
///
/// Holds two add-only maps: key -> sub-node, and (key, kind) -> result. A
/// node lives as long as its parent; the whole tree is dropped together when
/// its snapshot is superseded.
pub struct ChecksumTreeNode {
    children: RwLock<HashMap<TreeKey, Arc<ChecksumTreeNode>>>,
    results: Arc<Mutex<ResultMap>>,
    config: Arc<TreeConfig>,
}

enum Registration {
    Completed(ChecksumObject),
    Attached(Arc<InFlight>),
    Started(Arc<InFlight>, watch::Sender<Outcome>),
}

impl ChecksumTreeNode {
    pub(crate) fn with_config(config: Arc<TreeConfig>) -> Self {
        Self {
            children: RwLock::new(HashMap::new()),
            results: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Return the sub-node for `key`, creating an empty one on first use.
    ///
    /// Equal keys always yield the same node instance. Never suspends.
    pub fn get_or_create_sub_tree_node<K>(&self, key: K) -> Arc<ChecksumTreeNode>
    where
        K: Hash + Eq + fmt::Debug + Send + Sync + 'static,
    {
        let key = TreeKey::new(key);
        {
            let children = self.children.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(node) = children.get(&key) {
                return Arc::clone(node);
            }
        }
        let mut children = self.children.write().unwrap_or_else(PoisonError::into_inner);
        let node = children.entry(key).or_insert_with_key(|key| {
            trace!(?key, "created sub-tree node");
            Arc::new(ChecksumTreeNode::with_config(Arc::clone(&self.config)))
        });
        Arc::clone(node)
    }

    /// Get or build the composite object for `(key, kind)`.
    ///
    /// On a miss, `construct(key, value, kind, token)` is called exactly once
    /// and its future runs detached from this caller; concurrent requesters
    /// for the same `(key, kind)` wait on that one construction. `token` fires
    /// when every requester has been cancelled.
    pub async fn get_or_create_checksum_object_with_children<K, V, F, Fut, E>(
        &self,
        key: K,
        value: V,
        kind: Kind,
        construct: F,
        cancel: &CancellationToken,
    ) -> TreeResult<ChecksumObjectWithChildren>
    where
        K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
        F: FnOnce(K, V, Kind, CancellationToken) -> Fut,
        Fut: Future<Output = Result<ChecksumObjectWithChildren, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        match self.get_or_create(key, value, kind, construct, cancel).await? {
            ChecksumObject::WithChildren(object) => Ok(object),
            ChecksumObject::Asset(asset) => Err(TreeError::InvariantViolation(format!(
                "slot {} holds an asset, not an object with children",
                asset.kind()
            ))),
        }
    }

    /// Get or build the leaf asset for `(key, kind)`.
    ///
    /// Same memoization contract as
    /// [`get_or_create_checksum_object_with_children`](Self::get_or_create_checksum_object_with_children).
    pub async fn get_or_create_asset<K, V, F, Fut, E>(
        &self,
        key: K,
        value: V,
        kind: Kind,
        construct: F,
        cancel: &CancellationToken,
    ) -> TreeResult<Asset>
    where
        K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
        F: FnOnce(K, V, Kind, CancellationToken) -> Fut,
        Fut: Future<Output = Result<Asset, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        match self.get_or_create(key, value, kind, construct, cancel).await? {
            ChecksumObject::Asset(asset) => Ok(asset),
            ChecksumObject::WithChildren(object) => Err(TreeError::InvariantViolation(format!(
                "slot {} holds an object with children, not an asset",
                object.kind()
            ))),
        }
    }

    async fn get_or_create<K, V, F, Fut, T, E>(
        &self,
        key: K,
        value: V,
        kind: Kind,
        construct: F,
        cancel: &CancellationToken,
    ) -> TreeResult<ChecksumObject>
    where
        K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
        F: FnOnce(K, V, Kind, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Into<ChecksumObject> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }

        let slot_key: SlotKey = (TreeKey::new(key.clone()), kind.clone());
        let flight = match self.register(&slot_key) {
            Registration::Completed(object) => {
                trace!(?key, %kind, checksum = %object.checksum().short_hex(), "cache hit");
                return Ok(object);
            }
            Registration::Attached(flight) => {
                trace!(?key, %kind, "joined in-flight construction");
                flight
            }
            Registration::Started(flight, tx) => {
                debug!(?key, %kind, "starting construction");
                // Dropped by an unwinding `construct`, which vacates the slot.
                let publisher = Publisher::new(
                    Arc::clone(&self.results),
                    slot_key.clone(),
                    format!("{key:?}"),
                    flight.id,
                    tx,
                );
                let fut = construct(key, value, kind.clone(), flight.token());
                self.spawn_construction(fut, kind, flight.token(), publisher);
                flight
            }
        };

        let _interest = Interest::new(&self.results, slot_key, flight.id);
        flight.wait(cancel).await
    }

    /// Check-then-insert under the result-map lock.
    fn register(&self, slot_key: &SlotKey) -> Registration {
        let mut results = lock(&self.results);
        match results.get_mut(slot_key) {
            Some(Slot::Completed(object)) => Registration::Completed(object.clone()),
            Some(Slot::InFlight { flight, interest }) => {
                *interest += 1;
                Registration::Attached(Arc::clone(flight))
            }
            None => {
                let (flight, tx) = InFlight::new();
                results.insert(
                    slot_key.clone(),
                    Slot::InFlight {
                        flight: Arc::clone(&flight),
                        interest: 1,
                    },
                );
                Registration::Started(flight, tx)
            }
        }
    }

    fn spawn_construction<Fut, T, E>(
        &self,
        fut: Fut,
        kind: Kind,
        token: CancellationToken,
        publisher: Publisher,
    ) where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Into<ChecksumObject> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let slow_after = self.config.slow_construction_threshold();
        let verify = self.config.verify_constructed;
        tokio::spawn(async move {
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                () = token.cancelled() => None,
                result = fut => Some(result.map(Into::into)),
            };
            let outcome = match result {
                None => Err(TreeError::Cancelled),
                Some(Ok(object)) => check_constructed(object, &kind, verify),
                Some(Err(e)) => Err(TreeError::ConstructionFailed {
                    key: publisher.key_label().to_string(),
                    kind: kind.clone(),
                    reason: e.to_string(),
                }),
            };

            let elapsed = started.elapsed();
            match &outcome {
                Ok(object) => {
                    debug!(%kind, checksum = %object.checksum().short_hex(), ?elapsed, "construction finished");
                }
                Err(TreeError::Cancelled) => debug!(%kind, "construction cancelled"),
                Err(e) => warn!(%kind, error = %e, "construction failed"),
            }
            if slow_after.is_some_and(|limit| elapsed > limit) {
                warn!(%kind, ?elapsed, "slow construction");
            }
            publisher.publish(outcome);
        });
    }

    /// Find a completed object by checksum in this node or any descendant.
    pub fn find(&self, checksum: &Checksum) -> Option<ChecksumObject> {
        {
            let results = lock(&self.results);
            let hit = results.values().find_map(|slot| match slot {
                Slot::Completed(object) if object.checksum() == *checksum => Some(object.clone()),
                _ => None,
            });
            if hit.is_some() {
                return hit;
            }
        }
        self.sub_nodes().iter().find_map(|node| node.find(checksum))
    }

    /// Resolve a batch of checksums; absent entries are `None`.
    pub fn find_many(&self, checksums: &[Checksum]) -> Vec<Option<ChecksumObject>> {
        checksums.iter().map(|c| self.find(c)).collect()
    }

    pub fn child_count(&self) -> usize {
        self.children.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Completed results held directly by this node.
    pub fn result_count(&self) -> usize {
        lock(&self.results)
            .values()
            .filter(|slot| matches!(slot, Slot::Completed(_)))
            .count()
    }

    /// Constructions currently running for this node.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.results)
            .values()
            .filter(|slot| matches!(slot, Slot::InFlight { .. }))
            .count()
    }

    fn sub_nodes(&self) -> Vec<Arc<ChecksumTreeNode>> {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn interest<K>(&self, key: K, kind: &Kind) -> usize
    where
        K: Hash + Eq + fmt::Debug + Send + Sync + 'static,
    {
        match lock(&self.results).get(&(TreeKey::new(key), kind.clone())) {
            Some(Slot::InFlight { interest, .. }) => *interest,
            _ => 0,
        }
    }
}

impl fmt::Debug for ChecksumTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecksumTreeNode")
            .field("children", &self.child_count())
            .field("results", &self.result_count())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

fn check_constructed(object: ChecksumObject, kind: &Kind, verify: bool) -> TreeResult<ChecksumObject> {
    if object.kind() != kind {
        return Err(TreeError::InvariantViolation(format!(
            "construction for kind {kind} produced an object of kind {}",
            object.kind()
        )));
    }
    if verify {
        object.verify()?;
    }
    Ok(object)
}
