use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chksync_store::{ChecksumObject, ObjectStore};
use chksync_types::Checksum;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::negotiation::NegotiationEngine;
use crate::transport::RemoteTransport;
use crate::types::SyncReport;

/// Peer side: pulls a host's checksum tree into a local [`ObjectStore`].
///
/// The walk starts at the host's root and descends level by level. An
/// object already in the store is taken to be complete together with all of
/// its descendants, so its sub-tree is skipped. To keep that true across
/// interrupted runs, received objects are written only after the whole walk
/// succeeded, and every object is written after all of its children.
pub struct ChecksumSynchronizer<St> {
    store: Arc<St>,
    config: SyncConfig,
}

impl<St: ObjectStore> ChecksumSynchronizer<St> {
    pub fn new(store: Arc<St>) -> Self {
        Self::with_config(store, SyncConfig::default())
    }

    pub fn with_config(store: Arc<St>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn synchronize(&self, transport: &dyn RemoteTransport) -> SyncResult<SyncReport> {
        let root = transport.root_checksum().await?;
        let mut report = SyncReport::new(root);
        let mut received: HashMap<Checksum, ChecksumObject> = HashMap::new();
        let mut seen: HashSet<Checksum> = HashSet::new();
        let mut frontier = vec![root];

        while !frontier.is_empty() {
            frontier.retain(|c| seen.insert(*c));
            let negotiation = NegotiationEngine::negotiate(&frontier, self.store.as_ref())?;
            report.objects_reused += negotiation.common.len();

            let mut next = Vec::new();
            for batch in negotiation.wants.chunks(self.config.batch_size.max(1)) {
                let objects = transport.fetch_objects(batch).await?;
                report.requests += 1;
                self.check_batch(batch, &objects)?;
                for object in objects {
                    report.objects_received += 1;
                    report.bytes_received += object.size();
                    next.extend_from_slice(object.child_checksums());
                    received.insert(object.checksum(), object);
                }
            }
            debug!(
                wanted = negotiation.wants.len(),
                reused = negotiation.common.len(),
                "synchronized tree level"
            );
            frontier = next;
        }

        for object in commit_order(root, &received) {
            self.store.write(object)?;
        }
        info!(
            root = %root.short_hex(),
            received = report.objects_received,
            reused = report.objects_reused,
            bytes = report.bytes_received,
            "synchronization complete"
        );
        Ok(report)
    }

    fn check_batch(&self, requested: &[Checksum], objects: &[ChecksumObject]) -> SyncResult<()> {
        let wanted: HashSet<&Checksum> = requested.iter().collect();
        let mut got = HashSet::with_capacity(objects.len());
        for object in objects {
            let checksum = object.checksum();
            if !wanted.contains(&checksum) {
                return Err(SyncError::UnexpectedObject(checksum));
            }
            if self.config.verify_objects {
                object.verify().map_err(|e| SyncError::VerificationFailed {
                    checksum,
                    reason: e.to_string(),
                })?;
            }
            if !got.insert(checksum) {
                return Err(SyncError::UnexpectedObject(checksum));
            }
        }
        match requested.iter().find(|c| !got.contains(*c)) {
            Some(absent) => Err(SyncError::MissingObject(*absent)),
            None => Ok(()),
        }
    }
}

/// Post-order over the received objects, starting at `root`.
///
/// Children that were not received are already in the store and are
/// skipped. A shared child is emitted once, before the first parent that
/// reaches it.
fn commit_order(root: Checksum, received: &HashMap<Checksum, ChecksumObject>) -> Vec<&ChecksumObject> {
    let mut order = Vec::with_capacity(received.len());
    let mut visited = HashSet::with_capacity(received.len());
    let mut stack = vec![(root, false)];

    while let Some((checksum, expanded)) = stack.pop() {
        let Some(object) = received.get(&checksum) else {
            continue;
        };
        if expanded {
            order.push(object);
            continue;
        }
        if !visited.insert(checksum) {
            continue;
        }
        stack.push((checksum, true));
        for child in object.child_checksums().iter().rev() {
            if !visited.contains(child) {
                stack.push((*child, false));
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalTransport;
    use crate::source::AssetSource;
    use crate::testutil::{build_host, Host};
    use async_trait::async_trait;
    use chksync_store::{Asset, ChecksumObjectWithChildren, InMemoryObjectStore, StoreResult};
    use chksync_types::Kind;
    use std::sync::Mutex;

    fn transport(host: &Host) -> LocalTransport<crate::testutil::Files> {
        let source = AssetSource::new(Arc::clone(&host.tree), host.root).unwrap();
        LocalTransport::new(Arc::new(source))
    }

    #[tokio::test]
    async fn first_sync_transfers_everything() {
        let host = build_host(&[("a.cs", "class A {}"), ("b.cs", "class B {}")]).await;
        let store = Arc::new(InMemoryObjectStore::new());
        let sync = ChecksumSynchronizer::new(Arc::clone(&store));

        let report = sync.synchronize(&transport(&host)).await.unwrap();
        assert_eq!(report.root, host.root);
        assert_eq!(report.objects_received, 3);
        assert_eq!(report.objects_reused, 0);
        assert_eq!(store.len().unwrap(), 3);
        assert!(store.exists(&host.root).unwrap());
    }

    #[tokio::test]
    async fn second_sync_of_same_tree_is_up_to_date() {
        let host = build_host(&[("a.cs", "class A {}")]).await;
        let store = Arc::new(InMemoryObjectStore::new());
        let sync = ChecksumSynchronizer::new(Arc::clone(&store));
        sync.synchronize(&transport(&host)).await.unwrap();

        let t = transport(&host);
        let report = sync.synchronize(&t).await.unwrap();
        assert!(report.is_up_to_date());
        assert_eq!(report.objects_reused, 1);
        assert_eq!(t.stats().requests, 0);
    }

    #[tokio::test]
    async fn edit_transfers_only_changed_objects() {
        let before = build_host(&[("a.cs", "class A {}"), ("b.cs", "class B {}")]).await;
        let after = build_host(&[("a.cs", "class A {}"), ("b.cs", "class B { int x; }")]).await;
        let store = Arc::new(InMemoryObjectStore::new());
        let sync = ChecksumSynchronizer::new(Arc::clone(&store));
        sync.synchronize(&transport(&before)).await.unwrap();

        let report = sync.synchronize(&transport(&after)).await.unwrap();
        // New root and the edited document; a.cs is reused.
        assert_eq!(report.objects_received, 2);
        assert_eq!(report.objects_reused, 1);
        assert_eq!(store.len().unwrap(), 5);
    }

    #[tokio::test]
    async fn small_batches_split_requests() {
        let host = build_host(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5")]).await;
        let store = Arc::new(InMemoryObjectStore::new());
        let config = SyncConfig {
            batch_size: 2,
            verify_objects: true,
        };
        let sync = ChecksumSynchronizer::with_config(store, config);
        let report = sync.synchronize(&transport(&host)).await.unwrap();
        // One request for the root, then ceil(5 / 2) for the documents.
        assert_eq!(report.requests, 4);
        assert_eq!(report.objects_received, 6);
    }

    #[tokio::test]
    async fn duplicate_children_are_fetched_once() {
        let host = build_host(&[("a.cs", "same"), ("b.cs", "same")]).await;
        let store = Arc::new(InMemoryObjectStore::new());
        let report = ChecksumSynchronizer::new(Arc::clone(&store))
            .synchronize(&transport(&host))
            .await
            .unwrap();
        assert_eq!(report.objects_received, 2);
        assert_eq!(store.len().unwrap(), 2);
    }

    /// Answers every request with a fixed, unrelated object.
    struct Liar {
        root: Checksum,
        reply: ChecksumObject,
    }

    #[async_trait]
    impl RemoteTransport for Liar {
        async fn root_checksum(&self) -> SyncResult<Checksum> {
            Ok(self.root)
        }

        async fn fetch_objects(&self, _checksums: &[Checksum]) -> SyncResult<Vec<ChecksumObject>> {
            Ok(vec![self.reply.clone()])
        }
    }

    #[tokio::test]
    async fn unrequested_object_is_rejected_and_nothing_is_stored() {
        let liar = Liar {
            root: Checksum::from_bytes(b"root"),
            reply: Asset::new(Kind::SOURCE_TEXT, &b"other"[..]).into(),
        };
        let store = Arc::new(InMemoryObjectStore::new());
        let result = ChecksumSynchronizer::new(Arc::clone(&store))
            .synchronize(&liar)
            .await;
        assert!(matches!(result, Err(SyncError::UnexpectedObject(_))));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn forged_object_fails_verification() {
        let genuine: ChecksumObject = Asset::new(Kind::SOURCE_TEXT, &b"genuine"[..]).into();
        let mut json = serde_json::to_value(&genuine).unwrap();
        json["Asset"]["payload"] = serde_json::to_value(b"forged".to_vec()).unwrap();
        let forged: ChecksumObject = serde_json::from_value(json).unwrap();

        let liar = Liar {
            root: genuine.checksum(),
            reply: forged,
        };
        let store = Arc::new(InMemoryObjectStore::new());
        let result = ChecksumSynchronizer::new(Arc::clone(&store))
            .synchronize(&liar)
            .await;
        assert!(matches!(
            result,
            Err(SyncError::VerificationFailed { checksum, .. }) if checksum == genuine.checksum()
        ));
        assert!(store.is_empty().unwrap());
    }

    /// Serves the root but nothing below it.
    struct Truncated {
        inner: LocalTransport<crate::testutil::Files>,
        root: Checksum,
    }

    #[async_trait]
    impl RemoteTransport for Truncated {
        async fn root_checksum(&self) -> SyncResult<Checksum> {
            Ok(self.root)
        }

        async fn fetch_objects(&self, checksums: &[Checksum]) -> SyncResult<Vec<ChecksumObject>> {
            if checksums == [self.root] {
                self.inner.fetch_objects(checksums).await
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn interrupted_sync_leaves_store_untouched() {
        let host = build_host(&[("a.cs", "class A {}")]).await;
        let truncated = Truncated {
            inner: transport(&host),
            root: host.root,
        };
        let store = Arc::new(InMemoryObjectStore::new());
        let sync = ChecksumSynchronizer::new(Arc::clone(&store));

        let result = sync.synchronize(&truncated).await;
        assert!(matches!(result, Err(SyncError::MissingObject(_))));
        assert!(store.is_empty().unwrap());

        // A later complete run still transfers the whole tree.
        let report = sync.synchronize(&transport(&host)).await.unwrap();
        assert_eq!(report.objects_received, 2);
    }

    /// Serves a fixed set of objects and may repeat every reply.
    struct Canned {
        root: Checksum,
        objects: HashMap<Checksum, ChecksumObject>,
        repeat: bool,
    }

    impl Canned {
        fn new(root: &ChecksumObject, rest: &[&ChecksumObject]) -> Self {
            let objects = std::iter::once(root)
                .chain(rest.iter().copied())
                .map(|o| (o.checksum(), o.clone()))
                .collect();
            Self {
                root: root.checksum(),
                objects,
                repeat: false,
            }
        }
    }

    #[async_trait]
    impl RemoteTransport for Canned {
        async fn root_checksum(&self) -> SyncResult<Checksum> {
            Ok(self.root)
        }

        async fn fetch_objects(&self, checksums: &[Checksum]) -> SyncResult<Vec<ChecksumObject>> {
            let mut objects = Vec::new();
            for checksum in checksums {
                let object = self
                    .objects
                    .get(checksum)
                    .ok_or(SyncError::UnknownChecksum(*checksum))?;
                objects.push(object.clone());
                if self.repeat {
                    objects.push(object.clone());
                }
            }
            Ok(objects)
        }
    }

    /// Records the order of writes into an inner store.
    #[derive(Default)]
    struct Recording {
        inner: InMemoryObjectStore,
        writes: Mutex<Vec<Checksum>>,
    }

    impl ObjectStore for Recording {
        fn read(&self, checksum: &Checksum) -> StoreResult<Option<ChecksumObject>> {
            self.inner.read(checksum)
        }

        fn write(&self, object: &ChecksumObject) -> StoreResult<Checksum> {
            self.writes.lock().unwrap().push(object.checksum());
            self.inner.write(object)
        }

        fn exists(&self, checksum: &Checksum) -> StoreResult<bool> {
            self.inner.exists(checksum)
        }
    }

    fn composite(kind: Kind, children: &[&ChecksumObject]) -> ChecksumObject {
        ChecksumObjectWithChildren::new(kind, children.iter().map(|c| c.checksum()).collect()).into()
    }

    #[tokio::test]
    async fn composites_are_written_after_their_descendants() {
        // The leaf sits one level below the root and again three levels
        // below it, so a level-by-level order would write `b` first.
        let leaf: ChecksumObject = Asset::new(Kind::SOURCE_TEXT, &b"shared"[..]).into();
        let b = composite(Kind::DOCUMENT_STATE, &[&leaf]);
        let a = composite(Kind::DOCUMENTS, &[&b]);
        let root = composite(Kind::PROJECT_STATE, &[&a, &leaf]);
        let host = Canned::new(&root, &[&a, &b, &leaf]);

        let store = Arc::new(Recording::default());
        let report = ChecksumSynchronizer::new(Arc::clone(&store))
            .synchronize(&host)
            .await
            .unwrap();
        assert_eq!(report.objects_received, 4);

        let writes = store.writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 4);
        let position = |c: Checksum| writes.iter().position(|w| *w == c).unwrap();
        for parent in [&root, &a, &b] {
            for child in parent.child_checksums() {
                assert!(position(*child) < position(parent.checksum()));
            }
        }
        assert_eq!(writes.last(), Some(&root.checksum()));
    }

    #[tokio::test]
    async fn repeated_object_in_a_reply_is_rejected() {
        let leaf: ChecksumObject = Asset::new(Kind::SOURCE_TEXT, &b"once"[..]).into();
        let root = composite(Kind::DOCUMENTS, &[&leaf]);
        let mut host = Canned::new(&root, &[&leaf]);
        host.repeat = true;

        let store = Arc::new(InMemoryObjectStore::new());
        let result = ChecksumSynchronizer::new(Arc::clone(&store))
            .synchronize(&host)
            .await;
        assert!(matches!(
            result,
            Err(SyncError::UnexpectedObject(checksum)) if checksum == root.checksum()
        ));
        assert!(store.is_empty().unwrap());
    }
}
