use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chksync_types::Checksum;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::object::ChecksumObject;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based checksum object store.
///
/// Objects are cheap to clone (payloads are shared `Bytes`), so reads hand
/// out clones.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<Checksum, ChecksumObject>>,
}

impl InMemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored objects.
    ///
    /// Fails with [`StoreError::LockPoisoned`] like every other accessor,
    /// rather than reporting an empty store.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_map()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_map()?.is_empty())
    }

    /// Total transmitted size across all stored objects.
    pub fn total_bytes(&self) -> StoreResult<u64> {
        Ok(self.read_map()?.values().map(ChecksumObject::size).sum())
    }

    /// Sorted list of every stored checksum.
    pub fn all_checksums(&self) -> StoreResult<Vec<Checksum>> {
        let mut checksums: Vec<Checksum> = self.read_map()?.keys().copied().collect();
        checksums.sort();
        Ok(checksums)
    }

    fn read_map(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<Checksum, ChecksumObject>>> {
        self.objects
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_map(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<Checksum, ChecksumObject>>> {
        self.objects
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, checksum: &Checksum) -> StoreResult<Option<ChecksumObject>> {
        Ok(self.read_map()?.get(checksum).cloned())
    }

    fn write(&self, object: &ChecksumObject) -> StoreResult<Checksum> {
        let checksum = object.checksum();
        if checksum.is_null() {
            return Err(StoreError::NullChecksum);
        }
        object.verify()?;
        let mut map = self.write_map()?;
        map.entry(checksum).or_insert_with(|| {
            trace!(checksum = %checksum.short_hex(), kind = %object.kind(), "stored object");
            object.clone()
        });
        Ok(checksum)
    }

    fn exists(&self, checksum: &Checksum) -> StoreResult<bool> {
        Ok(self.read_map()?.contains_key(checksum))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("InMemoryObjectStore");
        match self.read_map() {
            Ok(map) => debug.field("object_count", &map.len()),
            Err(_) => debug.field("object_count", &"<poisoned>"),
        };
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Asset, ChecksumObjectWithChildren};
    use chksync_types::Kind;

    fn text(content: &str) -> ChecksumObject {
        Asset::new(Kind::SOURCE_TEXT, content.as_bytes().to_vec()).into()
    }

    #[test]
    fn write_and_read_asset() {
        let store = InMemoryObjectStore::new();
        let obj = text("class C {}");
        let checksum = store.write(&obj).unwrap();
        assert_eq!(checksum, obj.checksum());
        assert_eq!(store.read(&checksum).unwrap(), Some(obj));
    }

    #[test]
    fn write_and_read_composite() {
        let store = InMemoryObjectStore::new();
        let leaf = text("x");
        let node: ChecksumObject =
            ChecksumObjectWithChildren::new(Kind::DOCUMENT_STATE, vec![leaf.checksum()]).into();
        let checksum = store.write(&node).unwrap();
        let back = store.read(&checksum).unwrap().expect("should exist");
        assert_eq!(back.child_checksums(), &[leaf.checksum()]);
    }

    #[test]
    fn write_is_idempotent() {
        let store = InMemoryObjectStore::new();
        let obj = text("same");
        assert_eq!(store.write(&obj).unwrap(), store.write(&obj).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn write_rejects_objects_that_do_not_verify() {
        let store = InMemoryObjectStore::new();
        let mut json = serde_json::to_value(text("original")).unwrap();
        json["Asset"]["payload"] = serde_json::to_value(b"forged".to_vec()).unwrap();
        let forged: ChecksumObject = serde_json::from_value(json).unwrap();

        assert!(matches!(
            store.write(&forged),
            Err(StoreError::ChecksumMismatch { .. })
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn missing_reports_unknown_checksums_in_order() {
        let store = InMemoryObjectStore::new();
        let known = store.write(&text("known")).unwrap();
        let a = Checksum::from_bytes(b"a");
        let b = Checksum::from_bytes(b"b");
        assert_eq!(store.missing(&[a, known, b]).unwrap(), vec![a, b]);
    }

    #[test]
    fn batch_operations() {
        let store = InMemoryObjectStore::new();
        let objects = vec![text("1"), text("2"), text("3")];
        let ids = store.write_batch(&objects).unwrap();
        assert_eq!(ids.len(), 3);

        let mut lookup = ids.clone();
        lookup.push(Checksum::from_bytes(b"absent"));
        let read = store.read_batch(&lookup).unwrap();
        assert!(read[..3].iter().all(Option::is_some));
        assert!(read[3].is_none());
    }

    #[test]
    fn all_checksums_is_sorted() {
        let store = InMemoryObjectStore::new();
        for content in ["c", "a", "b"] {
            store.write(&text(content)).unwrap();
        }
        let all = store.all_checksums().unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn total_bytes_sums_object_sizes() {
        let store = InMemoryObjectStore::new();
        let a = text("12345");
        let b = text("123456789");
        store.write(&a).unwrap();
        store.write(&b).unwrap();
        assert_eq!(store.total_bytes().unwrap(), a.size() + b.size());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryObjectStore::new());
        let checksum = store.write(&text("shared")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let obj = store.read(&checksum).unwrap().expect("present");
                    assert_eq!(obj.checksum(), checksum);
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn poisoned_lock_is_reported_by_every_accessor() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let store = InMemoryObjectStore::new();
        store.write(&text("x")).unwrap();
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.objects.write().unwrap();
            panic!("writer died holding the lock");
        }));

        assert!(matches!(store.len(), Err(StoreError::LockPoisoned(_))));
        assert!(matches!(store.is_empty(), Err(StoreError::LockPoisoned(_))));
        assert!(matches!(store.total_bytes(), Err(StoreError::LockPoisoned(_))));
        assert!(matches!(store.all_checksums(), Err(StoreError::LockPoisoned(_))));
        assert!(matches!(
            store.exists(&Checksum::from_bytes(b"x")),
            Err(StoreError::LockPoisoned(_))
        ));
        assert!(format!("{store:?}").contains("poisoned"));
    }

    #[test]
    fn debug_format() {
        let store = InMemoryObjectStore::new();
        store.write(&text("x")).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryObjectStore"));
        assert!(debug.contains("object_count"));
    }
}
