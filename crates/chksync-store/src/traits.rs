use chksync_types::Checksum;

use crate::error::StoreResult;
use crate::object::ChecksumObject;

/// Checksum-addressed object cache held by a synchronizing peer.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written; the same checksum always maps to
///   the same content.
/// - A write verifies the object's checksum before storing it.
/// - Concurrent reads are always safe.
pub trait ObjectStore: Send + Sync {
    /// Read an object by checksum. `Ok(None)` if absent.
    fn read(&self, checksum: &Checksum) -> StoreResult<Option<ChecksumObject>>;

    /// Verify and write an object, returning its checksum.
    ///
    /// Writing an object that is already present is a no-op.
    fn write(&self, object: &ChecksumObject) -> StoreResult<Checksum>;

    fn exists(&self, checksum: &Checksum) -> StoreResult<bool>;

    fn read_batch(&self, checksums: &[Checksum]) -> StoreResult<Vec<Option<ChecksumObject>>> {
        checksums.iter().map(|c| self.read(c)).collect()
    }

    fn write_batch(&self, objects: &[ChecksumObject]) -> StoreResult<Vec<Checksum>> {
        objects.iter().map(|obj| self.write(obj)).collect()
    }

    /// The subset of `checksums` this store does not hold, in input order.
    fn missing(&self, checksums: &[Checksum]) -> StoreResult<Vec<Checksum>> {
        let mut missing = Vec::new();
        for checksum in checksums {
            if !self.exists(checksum)? {
                missing.push(*checksum);
            }
        }
        Ok(missing)
    }
}
