use chksync_types::{Checksum, Kind};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::hasher::{ChecksumHasher, HasherError};

/// Codec contract between domain values and payload bytes.
///
/// A serializer only chooses the bytes. Checksums are always derived from
/// those bytes by [`checksum_of_payload`] and [`checksum_of_children`], so two
/// serializers that agree on payload bytes agree on checksums, and every
/// object verifies against the same definition it was built with.
pub trait Serializer: Send + Sync {
    /// Encode `value` as the canonical payload for `kind`.
    fn serialize<T: Serialize>(&self, value: &T, kind: &Kind) -> Result<Vec<u8>, HasherError>;

    /// Decode a payload produced by [`Serializer::serialize`].
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8], kind: &Kind) -> Result<T, HasherError>;
}

/// Checksum of a serialized payload under `kind`.
pub fn checksum_of_payload(kind: &Kind, payload: &[u8]) -> Checksum {
    ChecksumHasher::asset(kind, payload)
}

/// Checksum of an ordered child list under `kind`.
pub fn checksum_of_children(kind: &Kind, children: &[Checksum]) -> Checksum {
    ChecksumHasher::children(kind, children)
}

/// JSON payload codec.
///
/// Canonical as long as the value's serde representation is deterministic:
/// structs, sequences, and `BTreeMap` are; `HashMap` is not.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T, kind: &Kind) -> Result<Vec<u8>, HasherError> {
        serde_json::to_vec(value).map_err(|e| HasherError::Serialization {
            kind: kind.clone(),
            reason: e.to_string(),
        })
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8], kind: &Kind) -> Result<T, HasherError> {
        serde_json::from_slice(bytes).map_err(|e| HasherError::Deserialization {
            kind: kind.clone(),
            reason: e.to_string(),
        })
    }
}
