use bytes::Bytes;
use chksync_crypto::{checksum_of_children, checksum_of_payload, Serializer};
use chksync_types::{Checksum, Kind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// Leaf checksum object: a serialized value with no children.
///
/// The payload is shared (`Bytes`), so cloning an asset never copies it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    checksum: Checksum,
    kind: Kind,
    payload: Bytes,
}

impl Asset {
    /// Build an asset from an already-serialized payload.
    pub fn new(kind: Kind, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = checksum_of_payload(&kind, &payload);
        Self {
            checksum,
            kind,
            payload,
        }
    }

    /// Serialize `value` with `serializer` and wrap it as an asset.
    pub fn from_value<S, T>(serializer: &S, kind: Kind, value: &T) -> StoreResult<Self>
    where
        S: Serializer,
        T: Serialize,
    {
        let payload = serializer.serialize(value, &kind)?;
        let checksum = checksum_of_payload(&kind, &payload);
        Ok(Self {
            checksum,
            kind,
            payload: Bytes::from(payload),
        })
    }

    /// Decode the payload back into a domain value.
    pub fn to_value<S, T>(&self, serializer: &S) -> StoreResult<T>
    where
        S: Serializer,
        T: DeserializeOwned,
    {
        Ok(serializer.deserialize(&self.payload, &self.kind)?)
    }

    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Recompute the checksum from content and compare.
    pub fn verify(&self) -> StoreResult<()> {
        let computed = checksum_of_payload(&self.kind, &self.payload);
        if computed != self.checksum {
            return Err(StoreError::ChecksumMismatch {
                recorded: self.checksum,
                computed,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChecksumObjectWithChildren
// ---------------------------------------------------------------------------

/// Composite checksum object: an ordered list of child checksums.
///
/// `checksum = f(kind, children)`; reordering children changes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumObjectWithChildren {
    checksum: Checksum,
    kind: Kind,
    children: Vec<Checksum>,
}

impl ChecksumObjectWithChildren {
    pub fn new(kind: Kind, children: Vec<Checksum>) -> Self {
        let checksum = checksum_of_children(&kind, &children);
        Self {
            checksum,
            kind,
            children,
        }
    }

    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn children(&self) -> &[Checksum] {
        &self.children
    }

    pub fn verify(&self) -> StoreResult<()> {
        let computed = checksum_of_children(&self.kind, &self.children);
        if computed != self.checksum {
            return Err(StoreError::ChecksumMismatch {
                recorded: self.checksum,
                computed,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChecksumObject
// ---------------------------------------------------------------------------

/// Either kind of checksum object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumObject {
    Asset(Asset),
    WithChildren(ChecksumObjectWithChildren),
}

impl ChecksumObject {
    pub fn checksum(&self) -> Checksum {
        match self {
            Self::Asset(asset) => asset.checksum(),
            Self::WithChildren(object) => object.checksum(),
        }
    }

    pub fn kind(&self) -> &Kind {
        match self {
            Self::Asset(asset) => asset.kind(),
            Self::WithChildren(object) => object.kind(),
        }
    }

    /// Child checksums; empty for assets.
    pub fn child_checksums(&self) -> &[Checksum] {
        match self {
            Self::Asset(_) => &[],
            Self::WithChildren(object) => object.children(),
        }
    }

    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            Self::Asset(asset) => Some(asset),
            Self::WithChildren(_) => None,
        }
    }

    pub fn as_with_children(&self) -> Option<&ChecksumObjectWithChildren> {
        match self {
            Self::Asset(_) => None,
            Self::WithChildren(object) => Some(object),
        }
    }

    pub fn is_asset(&self) -> bool {
        matches!(self, Self::Asset(_))
    }

    pub fn verify(&self) -> StoreResult<()> {
        match self {
            Self::Asset(asset) => asset.verify(),
            Self::WithChildren(object) => object.verify(),
        }
    }

    /// Approximate bytes needed to transmit this object.
    pub fn size(&self) -> u64 {
        let body = match self {
            Self::Asset(asset) => asset.payload().len(),
            Self::WithChildren(object) => object.children().len() * Checksum::LEN,
        };
        (Checksum::LEN + self.kind().as_str().len() + body) as u64
    }
}

impl From<Asset> for ChecksumObject {
    fn from(asset: Asset) -> Self {
        Self::Asset(asset)
    }
}

impl From<ChecksumObjectWithChildren> for ChecksumObject {
    fn from(object: ChecksumObjectWithChildren) -> Self {
        Self::WithChildren(object)
    }
}
