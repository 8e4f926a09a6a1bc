use chksync_types::{Checksum, Kind};

/// Domain-separated BLAKE3 checksum deriver.
///
/// Each hasher carries a domain tag that is prepended to every computation,
/// so an asset and a composite object built from identical bytes never share
/// a checksum. The kind is length-prefixed so `("ab", "c")` and `("a", "bc")`
/// stay distinct.
pub struct ChecksumHasher {
    domain: &'static str,
}

impl ChecksumHasher {
    /// Hasher for leaf assets: `(kind, payload)`.
    pub const ASSET: Self = Self {
        domain: "chksync-asset-v1",
    };
    /// Hasher for composite objects: `(kind, ordered children)`.
    pub const CHILDREN: Self = Self {
        domain: "chksync-children-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Checksum of a leaf payload under `kind`.
    pub fn asset(kind: &Kind, payload: &[u8]) -> Checksum {
        Self::ASSET.hash_parts(kind, |hasher| {
            hasher.update(&(payload.len() as u64).to_le_bytes());
            hasher.update(payload);
        })
    }

    /// Checksum of an ordered child list under `kind`.
    ///
    /// Order-sensitive: swapping two children yields a different checksum.
    pub fn children(kind: &Kind, children: &[Checksum]) -> Checksum {
        Self::CHILDREN.hash_parts(kind, |hasher| {
            hasher.update(&(children.len() as u64).to_le_bytes());
            for child in children {
                hasher.update(child.as_bytes());
            }
        })
    }

    /// Hash raw bytes with this hasher's domain and no kind.
    pub fn hash(&self, data: &[u8]) -> Checksum {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Checksum::from_hash(*hasher.finalize().as_bytes())
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn hash_parts(&self, kind: &Kind, body: impl FnOnce(&mut blake3::Hasher)) -> Checksum {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        let kind = kind.as_str().as_bytes();
        hasher.update(&(kind.len() as u64).to_le_bytes());
        hasher.update(kind);
        body(&mut hasher);
        Checksum::from_hash(*hasher.finalize().as_bytes())
    }
}

/// Errors from serializing or hashing domain values.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error for kind {kind}: {reason}")]
    Serialization { kind: Kind, reason: String },

    #[error("deserialization error for kind {kind}: {reason}")]
    Deserialization { kind: Kind, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf(seed: u8) -> Checksum {
        Checksum::from_bytes(&[seed])
    }

    #[test]
    fn asset_checksum_is_deterministic() {
        let a = ChecksumHasher::asset(&Kind::SOURCE_TEXT, b"class C {}");
        let b = ChecksumHasher::asset(&Kind::SOURCE_TEXT, b"class C {}");
        assert_eq!(a, b);
    }

    #[test]
    fn kind_is_part_of_the_checksum() {
        let text = ChecksumHasher::asset(&Kind::SOURCE_TEXT, b"same");
        let options = ChecksumHasher::asset(&Kind::PARSE_OPTIONS, b"same");
        assert_ne!(text, options);
    }

    #[test]
    fn kind_and_payload_boundary_is_unambiguous() {
        let k1 = Kind::new("ab").unwrap();
        let k2 = Kind::new("a").unwrap();
        assert_ne!(
            ChecksumHasher::asset(&k1, b"c"),
            ChecksumHasher::asset(&k2, b"bc")
        );
    }

    #[test]
    fn children_are_order_sensitive() {
        let forward = ChecksumHasher::children(&Kind::DOCUMENTS, &[leaf(1), leaf(2)]);
        let reversed = ChecksumHasher::children(&Kind::DOCUMENTS, &[leaf(2), leaf(1)]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn empty_children_still_hash() {
        let empty = ChecksumHasher::children(&Kind::PROJECTS, &[]);
        assert!(!empty.is_null());
        assert_ne!(empty, ChecksumHasher::children(&Kind::DOCUMENTS, &[]));
    }

    #[test]
    fn asset_and_children_domains_do_not_collide() {
        let child = leaf(5);
        let as_children = ChecksumHasher::children(&Kind::DOCUMENTS, &[child]);
        let mut payload = 1u64.to_le_bytes().to_vec();
        payload.extend_from_slice(child.as_bytes());
        let as_asset = ChecksumHasher::asset(&Kind::DOCUMENTS, &payload);
        assert_ne!(as_children, as_asset);
    }

    #[test]
    fn custom_domain_differs() {
        let custom = ChecksumHasher::new("my-domain-v1");
        assert_eq!(custom.domain(), "my-domain-v1");
        assert_ne!(custom.hash(b"data"), ChecksumHasher::ASSET.hash(b"data"));
    }

    proptest! {
        #[test]
        fn children_checksum_is_a_pure_function(seeds in proptest::collection::vec(any::<u8>(), 0..32)) {
            let children: Vec<Checksum> = seeds.iter().copied().map(leaf).collect();
            let again = children.clone();
            prop_assert_eq!(
                ChecksumHasher::children(&Kind::PROJECTS, &children),
                ChecksumHasher::children(&Kind::PROJECTS, &again)
            );
        }
    }
}
