//! Checksum objects and checksum-addressed storage for chksync.
//!
//! # Object Types
//!
//! - [`Asset`] -- leaf object: checksum + kind + opaque payload
//! - [`ChecksumObjectWithChildren`] -- composite object: checksum + kind +
//!   ordered child checksums
//! - [`ChecksumObject`] -- tagged union of the two, the unit exchanged
//!   between processes
//!
//! # Storage
//!
//! [`ObjectStore`] is the peer-side checksum -> object cache. A peer asks the
//! store which checksums it is [`missing`](ObjectStore::missing) and requests
//! full payloads only for those.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once constructed.
//! 2. A checksum is always derived from content, never assigned.
//! 3. Stores verify checksums on write and never interpret payloads.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{Asset, ChecksumObject, ChecksumObjectWithChildren};
pub use traits::ObjectStore;
