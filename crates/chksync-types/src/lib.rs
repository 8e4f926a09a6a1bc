//! Foundation types for chksync.
//!
//! Every other chksync crate depends on `chksync-types`.
//!
//! # Key Types
//!
//! - [`Checksum`] -- Content-derived identifier (BLAKE3 hash), the only
//!   identity that crosses a process boundary
//! - [`Kind`] -- Discriminator between serialized representations of one key
//! - [`TreeKey`] -- Type-erased, hashable domain key used to scope tree nodes

pub mod checksum;
pub mod error;
pub mod key;
pub mod kind;

pub use checksum::Checksum;
pub use error::TypeError;
pub use key::TreeKey;
pub use kind::Kind;
