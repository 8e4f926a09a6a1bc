//! Checksum derivation for chksync.
//!
//! Provides domain-separated BLAKE3 checksums for leaf payloads and ordered
//! child lists, plus the [`Serializer`] contract that turns domain values into
//! payload bytes. Checksums depend only on `(kind, payload)` or
//! `(kind, children)`, never on time, process, or construction order.

pub mod hasher;
pub mod serializer;

pub use hasher::{ChecksumHasher, HasherError};
pub use serializer::{checksum_of_children, checksum_of_payload, JsonSerializer, Serializer};
