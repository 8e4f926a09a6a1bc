//! Delta synchronization of checksum trees.
//!
//! The host serves checksum objects out of a [`RootChecksumTreeNode`]
//! through an [`AssetSource`]. The peer runs a [`ChecksumSynchronizer`] that
//! walks down from the host's root checksum and requests only the objects
//! its local [`ObjectStore`] does not already hold, so unchanged sub-trees
//! are never transferred twice.
//!
//! [`RootChecksumTreeNode`]: chksync_tree::RootChecksumTreeNode
//! [`ObjectStore`]: chksync_store::ObjectStore

pub mod config;
pub mod error;
pub mod local;
pub mod negotiation;
pub mod source;
pub mod synchronizer;
pub mod transport;
pub mod types;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use local::LocalTransport;
pub use negotiation::NegotiationEngine;
pub use source::AssetSource;
pub use synchronizer::ChecksumSynchronizer;
pub use transport::RemoteTransport;
pub use types::{Negotiation, SyncReport, TransferStats};

#[cfg(test)]
mod testutil;
