//! Checksum tree for chksync.
//!
//! A [`RootChecksumTreeNode`] is built once per immutable snapshot. Callers
//! descend through [`ChecksumTreeNode`]s by domain key and ask the node at the
//! right scope for a checksum object, supplying a construction callback that
//! knows how to serialize the value. The tree only memoizes and checksums; it
//! never interprets domain values.
//!
//! # Guarantees
//!
//! - At most one construction runs per `(node, key, kind)`; every concurrent
//!   requester receives the same outcome.
//! - Completed results are never evicted or replaced. Failures are never
//!   cached.
//! - A requester that is cancelled only withdraws its own interest. The
//!   shared construction is cancelled once nobody is waiting for it.
//! - Sub-node lookup never suspends and never fails.

pub mod config;
pub mod error;
mod flight;
pub mod node;
pub mod root;

pub use config::TreeConfig;
pub use error::{TreeError, TreeResult};
pub use node::ChecksumTreeNode;
pub use root::RootChecksumTreeNode;
pub use tokio_util::sync::CancellationToken;
