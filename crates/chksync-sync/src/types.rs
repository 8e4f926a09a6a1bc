use chksync_types::Checksum;
use serde::{Deserialize, Serialize};

/// Outcome of comparing the checksums a host offers against a local store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Negotiation {
    /// Offered checksums the local store lacks, in offer order.
    pub wants: Vec<Checksum>,
    /// Offered checksums the local store already holds.
    pub common: Vec<Checksum>,
}

impl Negotiation {
    pub fn is_up_to_date(&self) -> bool {
        self.wants.is_empty()
    }
}

/// Summary of one synchronization run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub root: Checksum,
    pub objects_received: usize,
    pub bytes_received: u64,
    /// Objects found in the local store and therefore not requested.
    pub objects_reused: usize,
    /// Number of `fetch_objects` round trips.
    pub requests: usize,
}

impl SyncReport {
    pub fn new(root: Checksum) -> Self {
        Self {
            root,
            objects_received: 0,
            bytes_received: 0,
            objects_reused: 0,
            requests: 0,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.objects_received == 0
    }
}

/// Counters kept by a transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub requests: u64,
    pub objects_sent: u64,
    pub bytes_sent: u64,
}
