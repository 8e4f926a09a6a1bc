use std::collections::HashSet;

use chksync_store::ObjectStore;
use chksync_types::Checksum;

use crate::error::SyncResult;
use crate::types::Negotiation;

/// Decides which offered checksums need to be transferred.
pub struct NegotiationEngine;

impl NegotiationEngine {
    /// Offered checksums the store does not hold, first occurrence only.
    pub fn compute_wants(offered: &[Checksum], store: &dyn ObjectStore) -> SyncResult<Vec<Checksum>> {
        Ok(Self::negotiate(offered, store)?.wants)
    }

    pub fn negotiate(offered: &[Checksum], store: &dyn ObjectStore) -> SyncResult<Negotiation> {
        let mut seen = HashSet::with_capacity(offered.len());
        let unique: Vec<Checksum> = offered.iter().copied().filter(|c| seen.insert(*c)).collect();

        let wants = store.missing(&unique)?;
        let missing: HashSet<&Checksum> = wants.iter().collect();
        let common = unique.iter().filter(|c| !missing.contains(c)).copied().collect();
        Ok(Negotiation { wants, common })
    }
}
