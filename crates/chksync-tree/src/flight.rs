//! Shared in-flight constructions.
//!
//! A cache slot is either a completed object or an [`InFlight`] construction
//! with an interest count. Every requester holds an [`Interest`] guard while
//! it waits; the construction itself runs in a spawned task that owns a
//! [`Publisher`]. The count is only touched under the result-map lock, so
//! "attach" and "last detach" cannot interleave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chksync_store::ChecksumObject;
use chksync_types::{Kind, TreeKey};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{TreeError, TreeResult};

pub(crate) type SlotKey = (TreeKey, Kind);
pub(crate) type ResultMap = HashMap<SlotKey, Slot>;
pub(crate) type Outcome = Option<TreeResult<ChecksumObject>>;

static NEXT_FLIGHT: AtomicU64 = AtomicU64::new(1);

pub(crate) enum Slot {
    Completed(ChecksumObject),
    InFlight { flight: Arc<InFlight>, interest: usize },
}

impl Slot {
    fn is_flight(&self, id: u64) -> bool {
        matches!(self, Slot::InFlight { flight, .. } if flight.id == id)
    }
}

/// One running construction.
pub(crate) struct InFlight {
    pub(crate) id: u64,
    outcome: watch::Receiver<Outcome>,
    cancel: CancellationToken,
}

impl InFlight {
    pub(crate) fn new() -> (Arc<Self>, watch::Sender<Outcome>) {
        let (tx, rx) = watch::channel(None);
        let flight = Arc::new(Self {
            id: NEXT_FLIGHT.fetch_add(1, Ordering::Relaxed),
            outcome: rx,
            cancel: CancellationToken::new(),
        });
        (flight, tx)
    }

    /// Token handed to the construction; fires when interest drops to zero.
    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the shared outcome, or for `cancel` to fire.
    pub(crate) async fn wait(&self, cancel: &CancellationToken) -> TreeResult<ChecksumObject> {
        let mut rx = self.outcome.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(TreeError::Cancelled),
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(TreeError::Cancelled);
                    }
                }
            }
        }
    }
}

/// Lock the result map.
///
/// Every mutation of the map is a single insert or remove, so a map whose
/// lock was poisoned is still consistent.
pub(crate) fn lock(results: &Mutex<ResultMap>) -> MutexGuard<'_, ResultMap> {
    results.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A requester's claim on an in-flight construction.
///
/// Dropping the guard withdraws the claim. The last claim to go cancels the
/// construction and vacates the slot so a later request starts afresh.
pub(crate) struct Interest<'a> {
    results: &'a Mutex<ResultMap>,
    key: SlotKey,
    id: u64,
}

impl<'a> Interest<'a> {
    pub(crate) fn new(results: &'a Mutex<ResultMap>, key: SlotKey, id: u64) -> Self {
        Self { results, key, id }
    }
}

impl Drop for Interest<'_> {
    fn drop(&mut self) {
        let mut results = lock(self.results);
        let Some(Slot::InFlight { flight, interest }) = results.get_mut(&self.key) else {
            return;
        };
        if flight.id != self.id {
            return;
        }
        *interest -= 1;
        if *interest == 0 {
            flight.cancel.cancel();
            debug!(key = ?self.key.0, kind = %self.key.1, "construction abandoned");
            results.remove(&self.key);
        }
    }
}

/// Settles a construction's slot and wakes its waiters.
///
/// If the construction task is dropped or panics before publishing, the
/// slot is vacated and waiters receive a `ConstructionFailed`.
pub(crate) struct Publisher {
    results: Arc<Mutex<ResultMap>>,
    key: SlotKey,
    key_label: String,
    id: u64,
    tx: watch::Sender<Outcome>,
    published: bool,
}

impl Publisher {
    pub(crate) fn new(
        results: Arc<Mutex<ResultMap>>,
        key: SlotKey,
        key_label: String,
        id: u64,
        tx: watch::Sender<Outcome>,
    ) -> Self {
        Self {
            results,
            key,
            key_label,
            id,
            tx,
            published: false,
        }
    }

    pub(crate) fn key_label(&self) -> &str {
        &self.key_label
    }

    pub(crate) fn publish(mut self, outcome: TreeResult<ChecksumObject>) {
        self.published = true;
        self.settle(outcome);
    }

    fn settle(&self, outcome: TreeResult<ChecksumObject>) {
        {
            let mut results = lock(&self.results);
            if results.get(&self.key).is_some_and(|slot| slot.is_flight(self.id)) {
                match &outcome {
                    Ok(object) => {
                        results.insert(self.key.clone(), Slot::Completed(object.clone()));
                    }
                    Err(_) => {
                        results.remove(&self.key);
                    }
                }
            }
        }
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        if !self.published {
            self.settle(Err(TreeError::ConstructionFailed {
                key: self.key_label.clone(),
                kind: self.key.1.clone(),
                reason: "construction task ended without a result".into(),
            }));
        }
    }
}
