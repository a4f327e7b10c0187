//! At-most-once construction of attestation templates.
//!
//! Building an `AttestationData` touches the head snapshot and the committee
//! cache; under load every member of a committee asks for the same template
//! within a second. The cache collapses those into a single build per
//! `(slot, committee_index)` fingerprint: the first caller builds, concurrent
//! callers block on the entry and observe the identical bytes (or the
//! builder's error).

use crate::cancel::CancelToken;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use tracing::debug;
use types::{AttestationData, CommitteeIndex, Epoch, Slot};

#[derive(Debug, Clone, PartialEq)]
pub enum AttesterCacheError {
    /// The template build failed; waiters receive the same error.
    BuildFailed(String),
    /// The request (or the build it waited on) was canceled.
    Canceled,
}

#[derive(Clone)]
enum Entry {
    InProgress,
    Ready(AttestationData),
    Failed(AttesterCacheError),
}

type Fingerprint = (Slot, CommitteeIndex);

#[derive(Default)]
pub struct AttesterCache {
    entries: Mutex<HashMap<Fingerprint, Entry>>,
    /// Signals every state transition of any entry.
    changed: Condvar,
}

impl AttesterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached template for `(slot, index)`, building it with
    /// `build` if absent.
    ///
    /// Exactly one build runs per fingerprint at a time. Waiters blocked on
    /// an `InProgress` entry observe the build's outcome; a caller that finds
    /// a `Failed` entry from an earlier attempt retries the build, since
    /// failures are never persisted.
    pub fn get_or_build<F>(
        &self,
        slot: Slot,
        index: CommitteeIndex,
        cancel: &CancelToken,
        build: F,
    ) -> Result<AttestationData, AttesterCacheError>
    where
        F: FnOnce() -> Result<AttestationData, AttesterCacheError>,
    {
        let key = (slot, index);
        let mut waited = false;
        {
            let mut entries = self.entries.lock();
            loop {
                if cancel.is_canceled() {
                    return Err(AttesterCacheError::Canceled);
                }
                match entries.get(&key) {
                    None => {
                        entries.insert(key, Entry::InProgress);
                        break;
                    }
                    Some(Entry::Ready(data)) => return Ok(*data),
                    Some(Entry::InProgress) => {
                        waited = true;
                        self.changed.wait(&mut entries);
                    }
                    Some(Entry::Failed(e)) => {
                        if waited {
                            // We waited on the build that just failed:
                            // propagate its error.
                            return Err(e.clone());
                        }
                        // A previous attempt failed before we arrived; take
                        // the build over.
                        entries.insert(key, Entry::InProgress);
                        break;
                    }
                }
            }
        }

        // Build with no lock held; other fingerprints proceed freely and
        // same-fingerprint callers block on the entry, not on the map.
        let result = if cancel.is_canceled() {
            Err(AttesterCacheError::Canceled)
        } else {
            build()
        };

        let mut entries = self.entries.lock();
        match &result {
            Ok(data) => {
                entries.insert(key, Entry::Ready(*data));
            }
            Err(e) => {
                debug!(%slot, index, error = ?e, "Attestation template build failed");
                entries.insert(key, Entry::Failed(e.clone()));
            }
        }
        self.changed.notify_all();
        result
    }

    /// Drops every entry outside `current_epoch`; called on epoch advance.
    /// `Failed` entries are dropped regardless of epoch.
    pub fn prune(&self, current_epoch: Epoch, slots_per_epoch: u64) {
        let mut entries = self.entries.lock();
        entries.retain(|(slot, _), entry| {
            slot.epoch(slots_per_epoch) == current_epoch
                && !matches!(entry, Entry::Failed(_))
        });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
