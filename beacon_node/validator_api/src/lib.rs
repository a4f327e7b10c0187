//! The validator-facing RPC core.
//!
//! Mediates between external validator clients and in-process consensus
//! state: duty discovery, template production, chain queries and validated
//! submission ingress. Transport framing and wire encodings live elsewhere;
//! everything here takes and returns semantic types.

pub mod duties;
pub mod errors;
pub mod pagination;
pub mod query;
pub mod queue;
pub mod status;
pub mod streams;
pub mod submit;
pub mod templates;
pub mod test_utils;

pub use duties::SyncCommitteeDuty;
pub use errors::{ErrorKind, RpcError};
pub use pagination::{PageRequest, Paginated};
pub use query::{BlockFilter, ValidatorFilter};
pub use queue::ValidatorQueue;
pub use status::ValidatorStatusResponse;
pub use streams::{ChainStarted, EpochInfo};
pub use submit::SubmissionAck;

use beacon_chain::{
    AttesterCache, Broadcaster, ChainService, FinalizationFetcher, HeadFetcher, Notifier,
};
use eth1::{DepositFetcher, Eth1Backend};
use lru::LruCache;
use operation_pool::OperationPool;
use parking_lot::Mutex;
use slot_clock::SlotClock;
use std::num::NonZeroUsize;
use std::sync::Arc;
use store::{Archive, BlockStore};
use types::{
    BeaconStateSnapshot, ChainHead, ChainSpec, CommitteeCache, Epoch, Eth1Data, Hash256,
    SeedDomain,
};

/// How many epochs of committee shufflings to keep. Requests cluster on the
/// current epoch with occasional history, so a handful suffices.
const COMMITTEE_CACHE_SIZE: usize = 8;

/// Either way of naming a validator in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorId {
    Index(u64),
    PublicKey(types::PublicKeyBytes),
}

/// The collaborators injected into the core, one narrow capability each.
pub struct Dependencies<C: SlotClock> {
    pub spec: Arc<ChainSpec>,
    pub head: Arc<dyn HeadFetcher>,
    pub finalization: Arc<dyn FinalizationFetcher>,
    pub archive: Arc<dyn Archive>,
    pub block_store: Arc<dyn BlockStore>,
    pub eth1: Arc<dyn Eth1Backend>,
    pub deposits: Arc<dyn DepositFetcher>,
    pub pool: Arc<OperationPool>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub chain_service: Arc<dyn ChainService>,
    pub notifier: Notifier,
    pub slot_clock: C,
}

pub struct ValidatorApi<C: SlotClock> {
    pub(crate) spec: Arc<ChainSpec>,
    pub(crate) head: Arc<dyn HeadFetcher>,
    pub(crate) finalization: Arc<dyn FinalizationFetcher>,
    pub(crate) archive: Arc<dyn Archive>,
    pub(crate) block_store: Arc<dyn BlockStore>,
    pub(crate) eth1: Arc<dyn Eth1Backend>,
    pub(crate) deposits: Arc<dyn DepositFetcher>,
    pub(crate) pool: Arc<OperationPool>,
    pub(crate) broadcaster: Arc<dyn Broadcaster>,
    pub(crate) chain_service: Arc<dyn ChainService>,
    pub(crate) notifier: Notifier,
    pub(crate) slot_clock: C,
    pub(crate) attester_cache: AttesterCache,
    /// Shufflings memoized by `(epoch, attester_seed)`; the seed key makes a
    /// stale entry impossible even across head reorgs.
    committee_caches: Mutex<LruCache<(Epoch, Hash256), Arc<CommitteeCache>>>,
}

impl<C: SlotClock> ValidatorApi<C> {
    pub fn new(deps: Dependencies<C>) -> Arc<Self> {
        Arc::new(Self {
            spec: deps.spec,
            head: deps.head,
            finalization: deps.finalization,
            archive: deps.archive,
            block_store: deps.block_store,
            eth1: deps.eth1,
            deposits: deps.deposits,
            pool: deps.pool,
            broadcaster: deps.broadcaster,
            chain_service: deps.chain_service,
            notifier: deps.notifier,
            slot_clock: deps.slot_clock,
            attester_cache: AttesterCache::new(),
            committee_caches: Mutex::new(LruCache::new(
                NonZeroUsize::new(COMMITTEE_CACHE_SIZE).expect("cache size is non-zero"),
            )),
        })
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    /// The head summary: root, slot and the three progress checkpoints.
    pub fn get_chain_head(&self) -> Result<ChainHead, RpcError> {
        Ok(self.head.chain_head()?)
    }

    /// The eth1-data vote that a block produced right now would carry.
    pub fn get_eth1_data_vote(&self) -> Result<Eth1Data, RpcError> {
        let state = self.head.head_state()?;
        let deadline = std::time::Instant::now() + self.spec.eth1_data_timeout;
        Ok(beacon_chain::eth1_data_for_block_production(
            &state,
            self.eth1.as_ref(),
            &self.spec,
            deadline,
        ))
    }

    /// Rejects epochs later than the head's, per the future-epoch rule.
    pub(crate) fn reject_future_epoch(
        &self,
        epoch: Epoch,
        state: &BeaconStateSnapshot,
    ) -> Result<(), RpcError> {
        let current = state.current_epoch(&self.spec);
        if epoch > current {
            Err(RpcError::invalid_argument(format!(
                "epoch {epoch} is ahead of the current epoch {current}"
            )))
        } else {
            Ok(())
        }
    }

    /// The committee cache for `epoch` against the given live snapshot,
    /// memoized by seed.
    pub(crate) fn live_committee_cache(
        &self,
        state: &BeaconStateSnapshot,
        epoch: Epoch,
    ) -> Result<Arc<CommitteeCache>, RpcError> {
        let seed = state.get_seed(epoch, SeedDomain::Attester, &self.spec)?;
        let mut caches = self.committee_caches.lock();
        if let Some(cache) = caches.get(&(epoch, seed)) {
            return Ok(cache.clone());
        }
        drop(caches);

        // Shuffle outside the lock; a racing builder costs one extra shuffle,
        // never a stale cache.
        let cache = Arc::new(CommitteeCache::initialized(state, epoch, &self.spec)?);
        self.committee_caches
            .lock()
            .put((epoch, seed), cache.clone());
        Ok(cache)
    }

    /// The committee cache for an archived epoch, built from archived seeds
    /// and the archived registry.
    pub(crate) fn archived_committee_cache(
        &self,
        epoch: Epoch,
        info: &store::ArchivedCommitteeInfo,
        validators: &[types::Validator],
    ) -> Result<Arc<CommitteeCache>, RpcError> {
        let mut caches = self.committee_caches.lock();
        if let Some(cache) = caches.get(&(epoch, info.attester_seed)) {
            return Ok(cache.clone());
        }
        drop(caches);

        let active_indices: Vec<u64> = validators
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_active_at(epoch))
            .map(|(i, _)| i as u64)
            .collect();
        let cache = Arc::new(CommitteeCache::from_seed(
            info.attester_seed,
            active_indices,
            validators.len(),
            epoch,
            info.committee_count,
            &self.spec,
        )?);
        self.committee_caches
            .lock()
            .put((epoch, info.attester_seed), cache.clone());
        Ok(cache)
    }
}
