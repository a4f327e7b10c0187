//! Caches over the eth1 chain: the deposit log with its Merkle tree, and the
//! follow-distance block window consumed by eth1-data voting.
//!
//! The caches are filled by an external deposit-contract watcher; everything
//! here is synchronous reads over in-memory state, so lock hold times stay
//! short and no lock spans I/O.

mod block_cache;
mod deposit_cache;

pub use block_cache::{BlockCache, Eth1Block};
pub use deposit_cache::DepositCache;

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use types::{Deposit, DepositContainer, DepositData, Eth1Data, Hash256, PublicKeyBytes};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// The eth1 backend has no connection to an eth1 node.
    Disconnected,
    /// A deposit log arrived with a non-consecutive index.
    NonConsecutiveLogIndex { log_index: u64, expected: u64 },
    /// A log at an already known index disagrees with the stored one.
    DuplicateDistinctLog(u64),
    /// The rebuilt tree still disagrees with the canonical eth1 data.
    DepositRootMismatch { expected: Hash256, got: Hash256 },
    /// The canonical deposit count exceeds the logs we have observed.
    InsufficientDeposits { known: u64, requested: u64 },
    /// Block numbers must grow monotonically within the cache.
    NonChronologicalBlock { last: u64, got: u64 },
    /// Tree construction failed.
    MerkleTree(merkle_proof::MerkleTreeError),
}

impl From<merkle_proof::MerkleTreeError> for Error {
    fn from(e: merkle_proof::MerkleTreeError) -> Self {
        Error::MerkleTree(e)
    }
}

/// Read access to the followed eth1 chain.
pub trait Eth1Backend: Send + Sync {
    fn is_connected(&self) -> bool;

    fn latest_block_height(&self) -> Option<u64>;

    fn block_exists(&self, hash: &Hash256) -> bool;

    fn block_by_hash(&self, hash: &Hash256) -> Option<Eth1Block>;

    fn block_hash_by_height(&self, height: u64) -> Option<Hash256>;

    fn block_time_by_height(&self, height: u64) -> Option<u64>;

    /// The last block with `timestamp <= ts`.
    fn latest_block_by_timestamp(&self, ts: u64) -> Option<Eth1Block>;

    /// The first block with `timestamp >= ts`.
    fn earliest_block_by_timestamp(&self, ts: u64) -> Option<Eth1Block>;

    /// `(deposit_count, deposit_root)` of the contract at `height`.
    fn deposits_number_and_root_at_height(&self, height: u64) -> Option<(u64, Hash256)>;
}

/// Read access to observed deposit logs.
pub trait DepositFetcher: Send + Sync {
    /// The first deposit for `pubkey`, with its eth1 block height.
    fn deposit_by_pubkey(&self, pubkey: &PublicKeyBytes) -> Option<(DepositData, u64)>;

    /// Every deposit observed at or below `up_to_height`.
    fn all_deposits(&self, up_to_height: u64) -> Vec<DepositContainer>;

    /// Deposits at or below `up_to_height` that the state has not yet
    /// processed (`index >= included_count`).
    fn pending_deposits(&self, included_count: u64, up_to_height: u64) -> Vec<DepositContainer>;

    /// Deposits `[state_deposit_index, ..)` provable against `target`,
    /// bounded by `max_deposits`.
    fn deposits_for_block_inclusion(
        &self,
        state_deposit_index: u64,
        target: &Eth1Data,
        max_deposits: u64,
    ) -> Result<Vec<Deposit>, Error>;
}

/// The production backend: block and deposit caches behind short-lived locks,
/// with a connectivity flag flipped by the watcher.
pub struct CachingEth1Backend {
    blocks: RwLock<BlockCache>,
    deposits: RwLock<DepositCache>,
    connected: AtomicBool,
}

impl CachingEth1Backend {
    pub fn new(deposit_tree_depth: usize) -> Self {
        Self {
            blocks: RwLock::new(BlockCache::default()),
            deposits: RwLock::new(DepositCache::new(deposit_tree_depth)),
            connected: AtomicBool::new(false),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Watcher ingress: a followed eth1 block.
    pub fn insert_block(&self, block: Eth1Block) -> Result<(), Error> {
        self.blocks.write().insert(block)
    }

    /// Watcher ingress: a deposit-contract log.
    pub fn insert_deposit_log(&self, container: DepositContainer) -> Result<(), Error> {
        self.deposits.write().insert_log(container)
    }

    pub fn deposit_count(&self) -> u64 {
        self.deposits.read().len()
    }

    pub fn deposit_root(&self) -> Hash256 {
        self.deposits.read().root()
    }
}

impl Eth1Backend for CachingEth1Backend {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn latest_block_height(&self) -> Option<u64> {
        self.blocks.read().highest_block_number()
    }

    fn block_exists(&self, hash: &Hash256) -> bool {
        self.blocks.read().block_by_hash(hash).is_some()
    }

    fn block_by_hash(&self, hash: &Hash256) -> Option<Eth1Block> {
        self.blocks.read().block_by_hash(hash).copied()
    }

    fn block_hash_by_height(&self, height: u64) -> Option<Hash256> {
        self.blocks.read().block_by_number(height).map(|b| b.hash)
    }

    fn block_time_by_height(&self, height: u64) -> Option<u64> {
        self.blocks
            .read()
            .block_by_number(height)
            .map(|b| b.timestamp)
    }

    fn latest_block_by_timestamp(&self, ts: u64) -> Option<Eth1Block> {
        self.blocks.read().latest_block_by_timestamp(ts).copied()
    }

    fn earliest_block_by_timestamp(&self, ts: u64) -> Option<Eth1Block> {
        self.blocks.read().earliest_block_by_timestamp(ts).copied()
    }

    fn deposits_number_and_root_at_height(&self, height: u64) -> Option<(u64, Hash256)> {
        let deposits = self.deposits.read();
        let count = deposits.count_at_height(height);
        let root = deposits.root_at_count(count)?;
        Some((count, root))
    }
}

impl DepositFetcher for CachingEth1Backend {
    fn deposit_by_pubkey(&self, pubkey: &PublicKeyBytes) -> Option<(DepositData, u64)> {
        self.deposits.read().deposit_by_pubkey(pubkey)
    }

    fn all_deposits(&self, up_to_height: u64) -> Vec<DepositContainer> {
        self.deposits.read().deposits_up_to_height(up_to_height)
    }

    fn pending_deposits(&self, included_count: u64, up_to_height: u64) -> Vec<DepositContainer> {
        self.deposits
            .read()
            .deposits_up_to_height(up_to_height)
            .into_iter()
            .filter(|container| container.index >= included_count)
            .collect()
    }

    fn deposits_for_block_inclusion(
        &self,
        state_deposit_index: u64,
        target: &Eth1Data,
        max_deposits: u64,
    ) -> Result<Vec<Deposit>, Error> {
        self.deposits
            .read()
            .deposits_with_proofs(state_deposit_index, target, max_deposits)
    }
}
