use crate::Error;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::Hash256;

/// A followed eth1 block, as much of it as voting needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eth1Block {
    pub hash: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub number: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub timestamp: u64,
    /// Deposit-contract count at this block, when the watcher sampled it.
    pub deposit_count: Option<u64>,
    pub deposit_root: Option<Hash256>,
}

/// Blocks within the follow-distance window, ordered by number.
///
/// Timestamps are monotone in block number, so both timestamp lookups are
/// binary searches.
#[derive(Debug, Default, Clone)]
pub struct BlockCache {
    blocks: Vec<Eth1Block>,
}

impl BlockCache {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn highest_block_number(&self) -> Option<u64> {
        self.blocks.last().map(|b| b.number)
    }

    pub fn lowest_block_number(&self) -> Option<u64> {
        self.blocks.first().map(|b| b.number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Eth1Block> {
        self.blocks.iter()
    }

    /// Inserts a block. A block at or below an already known number replaces
    /// the suffix from that number on (an eth1 reorg within the window).
    pub fn insert(&mut self, block: Eth1Block) -> Result<(), Error> {
        if let Some(highest) = self.highest_block_number() {
            if block.number <= highest {
                let keep = self.blocks.partition_point(|b| b.number < block.number);
                debug!(
                    reorged = self.blocks.len() - keep,
                    number = block.number,
                    "Eth1 reorg in block cache"
                );
                self.blocks.truncate(keep);
            }
            if let Some(last) = self.blocks.last() {
                if block.timestamp < last.timestamp {
                    return Err(Error::NonChronologicalBlock {
                        last: last.timestamp,
                        got: block.timestamp,
                    });
                }
            }
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn block_by_number(&self, number: u64) -> Option<&Eth1Block> {
        let index = self.blocks.partition_point(|b| b.number < number);
        self.blocks.get(index).filter(|b| b.number == number)
    }

    pub fn block_by_hash(&self, hash: &Hash256) -> Option<&Eth1Block> {
        self.blocks.iter().find(|b| &b.hash == hash)
    }

    /// The last block with `timestamp <= ts`.
    pub fn latest_block_by_timestamp(&self, ts: u64) -> Option<&Eth1Block> {
        let first_above = self.blocks.partition_point(|b| b.timestamp <= ts);
        first_above.checked_sub(1).and_then(|i| self.blocks.get(i))
    }

    /// The first block with `timestamp >= ts`.
    pub fn earliest_block_by_timestamp(&self, ts: u64) -> Option<&Eth1Block> {
        let index = self.blocks.partition_point(|b| b.timestamp < ts);
        self.blocks.get(index)
    }

    /// Drops blocks below `oldest_to_keep`, bounding the window.
    pub fn prune(&mut self, oldest_to_keep: u64) {
        let cut = self.blocks.partition_point(|b| b.number < oldest_to_keep);
        self.blocks.drain(..cut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::FixedBytesExtended;

    fn block(number: u64, timestamp: u64) -> Eth1Block {
        Eth1Block {
            hash: Hash256::from_low_u64_be(number + 1),
            number,
            timestamp,
            deposit_count: None,
            deposit_root: None,
        }
    }

    fn filled(range: std::ops::Range<u64>) -> BlockCache {
        let mut cache = BlockCache::default();
        for n in range {
            cache.insert(block(n, n * 10)).unwrap();
        }
        cache
    }

    #[test]
    fn timestamp_bounds() {
        let cache = filled(0..10);
        assert_eq!(cache.latest_block_by_timestamp(45).unwrap().number, 4);
        assert_eq!(cache.latest_block_by_timestamp(40).unwrap().number, 4);
        assert_eq!(cache.earliest_block_by_timestamp(45).unwrap().number, 5);
        assert_eq!(cache.earliest_block_by_timestamp(40).unwrap().number, 4);
        assert!(cache.earliest_block_by_timestamp(1000).is_none());
        assert!(cache.latest_block_by_timestamp(0).is_some());
    }

    #[test]
    fn reorg_replaces_suffix() {
        let mut cache = filled(0..10);
        cache.insert(block(5, 51)).unwrap();
        assert_eq!(cache.highest_block_number(), Some(5));
        assert_eq!(cache.len(), 6);
        assert_eq!(cache.block_by_number(5).unwrap().timestamp, 51);
    }

    #[test]
    fn rejects_time_travel() {
        let mut cache = filled(0..3);
        let result = cache.insert(block(3, 5));
        assert!(matches!(result, Err(Error::NonChronologicalBlock { .. })));
    }

    #[test]
    fn prune_drops_the_front() {
        let mut cache = filled(0..10);
        cache.prune(7);
        assert_eq!(cache.lowest_block_number(), Some(7));
        assert_eq!(cache.len(), 3);
    }
}
