use crate::Error;
use ethereum_hashing::hash32_concat;
use int_to_bytes::int_to_bytes32;
use merkle_proof::MerkleTree;
use tracing::warn;
use tree_hash::TreeHash;
use types::{Deposit, DepositContainer, DepositData, Eth1Data, FixedVector, Hash256, PublicKeyBytes};

/// The deposit log with its incremental Merkle tree.
///
/// Indices are dense and gap-free; the tree is append-only. The incremental
/// tree is a performance aid only: proofs against a historical deposit count
/// are generated from a tree rebuilt out of the log, and a root that still
/// disagrees with the canonical `eth1_data` after such a rebuild is reported,
/// never papered over.
pub struct DepositCache {
    logs: Vec<DepositContainer>,
    leaves: Vec<Hash256>,
    deposit_tree: MerkleTree,
    depth: usize,
}

impl DepositCache {
    pub fn new(depth: usize) -> Self {
        Self {
            logs: vec![],
            leaves: vec![],
            deposit_tree: MerkleTree::create(&[], depth),
            depth,
        }
    }

    pub fn len(&self) -> u64 {
        self.logs.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Appends a log. Re-delivery of a known log is accepted and ignored;
    /// a differing log at a known index, or a gap, is an error.
    pub fn insert_log(&mut self, container: DepositContainer) -> Result<(), Error> {
        let expected = self.logs.len() as u64;
        match container.index.cmp(&expected) {
            std::cmp::Ordering::Equal => {
                let leaf = container.deposit_data.tree_hash_root();
                self.deposit_tree.push_leaf(leaf, self.depth)?;
                self.leaves.push(leaf);
                self.logs.push(container);
                Ok(())
            }
            std::cmp::Ordering::Less => {
                if self.logs[container.index as usize] == container {
                    Ok(())
                } else {
                    Err(Error::DuplicateDistinctLog(container.index))
                }
            }
            std::cmp::Ordering::Greater => Err(Error::NonConsecutiveLogIndex {
                log_index: container.index,
                expected,
            }),
        }
    }

    /// The canonical deposit root over all known deposits: the tree root with
    /// the deposit count mixed in.
    pub fn root(&self) -> Hash256 {
        mix_in_length(self.deposit_tree.hash(), self.len())
    }

    /// The deposit root as it stood when only `count` deposits existed, or
    /// `None` if we have not observed that many.
    pub fn root_at_count(&self, count: u64) -> Option<Hash256> {
        if count > self.len() {
            return None;
        }
        if count == self.len() {
            return Some(self.root());
        }
        let tree = MerkleTree::create(&self.leaves[..count as usize], self.depth);
        Some(mix_in_length(tree.hash(), count))
    }

    /// Number of deposits whose log sits at or below `height`.
    pub fn count_at_height(&self, height: u64) -> u64 {
        self.logs
            .partition_point(|log| log.eth1_block_height <= height) as u64
    }

    pub fn deposits_up_to_height(&self, up_to_height: u64) -> Vec<DepositContainer> {
        self.logs[..self.count_at_height(up_to_height) as usize].to_vec()
    }

    pub fn deposit_by_pubkey(&self, pubkey: &PublicKeyBytes) -> Option<(DepositData, u64)> {
        self.logs
            .iter()
            .find(|log| &log.deposit_data.pubkey == pubkey)
            .map(|log| (log.deposit_data.clone(), log.eth1_block_height))
    }

    /// Deposits `[state_deposit_index, min(target.deposit_count, index + max))`
    /// with proofs against `target.deposit_root`.
    ///
    /// The proof tree is rebuilt from the log at `target.deposit_count`
    /// leaves; if its root does not match the canonical one the deposit log
    /// itself disagrees with the chain and the call fails.
    pub fn deposits_with_proofs(
        &self,
        state_deposit_index: u64,
        target: &Eth1Data,
        max_deposits: u64,
    ) -> Result<Vec<Deposit>, Error> {
        let end = std::cmp::min(
            target.deposit_count,
            state_deposit_index.saturating_add(max_deposits),
        );
        if end <= state_deposit_index {
            return Ok(vec![]);
        }
        if target.deposit_count > self.len() {
            return Err(Error::InsufficientDeposits {
                known: self.len(),
                requested: target.deposit_count,
            });
        }

        // Rebuild at the target count; the incremental tree may be ahead.
        let tree = MerkleTree::create(&self.leaves[..target.deposit_count as usize], self.depth);
        let root = mix_in_length(tree.hash(), target.deposit_count);
        if root != target.deposit_root {
            warn!(
                expected = %target.deposit_root,
                got = %root,
                "Deposit log disagrees with canonical eth1 data"
            );
            return Err(Error::DepositRootMismatch {
                expected: target.deposit_root,
                got: root,
            });
        }

        (state_deposit_index..end)
            .map(|index| {
                let (leaf, mut proof) = tree.generate_proof(index as usize, self.depth)?;
                debug_assert_eq!(leaf, self.leaves[index as usize]);
                proof.push(Hash256::from_slice(&int_to_bytes32(target.deposit_count)));
                Ok(Deposit {
                    proof: FixedVector::new(proof)
                        .expect("proof length is depth plus one by construction"),
                    data: self.logs[index as usize].deposit_data.clone(),
                })
            })
            .collect()
    }
}

/// `H(root || count_le_32)`, the deposit contract's length mix-in.
fn mix_in_length(root: Hash256, count: u64) -> Hash256 {
    Hash256::from(hash32_concat(root.as_slice(), &int_to_bytes32(count)))
}
