//! A sparse binary Merkle tree of fixed depth with incremental leaf insertion
//! and inclusion-proof generation.
//!
//! Unset subtrees are represented by a depth-indexed zero hash, so a tree of
//! depth 32 only materializes the path to its occupied leaves.

use ethereum_hashing::{ZERO_HASHES, hash32_concat};
use fixed_bytes::Hash256;
use safe_arith::ArithError;

const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, PartialEq, Clone)]
pub enum MerkleTree {
    /// Finalized leaf carrying a value.
    Leaf(Hash256),
    /// Internal node with a memoized hash and two children.
    Node(Hash256, Box<Self>, Box<Self>),
    /// An entirely unset subtree of the given depth.
    Zero(usize),
}

#[derive(Debug, PartialEq, Clone)]
pub enum MerkleTreeError {
    /// Trying to push to a leaf or an already full subtree.
    MerkleTreeFull,
    /// Tree depth exceeds `MAX_TREE_DEPTH`.
    DepthTooLarge,
    /// Proof requested for an index outside the tree.
    ProofIndexOutOfBounds,
    /// Overflow in generalized-index arithmetic.
    ArithError,
}

impl From<ArithError> for MerkleTreeError {
    fn from(_: ArithError) -> Self {
        MerkleTreeError::ArithError
    }
}

impl MerkleTree {
    /// Creates a tree of `depth` from `leaves`, padding with zero subtrees.
    pub fn create(leaves: &[Hash256], depth: usize) -> Self {
        use MerkleTree::*;

        if leaves.is_empty() {
            return Zero(depth);
        }

        match depth {
            0 => {
                debug_assert_eq!(leaves.len(), 1);
                Leaf(leaves[0])
            }
            _ => {
                // Split leaves into the two subtrees.
                let capacity = (1usize << (depth - 1)).min(leaves.len());
                let (left_leaves, right_leaves) = leaves.split_at(capacity);

                let left_subtree = MerkleTree::create(left_leaves, depth - 1);
                let right_subtree = MerkleTree::create(right_leaves, depth - 1);
                let hash = Hash256::from(hash32_concat(
                    left_subtree.hash().as_slice(),
                    right_subtree.hash().as_slice(),
                ));

                Node(hash, Box::new(left_subtree), Box::new(right_subtree))
            }
        }
    }

    /// Appends a leaf at the next unset position of a tree of `depth`.
    pub fn push_leaf(&mut self, elem: Hash256, depth: usize) -> Result<(), MerkleTreeError> {
        use MerkleTree::*;

        if depth > MAX_TREE_DEPTH {
            return Err(MerkleTreeError::DepthTooLarge);
        }

        match self {
            Leaf(_) => return Err(MerkleTreeError::MerkleTreeFull),
            Zero(_) if depth == 0 => {
                *self = Leaf(elem);
            }
            Zero(zero_depth) => {
                debug_assert_eq!(*zero_depth, depth);
                let mut left = MerkleTree::Zero(depth - 1);
                left.push_leaf(elem, depth - 1)?;
                let right = MerkleTree::Zero(depth - 1);
                let hash = Hash256::from(hash32_concat(
                    left.hash().as_slice(),
                    right.hash().as_slice(),
                ));
                *self = Node(hash, Box::new(left), Box::new(right));
            }
            Node(hash, left, right) => {
                if depth == 0 {
                    return Err(MerkleTreeError::MerkleTreeFull);
                }
                // Recurse into the leftmost subtree with spare capacity.
                match left.push_leaf(elem, depth - 1) {
                    Ok(()) => (),
                    Err(MerkleTreeError::MerkleTreeFull) => {
                        right.push_leaf(elem, depth - 1)?;
                    }
                    Err(e) => return Err(e),
                }
                *hash = Hash256::from(hash32_concat(
                    left.hash().as_slice(),
                    right.hash().as_slice(),
                ));
            }
        }

        Ok(())
    }

    /// The root hash of this (sub)tree.
    pub fn hash(&self) -> Hash256 {
        match self {
            MerkleTree::Leaf(h) => *h,
            MerkleTree::Node(h, _, _) => *h,
            MerkleTree::Zero(depth) => Hash256::from_slice(&ZERO_HASHES[*depth]),
        }
    }

    /// Returns the leaf at `index` and the `depth` sibling hashes along its
    /// path, ordered bottom-up.
    pub fn generate_proof(
        &self,
        index: usize,
        depth: usize,
    ) -> Result<(Hash256, Vec<Hash256>), MerkleTreeError> {
        if depth > MAX_TREE_DEPTH || (depth < 64 && index >= (1usize << depth)) {
            return Err(MerkleTreeError::ProofIndexOutOfBounds);
        }

        let mut proof = vec![];
        let mut current_node = self;
        let mut current_depth = depth;
        while current_depth > 0 {
            let ith_bit = (index >> (current_depth - 1)) & 0x01;
            match current_node {
                MerkleTree::Zero(_) => {
                    proof.push(Hash256::from_slice(&ZERO_HASHES[current_depth - 1]));
                    // Every descendant of a zero subtree is zero.
                    current_node = &ZERO_NODES[current_depth - 1];
                }
                MerkleTree::Node(_, left, right) => {
                    // Push the sibling, descend into the child on the path.
                    if ith_bit == 1 {
                        proof.push(left.hash());
                        current_node = right;
                    } else {
                        proof.push(right.hash());
                        current_node = left;
                    }
                }
                MerkleTree::Leaf(_) => return Err(MerkleTreeError::ProofIndexOutOfBounds),
            }
            current_depth -= 1;
        }

        debug_assert_eq!(proof.len(), depth);
        proof.reverse();

        Ok((current_node.hash(), proof))
    }
}

/// Zero subtrees for every permissible depth, used when a proof path crosses
/// entirely unset territory.
static ZERO_NODES: std::sync::LazyLock<Vec<MerkleTree>> = std::sync::LazyLock::new(|| {
    (0..=MAX_TREE_DEPTH).map(MerkleTree::Zero).collect()
});

/// Verifies a Merkle proof that `leaf` exists at `index` in a tree of `depth`
/// with the given `root`.
pub fn verify_merkle_proof(
    leaf: Hash256,
    branch: &[Hash256],
    depth: usize,
    index: usize,
    root: Hash256,
) -> bool {
    branch.len() == depth && merkle_root_from_branch(leaf, branch, depth, index) == root
}

/// Recomputes a root from a leaf and its branch, walking bottom-up.
pub fn merkle_root_from_branch(
    leaf: Hash256,
    branch: &[Hash256],
    depth: usize,
    index: usize,
) -> Hash256 {
    assert_eq!(branch.len(), depth, "proof length should equal depth");

    let mut merkle_root = leaf.as_slice().to_vec();

    for (i, leaf) in branch.iter().enumerate().take(depth) {
        let ith_bit = (index >> i) & 0x01;
        if ith_bit == 1 {
            merkle_root = hash32_concat(leaf.as_slice(), &merkle_root)[..].to_vec();
        } else {
            merkle_root = hash32_concat(&merkle_root, leaf.as_slice())[..].to_vec();
        }
    }

    Hash256::from_slice(&merkle_root)
}
