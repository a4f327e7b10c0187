use std::collections::HashMap;
use tree_hash::TreeHash;
use types::{Attestation, Epoch, Hash256, Slot};

/// Attestation query filter; unset fields match everything.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttestationFilter {
    pub slot: Option<Slot>,
    pub committee_index: Option<u64>,
    pub head_block_root: Option<Hash256>,
    pub source_epoch: Option<Epoch>,
    pub source_root: Option<Hash256>,
    pub target_epoch: Option<Epoch>,
    pub target_root: Option<Hash256>,
}

impl AttestationFilter {
    pub fn matches(&self, attestation: &Attestation) -> bool {
        let data = &attestation.data;
        self.slot.is_none_or(|v| data.slot == v)
            && self.committee_index.is_none_or(|v| data.index == v)
            && self
                .head_block_root
                .is_none_or(|v| data.beacon_block_root == v)
            && self.source_epoch.is_none_or(|v| data.source.epoch == v)
            && self.source_root.is_none_or(|v| data.source.root == v)
            && self.target_epoch.is_none_or(|v| data.target.epoch == v)
            && self.target_root.is_none_or(|v| data.target.root == v)
    }
}

/// Attestations grouped by their data root.
///
/// Grouping keeps the covering-insert scan bounded to attestations that can
/// actually conflict: only equal-data attestations can cover one another.
#[derive(Debug, Default)]
pub(crate) struct AttestationMap {
    groups: HashMap<Hash256, Vec<Attestation>>,
    len: usize,
}

impl AttestationMap {
    pub fn len(&self) -> usize {
        self.len
    }

    /// Inserts unless a byte-identical attestation is already present.
    pub fn insert_exact(&mut self, attestation: Attestation) -> crate::InsertOutcome {
        let group = self
            .groups
            .entry(attestation.data.tree_hash_root())
            .or_default();
        if group.contains(&attestation) {
            return crate::InsertOutcome::AlreadyKnown;
        }
        group.push(attestation);
        self.len += 1;
        crate::InsertOutcome::Inserted
    }

    /// Inserts unless an existing attestation for the same data covers the
    /// new signers; evicts existing attestations the new one covers.
    pub fn insert_covering(&mut self, attestation: Attestation) -> crate::InsertOutcome {
        let group = self
            .groups
            .entry(attestation.data.tree_hash_root())
            .or_default();

        if group
            .iter()
            .any(|existing| attestation.is_subset_of(existing))
        {
            return crate::InsertOutcome::AlreadyKnown;
        }

        let before = group.len();
        group.retain(|existing| !existing.is_subset_of(&attestation));
        self.len -= before - group.len();

        group.push(attestation);
        self.len += 1;
        crate::InsertOutcome::Inserted
    }

    pub fn filtered(&self, filter: &AttestationFilter) -> Vec<Attestation> {
        self.groups
            .values()
            .flatten()
            .filter(|att| filter.matches(att))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Attestation> {
        self.groups.values().flatten().cloned().collect()
    }

    pub fn retain<F: Fn(&Attestation) -> bool>(&mut self, f: F) {
        for group in self.groups.values_mut() {
            group.retain(|att| f(att));
        }
        self.groups.retain(|_, group| !group.is_empty());
        self.len = self.groups.values().map(Vec::len).sum();
    }
}
