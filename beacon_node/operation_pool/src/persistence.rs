//! SSZ snapshot of the pool, written at shutdown and restored at startup so
//! pending operations survive a restart.

use crate::{OpPoolError, OperationPool};
use ssz_derive::{Decode, Encode};
use types::{
    Attestation, AttesterSlashing, ProposerSlashing, SignedBlsToExecutionChange,
    SignedVoluntaryExit, SyncCommitteeMessage,
};

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PersistedOperationPool {
    unaggregated_attestations: Vec<Attestation>,
    aggregated_attestations: Vec<Attestation>,
    voluntary_exits: Vec<SignedVoluntaryExit>,
    proposer_slashings: Vec<ProposerSlashing>,
    attester_slashings: Vec<AttesterSlashing>,
    bls_to_execution_changes: Vec<SignedBlsToExecutionChange>,
    sync_committee_messages: Vec<SyncCommitteeMessage>,
}

impl PersistedOperationPool {
    pub fn from_operation_pool(pool: &OperationPool) -> Self {
        Self {
            unaggregated_attestations: pool.unaggregated_attestations.read().all(),
            aggregated_attestations: pool.aggregated_attestations.read().all(),
            voluntary_exits: pool.voluntary_exits.read().values().copied().collect(),
            proposer_slashings: pool.proposer_slashings.read().values().copied().collect(),
            attester_slashings: pool.attester_slashings.read().values().cloned().collect(),
            bls_to_execution_changes: pool
                .bls_to_execution_changes
                .read()
                .values()
                .copied()
                .collect(),
            sync_committee_messages: pool
                .sync_committee_messages
                .read()
                .values()
                .copied()
                .collect(),
        }
    }

    /// Reconstructs a pool by replaying every persisted operation through the
    /// normal insert paths, so dedup and covering rules re-apply.
    pub fn into_operation_pool(self) -> Result<OperationPool, OpPoolError> {
        let pool = OperationPool::new();
        for attestation in self.unaggregated_attestations {
            pool.insert_unaggregated_attestation(attestation)?;
        }
        for aggregate in self.aggregated_attestations {
            pool.insert_aggregate_attestation(aggregate)?;
        }
        for exit in self.voluntary_exits {
            pool.insert_voluntary_exit(exit)?;
        }
        for slashing in self.proposer_slashings {
            pool.insert_proposer_slashing(slashing)?;
        }
        for slashing in self.attester_slashings {
            pool.insert_attester_slashing(slashing)?;
        }
        for change in self.bls_to_execution_changes {
            pool.insert_bls_to_execution_change(change)?;
        }
        for message in self.sync_committee_messages {
            pool.insert_sync_committee_message(message)?;
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssz::{Decode, Encode};
    use types::{AttestationData, Epoch, SignatureBytes, Slot, VoluntaryExit};

    fn attestation(slot: u64, bits: &[usize]) -> Attestation {
        let data = AttestationData {
            slot: Slot::new(slot),
            ..AttestationData::default()
        };
        let mut att = Attestation::empty_for_signing(data, 8).unwrap();
        for bit in bits {
            att.aggregation_bits.set(*bit, true).unwrap();
        }
        att
    }

    fn populated_pool() -> OperationPool {
        let pool = OperationPool::new();
        pool.insert_unaggregated_attestation(attestation(1, &[0]))
            .unwrap();
        pool.insert_unaggregated_attestation(attestation(1, &[1]))
            .unwrap();
        pool.insert_aggregate_attestation(attestation(2, &[0, 1, 2]))
            .unwrap();
        pool.insert_voluntary_exit(SignedVoluntaryExit {
            message: VoluntaryExit {
                epoch: Epoch::new(1),
                validator_index: 9,
            },
            signature: SignatureBytes::empty(),
        })
        .unwrap();
        pool
    }

    #[test]
    fn ssz_round_trip_restores_the_pool() {
        let pool = populated_pool();
        let persisted = PersistedOperationPool::from_operation_pool(&pool);

        let bytes = persisted.as_ssz_bytes();
        let decoded = PersistedOperationPool::from_ssz_bytes(&bytes).unwrap();
        assert_eq!(decoded, persisted);

        let restored = decoded.into_operation_pool().unwrap();
        assert_eq!(restored.num_attestations(), pool.num_attestations());
        assert_eq!(restored.num_voluntary_exits(), pool.num_voluntary_exits());
    }

    #[test]
    fn restore_reapplies_covering_rules() {
        let pool = OperationPool::new();
        pool.insert_aggregate_attestation(attestation(1, &[0]))
            .unwrap();
        let mut persisted = PersistedOperationPool::from_operation_pool(&pool);
        // A stale snapshot may carry both a subset and its superset.
        persisted
            .aggregated_attestations
            .push(attestation(1, &[0, 1]));

        let restored = persisted.into_operation_pool().unwrap();
        assert_eq!(restored.num_attestations(), 1, "subset was evicted");
    }
}
