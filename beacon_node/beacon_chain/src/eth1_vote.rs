//! Selection of the `Eth1Data` to carry in a proposed block.
//!
//! Majority voting over the state's vote window, restricted to blocks inside
//! the follow-distance range and to votes that do not undo deposit progress.
//! Every degraded condition (backend disconnected, window empty, deadline
//! blown) falls back rather than stalling block production.

use eth1::Eth1Backend;
use ethereum_hashing::hash_fixed;
use int_to_bytes::int_to_bytes8;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use types::{BeaconStateSnapshot, ChainSpec, Eth1Data, Hash256};

/// Computes the eth1-data vote for a block built on `state`.
///
/// `deadline` is a soft budget: it is checked between phases, and blowing it
/// degrades the result to the deterministic mock vote instead of delaying the
/// proposal.
pub fn eth1_data_for_block_production<B: Eth1Backend + ?Sized>(
    state: &BeaconStateSnapshot,
    eth1: &B,
    spec: &ChainSpec,
    deadline: Instant,
) -> Eth1Data {
    if !eth1.is_connected() {
        warn!("Eth1 disconnected, voting with mock eth1 data");
        return mock_eth1_data(state, spec);
    }

    let period_start_slot = spec.eth1_voting_period_start_slot(state.slot);
    let voting_start_time =
        state.genesis_time + period_start_slot.as_u64() * spec.seconds_per_slot;
    let follow_time = spec.seconds_per_eth1_block * spec.eth1_follow_distance;
    let earliest = voting_start_time.saturating_sub(2 * follow_time);
    let latest = voting_start_time.saturating_sub(follow_time);

    // Upper bound of the candidate range: the newest block old enough to be
    // followed.
    let Some(upper) = eth1.latest_block_by_timestamp(latest) else {
        debug!("No eth1 block within the follow window, keeping current vote");
        return state.eth1_data;
    };
    if upper.timestamp < earliest {
        // The whole window is in the future of the eth1 chain we know.
        return state.eth1_data;
    }
    let lower_number = eth1
        .earliest_block_by_timestamp(earliest)
        .map(|block| block.number)
        .unwrap_or(upper.number);

    if Instant::now() >= deadline {
        warn!("Eth1 vote deadline expired, voting with mock eth1 data");
        return mock_eth1_data(state, spec);
    }

    // Tally in-window votes that do not regress the deposit count; remember
    // each candidate's block height for the tie-break.
    let mut tally: HashMap<Eth1Data, (u64, u64)> = HashMap::new();
    for vote in &state.eth1_data_votes {
        if vote.deposit_count < state.eth1_data.deposit_count {
            continue;
        }
        let Some(block) = eth1.block_by_hash(&vote.block_hash) else {
            continue;
        };
        if block.number < lower_number || block.number > upper.number {
            continue;
        }
        let entry = tally.entry(*vote).or_insert((0, block.number));
        entry.0 += 1;

        if Instant::now() >= deadline {
            warn!("Eth1 vote deadline expired mid-tally, voting with mock eth1 data");
            return mock_eth1_data(state, spec);
        }
    }

    if let Some((winner, (count, height))) = tally
        .into_iter()
        .max_by_key(|(_, (count, height))| (*count, *height))
    {
        debug!(votes = count, height, "Eth1 vote decided by majority");
        return winner;
    }

    // Nobody has voted inside the window yet: synthesize the vote from the
    // upper-bound block directly.
    let (deposit_count, deposit_root) = match (upper.deposit_count, upper.deposit_root) {
        (Some(count), Some(root)) => (count, root),
        _ => match eth1.deposits_number_and_root_at_height(upper.number) {
            Some((count, root)) => (count, root),
            None => {
                warn!(
                    block = upper.number,
                    "No deposit info for eth1 vote block, keeping current vote"
                );
                return state.eth1_data;
            }
        },
    };
    if deposit_count < state.eth1_data.deposit_count {
        // A synthesized vote must not undo deposit progress either.
        return state.eth1_data;
    }
    Eth1Data {
        deposit_root,
        deposit_count,
        block_hash: upper.hash,
    }
}

/// The deterministic fallback vote: both roots derived by hashing
/// `current_epoch + slot_mod_voting_period`, the deposit count carried over
/// so deposit progress never regresses.
pub fn mock_eth1_data(state: &BeaconStateSnapshot, spec: &ChainSpec) -> Eth1Data {
    let period = spec.slots_per_epoch * spec.epochs_per_eth1_voting_period;
    let slot_in_period = state.slot.as_u64() % period;
    let seed = hash_fixed(&int_to_bytes8(
        state.current_epoch(spec).as_u64() + slot_in_period,
    ));
    Eth1Data {
        deposit_root: Hash256::from(seed),
        deposit_count: state.eth1_data.deposit_count,
        block_hash: Hash256::from(hash_fixed(&seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eth1::{CachingEth1Backend, Eth1Block};
    use std::time::Duration;
    use types::{FixedBytesExtended, Slot, test_utils::TestingStateBuilder};

    const GENESIS_TIME: u64 = 100_000;

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(2)
    }

    fn hash(n: u64) -> Hash256 {
        Hash256::from_low_u64_be(n)
    }

    fn block(number: u64, timestamp: u64) -> Eth1Block {
        Eth1Block {
            hash: hash(number),
            number,
            timestamp,
            deposit_count: Some(number),
            deposit_root: Some(hash(number + 1000)),
        }
    }

    fn vote_for(number: u64) -> Eth1Data {
        Eth1Data {
            deposit_root: hash(number + 1000),
            deposit_count: number,
            block_hash: hash(number),
        }
    }

    /// Backend whose window `[earliest, latest]` covers blocks 5..=30.
    ///
    /// With the minimal spec the follow window is `14 * 16 = 224` seconds, so
    /// for a state at slot 0 the range is `[genesis - 448, genesis - 224]`.
    fn windowed_backend() -> CachingEth1Backend {
        let backend = CachingEth1Backend::new(32);
        backend.set_connected(true);
        let earliest = GENESIS_TIME - 448;
        for (number, timestamp) in [
            (2, earliest - 50), // below the window
            (5, earliest + 8),
            (10, earliest + 48),
            (15, earliest + 98),
            (20, earliest + 148),
            (30, earliest + 218),
            (99, GENESIS_TIME - 10), // above the window
        ] {
            backend.insert_block(block(number, timestamp)).unwrap();
        }
        backend
    }

    fn state_with_votes(votes: Vec<Eth1Data>) -> types::BeaconStateSnapshot {
        let spec = types::ChainSpec::minimal();
        let mut builder = TestingStateBuilder::new(8, &spec)
            .at_slot(Slot::new(0))
            .with_eth1_data_votes(votes);
        builder.state_mut().genesis_time = GENESIS_TIME;
        builder.build()
    }

    #[test]
    fn majority_wins() {
        let spec = types::ChainSpec::minimal();
        let backend = windowed_backend();
        let (a, b, c) = (vote_for(10), vote_for(20), vote_for(15));
        let state = state_with_votes(vec![a, a, b, b, b, c, c]);

        let winner = eth1_data_for_block_production(&state, &backend, &spec, far_deadline());
        assert_eq!(winner, b, "three votes beat two");
    }

    #[test]
    fn tie_breaks_by_higher_block_height() {
        let spec = types::ChainSpec::minimal();
        let backend = windowed_backend();
        let (a, b) = (vote_for(10), vote_for(20));
        let state = state_with_votes(vec![a, a, b, b]);

        let winner = eth1_data_for_block_production(&state, &backend, &spec, far_deadline());
        assert_eq!(winner, b, "equal counts, height 20 beats height 10");
    }

    #[test]
    fn out_of_window_votes_are_ignored() {
        let spec = types::ChainSpec::minimal();
        let backend = windowed_backend();
        // Block 99 is too recent; block 2 is too old. Block 5 is valid.
        let state = state_with_votes(vec![vote_for(99), vote_for(99), vote_for(2), vote_for(5)]);

        let winner = eth1_data_for_block_production(&state, &backend, &spec, far_deadline());
        assert_eq!(winner, vote_for(5));
    }

    #[test]
    fn no_votes_synthesizes_from_upper_bound() {
        let spec = types::ChainSpec::minimal();
        let backend = windowed_backend();
        let state = state_with_votes(vec![]);

        let winner = eth1_data_for_block_production(&state, &backend, &spec, far_deadline());
        assert_eq!(winner.block_hash, hash(30), "upper bound of the window");
        assert_eq!(winner.deposit_count, 30);
    }

    #[test]
    fn deposit_count_never_regresses() {
        let spec = types::ChainSpec::minimal();
        let backend = windowed_backend();
        let mut state = state_with_votes(vec![vote_for(10), vote_for(10)]);
        // The state already progressed past block 10's deposit count.
        state.eth1_data.deposit_count = 15;

        let winner = eth1_data_for_block_production(&state, &backend, &spec, far_deadline());
        assert!(
            winner.deposit_count >= 15,
            "vote {winner:?} would undo deposit progress"
        );
    }

    #[test]
    fn disconnected_backend_mocks_deterministically() {
        let spec = types::ChainSpec::minimal();
        let backend = CachingEth1Backend::new(32);
        let state = state_with_votes(vec![]);

        let first = eth1_data_for_block_production(&state, &backend, &spec, far_deadline());
        let second = eth1_data_for_block_production(&state, &backend, &spec, far_deadline());
        assert_eq!(first, second, "mock votes are deterministic");
        assert_eq!(first.deposit_count, state.eth1_data.deposit_count);
    }

    #[test]
    fn expired_deadline_mocks_instead_of_stalling() {
        let spec = types::ChainSpec::minimal();
        let backend = windowed_backend();
        let state = state_with_votes(vec![vote_for(10)]);

        let expired = Instant::now() - Duration::from_millis(1);
        let winner = eth1_data_for_block_production(&state, &backend, &spec, expired);
        assert_eq!(winner, mock_eth1_data(&state, &spec));
    }

    #[test]
    fn empty_eth1_cache_keeps_current_vote() {
        let spec = types::ChainSpec::minimal();
        let backend = CachingEth1Backend::new(32);
        backend.set_connected(true);
        let state = state_with_votes(vec![]);

        let winner = eth1_data_for_block_production(&state, &backend, &spec, far_deadline());
        assert_eq!(winner, state.eth1_data);
    }
}
