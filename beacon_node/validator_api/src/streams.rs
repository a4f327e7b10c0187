//! Long-lived subscription operations.
//!
//! All three are cooperatively scheduled: they wake on notifier events or a
//! poll interval, emit, and end when their condition resolves or the request
//! is canceled.

use crate::status::ValidatorStatusResponse;
use crate::{RpcError, ValidatorApi};
use beacon_chain::{CancelToken, ChainEvent, HeadFetcher};
use futures::Stream;
use serde::{Deserialize, Serialize};
use slot_clock::SlotClock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use types::{Epoch, PublicKeyBytes, ValidatorStatus};

/// The chain-start notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStarted {
    pub started: bool,
    pub genesis_time: u64,
}

/// Minimal per-epoch consensus info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochInfo {
    pub epoch: Epoch,
    pub active_validator_count: usize,
    pub committee_count_per_slot: u64,
    pub finalized_epoch: Epoch,
    pub justified_epoch: Epoch,
}

impl<C: SlotClock + 'static> ValidatorApi<C> {
    /// Resolves once the chain has started, immediately if it already has.
    pub async fn wait_for_chain_start(
        &self,
        cancel: &CancelToken,
    ) -> Result<ChainStarted, RpcError> {
        if let Ok(state) = self.head.head_state() {
            return Ok(ChainStarted {
                started: true,
                genesis_time: state.genesis_time,
            });
        }

        let mut events = self.notifier.subscribe();
        let mut cancel = cancel.clone();
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ChainEvent::ChainStart { genesis_time })
                    | Ok(ChainEvent::StateInitialized { genesis_time }) => {
                        return Ok(ChainStarted { started: true, genesis_time });
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Chain-start subscriber lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(RpcError::internal("notifier closed"));
                    }
                },
                _ = cancel.canceled() => return Err(RpcError::canceled()),
            }
        }
    }

    /// Emits the statuses of `pubkeys` on every poll tick until one of them
    /// is `ACTIVE` (that batch is the final item) or the request is canceled.
    pub fn wait_for_activation(
        self: &Arc<Self>,
        pubkeys: Vec<PublicKeyBytes>,
        cancel: CancelToken,
    ) -> impl Stream<Item = Result<Vec<ValidatorStatusResponse>, RpcError>> + use<C> {
        struct State<C: SlotClock> {
            api: Arc<ValidatorApi<C>>,
            pubkeys: Vec<PublicKeyBytes>,
            cancel: CancelToken,
            interval: tokio::time::Interval,
            finished: bool,
        }

        let state = State {
            api: self.clone(),
            pubkeys,
            cancel,
            interval: tokio::time::interval(self.spec.activation_poll_interval),
            finished: false,
        };

        futures::stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }

            let mut cancel = state.cancel.clone();
            tokio::select! {
                _ = state.interval.tick() => {}
                _ = cancel.canceled() => return None,
            }

            let item = state.api.get_validator_statuses(&state.pubkeys);
            match item {
                Ok(statuses) => {
                    if statuses
                        .iter()
                        .any(|s| s.status == ValidatorStatus::Active)
                    {
                        // Emit the final batch, then end.
                        state.finished = true;
                    }
                    Some((Ok(statuses), state))
                }
                Err(e) => {
                    state.finished = true;
                    Some((Err(e), state))
                }
            }
        })
    }

    /// Emits `EpochInfo` for the head's epoch, then again whenever a new
    /// head enters a later epoch, starting no earlier than `from_epoch`.
    pub fn subscribe_epoch_info(
        self: &Arc<Self>,
        from_epoch: Epoch,
        cancel: CancelToken,
    ) -> impl Stream<Item = Result<EpochInfo, RpcError>> + use<C> {
        struct State<C: SlotClock> {
            api: Arc<ValidatorApi<C>>,
            events: broadcast::Receiver<ChainEvent>,
            cancel: CancelToken,
            from_epoch: Epoch,
            last_emitted: Option<Epoch>,
        }

        let state = State {
            api: self.clone(),
            events: self.notifier.subscribe(),
            cancel,
            from_epoch,
            last_emitted: None,
        };

        futures::stream::unfold(state, |mut state| async move {
            loop {
                // Emit if the head has crossed into an unreported epoch.
                match state.api.current_epoch_info() {
                    Ok(Some(info))
                        if info.epoch >= state.from_epoch
                            && state.last_emitted.is_none_or(|last| info.epoch > last) =>
                    {
                        state.last_emitted = Some(info.epoch);
                        return Some((Ok(info), state));
                    }
                    Ok(_) => {}
                    Err(e) => return Some((Err(e), state)),
                }

                let mut cancel = state.cancel.clone();
                tokio::select! {
                    event = state.events.recv() => match event {
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    },
                    _ = cancel.canceled() => return None,
                }
            }
        })
    }

    /// Epoch info of the current head, or `None` before chain start.
    fn current_epoch_info(&self) -> Result<Option<EpochInfo>, RpcError> {
        let state = match self.head.head_state() {
            Ok(state) => state,
            Err(beacon_chain::BeaconChainError::ChainNotStarted) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let epoch = state.current_epoch(&self.spec);
        let active = state.active_validator_indices(epoch);
        Ok(Some(EpochInfo {
            epoch,
            active_validator_count: active.len(),
            committee_count_per_slot:
                types::BeaconStateSnapshot::committee_count_per_slot(active.len(), &self.spec),
            finalized_epoch: state.finalized_checkpoint.epoch,
            justified_epoch: state.current_justified_checkpoint.epoch,
        }))
    }
}
