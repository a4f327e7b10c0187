use super::{ManualSlotClock, SlotClock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use types::Slot;

/// Determines the present slot based upon the present system time, genesis
/// time and per-slot duration.
#[derive(Clone)]
pub struct SystemTimeSlotClock {
    clock: ManualSlotClock,
}

impl SlotClock for SystemTimeSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        Self {
            clock: ManualSlotClock::new(genesis_slot, genesis_duration, slot_duration),
        }
    }

    fn now(&self) -> Option<Slot> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        self.clock.slot_of(now)
    }

    fn now_duration(&self) -> Option<Duration> {
        SystemTime::now().duration_since(UNIX_EPOCH).ok()
    }

    fn slot_of(&self, now: Duration) -> Option<Slot> {
        self.clock.slot_of(now)
    }

    fn is_prior_to_genesis(&self) -> Option<bool> {
        Some(self.now_duration()? < self.clock.genesis_duration())
    }

    fn slot_duration(&self) -> Duration {
        self.clock.slot_duration()
    }

    fn duration_to_next_slot(&self) -> Option<Duration> {
        self.clock.duration_to_next_slot_from(self.now_duration()?)
    }

    fn start_of(&self, slot: Slot) -> Option<Duration> {
        self.clock.start_of(slot)
    }

    fn genesis_slot(&self) -> Slot {
        self.clock.genesis_slot()
    }

    fn genesis_duration(&self) -> Duration {
        self.clock.genesis_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_in_the_past_yields_a_slot() {
        let clock = SystemTimeSlotClock::new(
            Slot::new(0),
            Duration::from_secs(0),
            Duration::from_secs(12),
        );
        assert!(clock.now().is_some());
        assert_eq!(clock.is_prior_to_genesis(), Some(false));
    }

    #[test]
    fn genesis_in_the_future_yields_none() {
        let far_future = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            + Duration::from_secs(3600);
        let clock = SystemTimeSlotClock::new(Slot::new(0), far_future, Duration::from_secs(12));
        assert_eq!(clock.now(), None);
        assert_eq!(clock.is_prior_to_genesis(), Some(true));
    }
}
