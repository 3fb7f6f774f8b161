use anchor_lang::prelude::*;

use crate::constants::MARKET_STALE_AFTER_SLOTS_ELAPSED;
use crate::errors::LendingError;

/// Tracks when a reserve or obligation was last refreshed
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, InitSpace, PartialEq, Eq)]
pub struct LastUpdate {
    /// Slot of the last refresh
    pub slot: u64,

    /// Set by any mutation which invalidates cached values
    pub stale: bool,
}

impl LastUpdate {
    /// Starts out stale so the first operation has to refresh
    pub fn new(slot: u64) -> Self {
        Self { slot, stale: true }
    }

    pub fn slots_elapsed(&self, slot: u64) -> Result<u64> {
        slot.checked_sub(self.slot)
            .ok_or_else(|| error!(LendingError::MathOverflow))
    }

    pub fn update_slot(&mut self, slot: u64) {
        self.slot = slot;
        self.stale = false;
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Stale if marked so or if at least one slot passed since refresh
    pub fn is_stale(&self, slot: u64) -> Result<bool> {
        Ok(self.stale || self.slots_elapsed(slot)? >= MARKET_STALE_AFTER_SLOTS_ELAPSED)
    }

    /// Same as `is_stale` but with a custom window, ignoring the stale flag
    pub fn is_older_than(&self, slot: u64, max_slots_elapsed: u64) -> Result<bool> {
        Ok(self.slots_elapsed(slot)? > max_slots_elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_stale() {
        let last_update = LastUpdate::new(10);
        assert!(last_update.is_stale(10).unwrap());
    }

    #[test]
    fn fresh_only_within_the_same_slot() {
        let mut last_update = LastUpdate::new(10);
        last_update.update_slot(12);
        assert!(!last_update.is_stale(12).unwrap());
        assert!(last_update.is_stale(13).unwrap());

        last_update.mark_stale();
        assert!(last_update.is_stale(12).unwrap());
    }

    #[test]
    fn slot_in_the_past_is_an_error() {
        let last_update = LastUpdate::new(10);
        assert!(last_update.slots_elapsed(9).is_err());
    }

    #[test]
    fn custom_window() {
        let mut last_update = LastUpdate::new(0);
        last_update.update_slot(100);
        last_update.mark_stale();
        assert!(!last_update.is_older_than(110, 10).unwrap());
        assert!(last_update.is_older_than(111, 10).unwrap());
    }
}
