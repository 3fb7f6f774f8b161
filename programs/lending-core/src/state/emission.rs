use anchor_lang::prelude::*;

use crate::constants::{EMISSION_CLOSE_GRACE_SLOTS, EMISSION_TOKENS_COUNT, SNAPSHOTS_COUNT};
use crate::errors::LendingError;
use crate::math::{Decimal, TryDiv, TryMul};

/// Rewards distributed to a reserve's lenders and borrowers.
///
/// Each token emits a fixed amount per slot to all participants together.
/// A position's share is its size relative to the reserve's average size
/// over the claimed period, as recorded in `ReserveCapSnapshots`.
#[account]
#[derive(InitSpace)]
pub struct EmissionStrategy {
    /// Reserve whose participants receive the rewards
    pub reserve: Pubkey,

    /// Emitted tokens, unused entries have the default wallet
    pub tokens: [EmittedToken; EMISSION_TOKENS_COUNT],

    /// Positions earn nothing for slots before this one
    pub starts_at_slot: u64,

    /// No rewards accrue beyond this slot
    pub ends_at_slot: u64,

    /// Positions must wait this long between claims
    pub min_slots_elapsed_before_claim: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, InitSpace, PartialEq, Eq)]
pub struct EmittedToken {
    /// Wallet the market authority pays rewards from
    pub wallet: Pubkey,

    /// Shared by all borrowers of the reserve
    pub tokens_per_slot_for_loans: u64,

    /// Shared by all depositors of the reserve
    pub tokens_per_slot_for_deposits: u64,
}

impl EmittedToken {
    pub fn is_empty(&self) -> bool {
        self.wallet == Pubkey::default()
    }
}

impl EmissionStrategy {
    /// Tokens with a wallet, in order
    pub fn tokens(&self) -> impl Iterator<Item = &EmittedToken> {
        self.tokens.iter().filter(|t| !t.is_empty())
    }

    /// Returns the `(from, to)` slot range a position can claim now
    pub fn claimable_slots(&self, claimable_from_slot: u64, slot: u64) -> Result<(u64, u64)> {
        let claim_from = claimable_from_slot.max(self.starts_at_slot);
        let earliest_claim = claim_from
            .checked_add(self.min_slots_elapsed_before_claim)
            .ok_or(LendingError::MathOverflow)?;
        if earliest_claim > slot {
            msg!(
                "Emission becomes claimable at slot {}, current slot is {}",
                earliest_claim,
                slot
            );
            return err!(LendingError::EmissionNotClaimableYet);
        }

        let claim_to = slot.min(self.ends_at_slot);
        if claim_to <= claim_from {
            msg!("Emission ended at slot {}", self.ends_at_slot);
            return err!(LendingError::EmissionEnded);
        }

        Ok((claim_from, claim_to))
    }

    /// Slot after which the strategy can be closed
    pub fn closable_from_slot(&self) -> Result<u64> {
        self.ends_at_slot
            .checked_add(self.min_slots_elapsed_before_claim)
            .and_then(|s| s.checked_add(EMISSION_CLOSE_GRACE_SLOTS))
            .ok_or_else(|| error!(LendingError::MathOverflow))
    }
}

/// Reward for a position of size `share` in a pool of average size
/// `pool_average` over `slots` slots
pub fn emitted_amount(
    tokens_per_slot: u64,
    slots: u64,
    share: Decimal,
    pool_average: Decimal,
) -> Result<u64> {
    if tokens_per_slot == 0 || pool_average.is_zero() {
        return Ok(0);
    }

    Decimal::from(tokens_per_slot)
        .try_mul(slots)?
        .try_div(pool_average)?
        .try_mul(share)?
        .try_floor_u64()
}

/// Ring buffer of reserve utilization, written by the admin bot
#[account(zero_copy)]
pub struct ReserveCapSnapshots {
    /// Reserve the snapshots describe
    pub reserve: Pubkey,

    /// Index of the most recent entry
    pub ring_buffer_tip: u64,

    /// Unwritten entries have slot zero
    pub ring_buffer: [ReserveCap; SNAPSHOTS_COUNT],
}

/// Reserve supply at a slot. Borrowed amount is floored to whole tokens.
#[zero_copy]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReserveCap {
    pub available_amount: u64,
    pub borrowed_amount: u64,
    pub slot: u64,
}

impl ReserveCapSnapshots {
    /// Advances the tip and overwrites the oldest entry
    pub fn push(&mut self, cap: ReserveCap) {
        let tip = (self.ring_buffer_tip as usize + 1) % SNAPSHOTS_COUNT;
        self.ring_buffer_tip = tip as u64;
        self.ring_buffer[tip] = cap;
    }

    pub fn latest(&self) -> Option<&ReserveCap> {
        let cap = &self.ring_buffer[self.ring_buffer_tip as usize % SNAPSHOTS_COUNT];
        (cap.slot != 0).then_some(cap)
    }

    pub fn average_borrowed_amount(&self, since: u64) -> Result<Decimal> {
        let (count, borrowed, _) = self.sums_since(since)?;
        Decimal::from(borrowed).try_div(count)
    }

    /// Average of available plus borrowed liquidity
    pub fn average_cap(&self, since: u64) -> Result<Decimal> {
        let (count, borrowed, available) = self.sums_since(since)?;
        Decimal::from(
            borrowed
                .checked_add(available)
                .ok_or(LendingError::MathOverflow)?,
        )
        .try_div(count)
    }

    /// Count, borrowed sum and available sum of entries written at or after
    /// `since`, falling back to the latest entry
    fn sums_since(&self, since: u64) -> Result<(u64, u128, u128)> {
        let latest = self.latest().ok_or_else(|| {
            msg!("Reserve has no cap snapshots yet");
            error!(LendingError::NotEnoughSnapshots)
        })?;

        let (count, borrowed, available) = self
            .ring_buffer
            .iter()
            .filter(|cap| cap.slot != 0 && cap.slot >= since)
            .fold((0u64, 0u128, 0u128), |(count, borrowed, available), cap| {
                (
                    count + 1,
                    borrowed + cap.borrowed_amount as u128,
                    available + cap.available_amount as u128,
                )
            });

        if count == 0 {
            return Ok((
                1,
                latest.borrowed_amount as u128,
                latest.available_amount as u128,
            ));
        }

        Ok((count, borrowed, available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshots() -> Box<ReserveCapSnapshots> {
        Box::new(ReserveCapSnapshots {
            reserve: Pubkey::default(),
            ring_buffer_tip: 0,
            ring_buffer: [ReserveCap::default(); SNAPSHOTS_COUNT],
        })
    }

    fn cap(slot: u64, available_amount: u64, borrowed_amount: u64) -> ReserveCap {
        ReserveCap {
            available_amount,
            borrowed_amount,
            slot,
        }
    }

    fn strategy() -> EmissionStrategy {
        EmissionStrategy {
            reserve: Pubkey::new_unique(),
            tokens: [EmittedToken::default(); EMISSION_TOKENS_COUNT],
            starts_at_slot: 100,
            ends_at_slot: 200,
            min_slots_elapsed_before_claim: 10,
        }
    }

    #[test]
    fn empty_buffer_has_not_enough_snapshots() {
        assert_eq!(
            snapshots().average_cap(0).unwrap_err(),
            LendingError::NotEnoughSnapshots.into()
        );
    }

    #[test]
    fn zeroed_account_is_an_empty_buffer() {
        let mut snapshots: Box<ReserveCapSnapshots> = Box::new(bytemuck::Zeroable::zeroed());
        assert_eq!(snapshots.ring_buffer_tip, 0);
        assert_eq!(
            snapshots.average_cap(0).unwrap_err(),
            LendingError::NotEnoughSnapshots.into()
        );

        snapshots.push(cap(5, 70, 30));
        let bytes = bytemuck::bytes_of(&snapshots.ring_buffer[1]);
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..8], &70u64.to_le_bytes());
        assert_eq!(&bytes[16..], &5u64.to_le_bytes());
    }

    #[test]
    fn averages_entries_since_slot() {
        let mut snapshots = snapshots();
        snapshots.push(cap(10, 90, 10));
        snapshots.push(cap(20, 80, 20));
        snapshots.push(cap(30, 70, 30));

        assert_eq!(snapshots.ring_buffer_tip, 3);
        assert_eq!(snapshots.average_borrowed_amount(0).unwrap(), Decimal::from(20u64));
        assert_eq!(snapshots.average_cap(0).unwrap(), Decimal::from(100u64));
        assert_eq!(snapshots.average_borrowed_amount(25).unwrap(), Decimal::from(30u64));
        // nothing newer than 40, latest entry stands in
        assert_eq!(snapshots.average_borrowed_amount(40).unwrap(), Decimal::from(30u64));
    }

    #[test]
    fn tip_wraps_around() {
        let mut snapshots = snapshots();
        for slot in 1..=(SNAPSHOTS_COUNT as u64 + 5) {
            snapshots.push(cap(slot, 1, 1));
        }
        assert_eq!(snapshots.ring_buffer_tip, 5);
        assert_eq!(snapshots.latest().unwrap().slot, SNAPSHOTS_COUNT as u64 + 5);
        assert_eq!(snapshots.average_cap(0).unwrap(), Decimal::from(2u64));
    }

    #[test]
    fn claim_window() {
        let strategy = strategy();

        // claims start counting from the strategy start
        assert_eq!(strategy.claimable_slots(0, 150).unwrap(), (100, 150));
        assert_eq!(
            strategy.claimable_slots(145, 150).unwrap_err(),
            LendingError::EmissionNotClaimableYet.into()
        );
        // rewards stop at the end slot
        assert_eq!(strategy.claimable_slots(150, 300).unwrap(), (150, 200));
        assert_eq!(
            strategy.claimable_slots(200, 300).unwrap_err(),
            LendingError::EmissionEnded.into()
        );
    }

    #[test]
    fn close_waits_for_grace_period() {
        let strategy = strategy();
        assert_eq!(
            strategy.closable_from_slot().unwrap(),
            210 + EMISSION_CLOSE_GRACE_SLOTS
        );
    }

    #[test]
    fn reward_is_proportional_to_share() {
        // 10 tokens per slot for 50 slots, a quarter of the pool
        let amount = emitted_amount(10, 50, Decimal::from(25u64), Decimal::from(100u64)).unwrap();
        assert_eq!(amount, 125);
        assert_eq!(emitted_amount(10, 50, Decimal::from(25u64), Decimal::zero()).unwrap(), 0);
    }

    #[test]
    fn empty_tokens_are_skipped() {
        let mut strategy = strategy();
        strategy.tokens[1].wallet = Pubkey::new_unique();
        assert_eq!(strategy.tokens().count(), 1);
    }
}
