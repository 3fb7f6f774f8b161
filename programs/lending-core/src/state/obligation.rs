use std::cmp::Ordering;

use anchor_lang::prelude::*;

use crate::constants::{
    LIQUIDATION_CLOSE_AMOUNT, LIQUIDATION_CLOSE_FACTOR, MAX_OBLIGATION_RESERVES, NO_LEVERAGE,
};
use crate::errors::LendingError;
use crate::math::{Decimal, TryAdd, TryDiv, TryMul, TrySub};
use crate::state::{LastUpdate, Reserve};

/// User's position in the lending market
/// PDA Seeds: ["obligation", lending_market, owner]
#[account]
#[derive(InitSpace, Default)]
pub struct Obligation {
    /// Version for future upgrades
    pub version: u8,

    /// Bump seed for PDA derivation
    pub bump: u8,

    /// The lending market this obligation belongs to
    pub lending_market: Pubkey,

    /// Owner of this obligation
    pub owner: Pubkey,

    /// Refreshed by `refresh_obligation`, marked stale by every mutation
    pub last_update: LastUpdate,

    /// Deposits and borrows, one slot per reserve and loan kind
    pub reserves: [ObligationReserve; MAX_OBLIGATION_RESERVES],

    /// Market value of all deposits
    pub deposited_value: Decimal,

    /// Market value of all borrows
    pub borrowed_value: Decimal,

    /// Market value of all borrows, leveraged loans divided by their leverage
    pub collateralized_borrowed_value: Decimal,

    /// Sum of deposit values weighted by loan to value ratio
    pub allowed_borrow_value: Decimal,

    /// Sum of deposit values weighted by liquidation threshold
    pub unhealthy_borrow_value: Decimal,

    /// Reserved space for future upgrades
    pub _padding: [u8; 32],
}

/// A single obligation slot
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, InitSpace, PartialEq, Eq)]
pub enum ObligationReserve {
    Empty,
    Collateral { inner: ObligationCollateral },
    Liquidity { inner: ObligationLiquidity },
}

impl Default for ObligationReserve {
    fn default() -> Self {
        Self::Empty
    }
}

/// Collateral tokens deposited into an obligation
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, InitSpace, Default, PartialEq, Eq)]
pub struct ObligationCollateral {
    pub deposit_reserve: Pubkey,

    /// Amount of reserve collateral tokens
    pub deposited_amount: u64,

    /// Value as of the last refresh
    pub market_value: Decimal,

    /// Emissions for this deposit accrue from this slot
    pub emissions_claimable_from_slot: u64,
}

/// Liquidity borrowed by an obligation
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, InitSpace, Default, PartialEq, Eq)]
pub struct ObligationLiquidity {
    pub borrow_reserve: Pubkey,

    /// Borrowed tokens plus interest
    pub borrowed_amount: Decimal,

    /// Reserve's cumulative borrow rate when interest was last accrued
    pub cumulative_borrow_rate: Decimal,

    /// Value as of the last refresh
    pub market_value: Decimal,

    pub loan_kind: LoanKind,

    /// Emissions for this loan accrue from this slot
    pub emissions_claimable_from_slot: u64,
}

/// What borrowed liquidity is used for
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, InitSpace, PartialEq, Eq)]
pub enum LoanKind {
    /// Liquidity was sent to the borrower
    Standard,
    /// Liquidity sits in an AMM farm, `leverage` is in percent
    YieldFarming { leverage: u64 },
}

impl Default for LoanKind {
    fn default() -> Self {
        Self::Standard
    }
}

/// Amounts moved by a liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationAmounts {
    /// Debt removed from the obligation
    pub settle_amount: Decimal,

    /// Liquidity transferred from the liquidator
    pub repay_amount: u64,

    /// Collateral transferred to the liquidator
    pub withdraw_amount: u64,
}

/// Position an obligation slot holds in a reserve, as seen by emissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionClaim {
    pub reserve: Pubkey,
    pub is_loan: bool,

    /// Borrowed liquidity for loans, deposited collateral otherwise
    pub amount: Decimal,

    /// Slot the previous claim ended at
    pub claimable_from_slot: u64,
}

impl Obligation {
    /// Seed prefix for PDA derivation
    pub const SEED_PREFIX: &'static [u8] = b"obligation";

    pub fn is_stale(&self, slot: u64) -> Result<bool> {
        self.last_update.is_stale(slot)
    }

    pub fn mark_stale(&mut self) {
        self.last_update.mark_stale();
    }

    pub fn is_healthy(&self) -> bool {
        self.borrowed_value <= self.unhealthy_borrow_value
    }

    /// Fails unless the obligation has both deposits and borrows and its
    /// borrowed value is past the unhealthy threshold
    pub fn check_liquidatable(&self) -> Result<()> {
        if self.deposited_value.is_zero() {
            msg!("Collateral deposited value is zero");
            return err!(LendingError::ObligationDepositsZero);
        }
        if self.borrowed_value.is_zero() {
            msg!("Liquidity borrowed value is zero");
            return err!(LendingError::ObligationLiquidityEmpty);
        }
        if self.is_healthy() {
            msg!("Obligation is healthy and cannot be liquidated");
            return err!(LendingError::ObligationHealthy);
        }

        Ok(())
    }

    pub fn has_deposits(&self) -> bool {
        self.reserves
            .iter()
            .any(|r| matches!(r, ObligationReserve::Collateral { .. }))
    }

    pub fn has_borrows(&self) -> bool {
        self.reserves
            .iter()
            .any(|r| matches!(r, ObligationReserve::Liquidity { .. }))
    }

    /// Borrow value left before reaching the allowed borrow value
    pub fn remaining_borrow_value(&self) -> Decimal {
        self.allowed_borrow_value
            .try_sub(self.collateralized_borrowed_value)
            .unwrap_or_else(|_| Decimal::zero())
    }

    pub fn find_collateral(&self, deposit_reserve: &Pubkey) -> Option<(usize, ObligationCollateral)> {
        self.reserves.iter().enumerate().find_map(|(index, r)| match r {
            ObligationReserve::Collateral { inner } if inner.deposit_reserve == *deposit_reserve => {
                Some((index, *inner))
            }
            _ => None,
        })
    }

    pub fn find_liquidity(
        &self,
        borrow_reserve: &Pubkey,
        loan_kind: LoanKind,
    ) -> Option<(usize, ObligationLiquidity)> {
        self.reserves.iter().enumerate().find_map(|(index, r)| match r {
            ObligationReserve::Liquidity { inner }
                if inner.borrow_reserve == *borrow_reserve && inner.loan_kind == loan_kind =>
            {
                Some((index, *inner))
            }
            _ => None,
        })
    }

    fn empty_slot(&self) -> Result<usize> {
        self.reserves
            .iter()
            .position(|r| *r == ObligationReserve::Empty)
            .ok_or_else(|| {
                msg!(
                    "Obligation already holds {} reserves",
                    MAX_OBLIGATION_RESERVES
                );
                error!(LendingError::ObligationReserveLimit)
            })
    }

    /// Adds collateral, allocating a slot for a new reserve
    pub fn deposit(&mut self, deposit_reserve: Pubkey, collateral_amount: u64, slot: u64) -> Result<()> {
        match self.find_collateral(&deposit_reserve) {
            Some((index, mut collateral)) => {
                collateral.deposited_amount = collateral
                    .deposited_amount
                    .checked_add(collateral_amount)
                    .ok_or(LendingError::MathOverflow)?;
                self.reserves[index] = ObligationReserve::Collateral { inner: collateral };
            }
            None => {
                let index = self.empty_slot()?;
                self.reserves[index] = ObligationReserve::Collateral {
                    inner: ObligationCollateral {
                        deposit_reserve,
                        deposited_amount: collateral_amount,
                        market_value: Decimal::zero(),
                        emissions_claimable_from_slot: slot,
                    },
                };
            }
        }

        self.mark_stale();
        Ok(())
    }

    /// Removes collateral from slot `index`, freeing the slot at zero
    pub fn withdraw(&mut self, index: usize, collateral_amount: u64) -> Result<()> {
        let ObligationReserve::Collateral { mut inner } = self.reserves[index] else {
            return err!(LendingError::ObligationCollateralEmpty);
        };

        let remaining = inner
            .deposited_amount
            .checked_sub(collateral_amount)
            .ok_or(LendingError::MathOverflow)?;
        self.reserves[index] = if remaining == 0 {
            ObligationReserve::Empty
        } else {
            let withdrawn_value = inner
                .market_value
                .try_mul(collateral_amount)?
                .try_div(inner.deposited_amount)?;
            inner.market_value = inner.market_value.try_sub(withdrawn_value)?;
            inner.deposited_amount = remaining;
            ObligationReserve::Collateral { inner }
        };

        self.mark_stale();
        Ok(())
    }

    /// Adds debt, allocating a slot for a new reserve and loan kind
    pub fn borrow(
        &mut self,
        borrow_reserve: Pubkey,
        borrow_amount: Decimal,
        loan_kind: LoanKind,
        cumulative_borrow_rate: Decimal,
        slot: u64,
    ) -> Result<()> {
        match self.find_liquidity(&borrow_reserve, loan_kind) {
            Some((index, mut liquidity)) => {
                liquidity.accrue_interest(cumulative_borrow_rate)?;
                liquidity.borrowed_amount = liquidity.borrowed_amount.try_add(borrow_amount)?;
                self.reserves[index] = ObligationReserve::Liquidity { inner: liquidity };
            }
            None => {
                let index = self.empty_slot()?;
                self.reserves[index] = ObligationReserve::Liquidity {
                    inner: ObligationLiquidity {
                        borrow_reserve,
                        borrowed_amount: borrow_amount,
                        cumulative_borrow_rate,
                        market_value: Decimal::zero(),
                        loan_kind,
                        emissions_claimable_from_slot: slot,
                    },
                };
            }
        }

        self.mark_stale();
        Ok(())
    }

    /// Removes `settle_amount` of debt from slot `index`, freeing the slot at zero
    pub fn repay(&mut self, index: usize, settle_amount: Decimal) -> Result<()> {
        let ObligationReserve::Liquidity { mut inner } = self.reserves[index] else {
            return err!(LendingError::ObligationLiquidityEmpty);
        };

        self.reserves[index] = if settle_amount >= inner.borrowed_amount {
            ObligationReserve::Empty
        } else {
            inner.borrowed_amount = inner.borrowed_amount.try_sub(settle_amount)?;
            ObligationReserve::Liquidity { inner }
        };

        self.mark_stale();
        Ok(())
    }

    /// Returns the position in slot `index` and marks its emissions as
    /// claimed up to `slot`
    pub fn claim_emissions(&mut self, index: usize, slot: u64) -> Result<EmissionClaim> {
        let claim = match self.reserves.get_mut(index) {
            Some(ObligationReserve::Collateral { inner }) => {
                let claim = EmissionClaim {
                    reserve: inner.deposit_reserve,
                    is_loan: false,
                    amount: Decimal::from(inner.deposited_amount),
                    claimable_from_slot: inner.emissions_claimable_from_slot,
                };
                inner.emissions_claimable_from_slot = slot;
                claim
            }
            Some(ObligationReserve::Liquidity { inner }) => {
                let claim = EmissionClaim {
                    reserve: inner.borrow_reserve,
                    is_loan: true,
                    amount: inner.borrowed_amount,
                    claimable_from_slot: inner.emissions_claimable_from_slot,
                };
                inner.emissions_claimable_from_slot = slot;
                claim
            }
            _ => {
                msg!("Obligation slot {} holds no position", index);
                return err!(LendingError::InvalidObligationSlot);
            }
        };

        Ok(claim)
    }

    /// Recomputes every slot's value and the obligation aggregates.
    /// Every reserve referenced by a slot must be in `reserves` and fresh.
    pub fn refresh(&mut self, slot: u64, reserves: &[(Pubkey, &Reserve)]) -> Result<()> {
        let mut deposited_value = Decimal::zero();
        let mut borrowed_value = Decimal::zero();
        let mut collateralized_borrowed_value = Decimal::zero();
        let mut allowed_borrow_value = Decimal::zero();
        let mut unhealthy_borrow_value = Decimal::zero();

        for obligation_reserve in self.reserves.iter_mut() {
            match obligation_reserve {
                ObligationReserve::Empty => {}
                ObligationReserve::Collateral { inner } => {
                    let reserve = fresh_reserve(reserves, &inner.deposit_reserve, slot)?;

                    let market_value = reserve.collateral_market_value(inner.deposited_amount)?;
                    inner.market_value = market_value;

                    let loan_to_value_rate =
                        Decimal::from_percent(reserve.config.loan_to_value_ratio);
                    let liquidation_threshold_rate =
                        Decimal::from_percent(reserve.config.liquidation_threshold);

                    deposited_value = deposited_value.try_add(market_value)?;
                    allowed_borrow_value = allowed_borrow_value
                        .try_add(market_value.try_mul(loan_to_value_rate)?)?;
                    unhealthy_borrow_value = unhealthy_borrow_value
                        .try_add(market_value.try_mul(liquidation_threshold_rate)?)?;
                }
                ObligationReserve::Liquidity { inner } => {
                    let reserve = fresh_reserve(reserves, &inner.borrow_reserve, slot)?;

                    inner.accrue_interest(reserve.liquidity.cumulative_borrow_rate)?;
                    let market_value = reserve.market_value(inner.borrowed_amount)?;
                    inner.market_value = market_value;

                    borrowed_value = borrowed_value.try_add(market_value)?;
                    collateralized_borrowed_value = collateralized_borrowed_value
                        .try_add(inner.collateralized_value()?)?;
                }
            }
        }

        self.deposited_value = deposited_value;
        self.borrowed_value = borrowed_value;
        self.collateralized_borrowed_value = collateralized_borrowed_value;
        self.allowed_borrow_value = allowed_borrow_value;
        self.unhealthy_borrow_value = unhealthy_borrow_value;
        self.last_update.update_slot(slot);

        Ok(())
    }

    /// Collateral tokens that can leave the slot without the obligation's
    /// collateralized borrow value exceeding its allowed borrow value
    pub fn max_withdraw_amount(
        &self,
        collateral: &ObligationCollateral,
        loan_to_value_ratio: u8,
        requested_amount: u64,
    ) -> Result<u64> {
        if collateral.deposited_amount == 0 {
            return err!(LendingError::ObligationCollateralEmpty);
        }

        let withdraw_amount = requested_amount.min(collateral.deposited_amount);
        if !self.has_borrows() {
            return Ok(withdraw_amount);
        }

        if self.deposited_value.is_zero() {
            msg!("Obligation deposited value is zero");
            return err!(LendingError::ObligationDepositsZero);
        }

        let loan_to_value_rate = Decimal::from_percent(loan_to_value_ratio);
        let max_withdraw_value = if loan_to_value_rate.is_zero() {
            collateral.market_value
        } else {
            self.remaining_borrow_value()
                .try_div(loan_to_value_rate)?
                .min(collateral.market_value)
        };
        if max_withdraw_value.is_zero() {
            msg!("Maximum withdraw value is zero");
            return err!(LendingError::WithdrawTooLarge);
        }

        let withdraw_value = collateral
            .market_value
            .try_mul(withdraw_amount)?
            .try_div(collateral.deposited_amount)?;
        if withdraw_value > max_withdraw_value {
            msg!(
                "Withdraw value is {}, but it cannot exceed maximum withdraw value {}",
                withdraw_value,
                max_withdraw_value
            );
            return err!(LendingError::WithdrawTooLarge);
        }

        Ok(withdraw_amount)
    }

    /// Splits a liquidation of up to `amount` tokens into debt settled,
    /// tokens repaid and collateral seized
    pub fn calculate_liquidation(
        &self,
        amount: u64,
        liquidity: &ObligationLiquidity,
        collateral: &ObligationCollateral,
        liquidation_bonus: u8,
    ) -> Result<LiquidationAmounts> {
        let bonus_rate = Decimal::from_percent(liquidation_bonus).try_add(Decimal::one())?;

        if collateral.market_value.is_zero() {
            msg!("Obligation deposit value is zero");
            return err!(LendingError::ObligationDepositsZero);
        }
        if liquidity.market_value.is_zero() {
            msg!("Obligation borrow value is zero");
            return err!(LendingError::ObligationLiquidityEmpty);
        }

        let max_amount = Decimal::from(amount).min(liquidity.borrowed_amount);

        let settle_amount;
        let repay_amount;
        let withdraw_amount;

        // tiny loans are closed in full so no dust debt is left behind
        if liquidity.borrowed_amount <= Decimal::from(LIQUIDATION_CLOSE_AMOUNT) {
            let liquidation_value = liquidity.market_value.try_mul(bonus_rate)?;
            match liquidation_value.cmp(&collateral.market_value) {
                Ordering::Greater => {
                    let repay_pct = collateral.market_value.try_div(liquidation_value)?;
                    settle_amount = liquidity.borrowed_amount;
                    repay_amount = max_amount.try_mul(repay_pct)?.try_ceil_u64()?;
                    withdraw_amount = collateral.deposited_amount;
                }
                Ordering::Equal => {
                    settle_amount = liquidity.borrowed_amount;
                    repay_amount = max_amount.try_ceil_u64()?;
                    withdraw_amount = collateral.deposited_amount;
                }
                Ordering::Less => {
                    let withdraw_pct = liquidation_value.try_div(collateral.market_value)?;
                    settle_amount = liquidity.borrowed_amount;
                    repay_amount = max_amount.try_floor_u64()?;
                    withdraw_amount = Decimal::from(collateral.deposited_amount)
                        .try_mul(withdraw_pct)?
                        .try_floor_u64()?;
                }
            }
        } else {
            let max_liquidation_value = self
                .borrowed_value
                .try_mul(Decimal::from_percent(LIQUIDATION_CLOSE_FACTOR))?
                .min(liquidity.market_value);
            let max_liquidation_pct = max_liquidation_value.try_div(liquidity.market_value)?;
            let max_liquidation_amount = liquidity.borrowed_amount.try_mul(max_liquidation_pct)?;

            let liquidation_amount = max_liquidation_amount.min(max_amount);
            let liquidation_pct = liquidation_amount.try_div(liquidity.borrowed_amount)?;
            let liquidation_value = liquidity
                .market_value
                .try_mul(liquidation_pct)?
                .try_mul(bonus_rate)?;

            match liquidation_value.cmp(&collateral.market_value) {
                Ordering::Greater => {
                    let repay_pct = collateral.market_value.try_div(liquidation_value)?;
                    settle_amount = liquidation_amount.try_mul(repay_pct)?;
                    repay_amount = settle_amount.try_ceil_u64()?;
                    withdraw_amount = collateral.deposited_amount;
                }
                Ordering::Equal => {
                    settle_amount = liquidation_amount;
                    repay_amount = settle_amount.try_ceil_u64()?;
                    withdraw_amount = collateral.deposited_amount;
                }
                Ordering::Less => {
                    let withdraw_pct = liquidation_value.try_div(collateral.market_value)?;
                    settle_amount = liquidation_amount;
                    repay_amount = settle_amount.try_floor_u64()?;
                    withdraw_amount = Decimal::from(collateral.deposited_amount)
                        .try_mul(withdraw_pct)?
                        .try_floor_u64()?;
                }
            }
        }

        if repay_amount == 0 || withdraw_amount == 0 {
            msg!(
                "Liquidation would repay {} and withdraw {}",
                repay_amount,
                withdraw_amount
            );
            return err!(LendingError::LiquidationTooSmall);
        }

        Ok(LiquidationAmounts {
            settle_amount,
            repay_amount,
            withdraw_amount,
        })
    }
}

impl ObligationLiquidity {
    /// Brings the borrowed amount up to the reserve's cumulative borrow rate
    pub fn accrue_interest(&mut self, cumulative_borrow_rate: Decimal) -> Result<()> {
        match cumulative_borrow_rate.cmp(&self.cumulative_borrow_rate) {
            Ordering::Less => {
                msg!("Interest rate cannot be negative");
                err!(LendingError::MathOverflow)
            }
            Ordering::Equal => Ok(()),
            Ordering::Greater => {
                let compounded_interest_rate =
                    cumulative_borrow_rate.try_div(self.cumulative_borrow_rate)?;
                self.borrowed_amount = self.borrowed_amount.try_mul(compounded_interest_rate)?;
                self.cumulative_borrow_rate = cumulative_borrow_rate;
                Ok(())
            }
        }
    }

    /// Market value which counts against the allowed borrow value
    pub fn collateralized_value(&self) -> Result<Decimal> {
        match self.loan_kind {
            LoanKind::Standard => Ok(self.market_value),
            LoanKind::YieldFarming { leverage } => self
                .market_value
                .try_mul(NO_LEVERAGE)?
                .try_div(leverage),
        }
    }
}

fn fresh_reserve<'a>(reserves: &[(Pubkey, &'a Reserve)], key: &Pubkey, slot: u64) -> Result<&'a Reserve> {
    let (_, reserve) = reserves.iter().find(|(k, _)| k == key).ok_or_else(|| {
        msg!("No valid account provided for reserve '{}'", key);
        error!(LendingError::MissingReserveAccount)
    })?;

    if reserve.is_stale(slot)? {
        msg!("Reserve '{}' is stale", key);
        return err!(LendingError::ReserveStale);
    }

    Ok(reserve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::reserve::tests::reserve;
    use proptest::prelude::*;

    fn liquidity(borrowed: Decimal, market_value: u64) -> ObligationLiquidity {
        ObligationLiquidity {
            borrowed_amount: borrowed,
            cumulative_borrow_rate: Decimal::one(),
            market_value: Decimal::from(market_value),
            ..Default::default()
        }
    }

    fn collateral(deposited: u64, market_value: Decimal) -> ObligationCollateral {
        ObligationCollateral {
            deposited_amount: deposited,
            market_value,
            ..Default::default()
        }
    }

    fn obligation_with_borrowed_value(value: u64) -> Obligation {
        Obligation {
            borrowed_value: Decimal::from(value),
            ..Default::default()
        }
    }

    #[test]
    fn deposit_reuses_slot_per_reserve() {
        let mut obligation = Obligation::default();
        let reserve = Pubkey::new_unique();

        obligation.deposit(reserve, 10, 1).unwrap();
        obligation.deposit(reserve, 5, 2).unwrap();

        let (index, collateral) = obligation.find_collateral(&reserve).unwrap();
        assert_eq!(index, 0);
        assert_eq!(collateral.deposited_amount, 15);
        assert_eq!(collateral.emissions_claimable_from_slot, 1);
        assert!(obligation.has_deposits());
        assert!(!obligation.has_borrows());
    }

    #[test]
    fn claiming_emissions_advances_the_slot() {
        let mut obligation = Obligation::default();
        let reserve = Pubkey::new_unique();
        obligation.deposit(reserve, 10, 5).unwrap();

        let claim = obligation.claim_emissions(0, 50).unwrap();
        assert_eq!(claim.reserve, reserve);
        assert!(!claim.is_loan);
        assert_eq!(claim.amount, Decimal::from(10u64));
        assert_eq!(claim.claimable_from_slot, 5);

        let (_, collateral) = obligation.find_collateral(&reserve).unwrap();
        assert_eq!(collateral.emissions_claimable_from_slot, 50);

        assert_eq!(
            obligation.claim_emissions(1, 60).unwrap_err(),
            LendingError::InvalidObligationSlot.into()
        );
        assert_eq!(
            obligation.claim_emissions(MAX_OBLIGATION_RESERVES, 60).unwrap_err(),
            LendingError::InvalidObligationSlot.into()
        );
    }

    #[test]
    fn slots_are_limited() {
        let mut obligation = Obligation::default();
        for _ in 0..MAX_OBLIGATION_RESERVES {
            obligation.deposit(Pubkey::new_unique(), 1, 0).unwrap();
        }
        assert_eq!(
            obligation.deposit(Pubkey::new_unique(), 1, 0).unwrap_err(),
            LendingError::ObligationReserveLimit.into()
        );
    }

    #[test]
    fn withdraw_all_frees_the_slot() {
        let mut obligation = Obligation::default();
        let reserve = Pubkey::new_unique();
        obligation.deposit(reserve, 10, 0).unwrap();

        obligation.withdraw(0, 4).unwrap();
        assert_eq!(obligation.find_collateral(&reserve).unwrap().1.deposited_amount, 6);

        obligation.withdraw(0, 6).unwrap();
        assert_eq!(obligation.reserves[0], ObligationReserve::Empty);
        assert!(obligation.withdraw(0, 1).is_err());
    }

    #[test]
    fn loan_kinds_use_separate_slots() {
        let mut obligation = Obligation::default();
        let reserve = Pubkey::new_unique();
        let farming = LoanKind::YieldFarming { leverage: 300 };

        obligation
            .borrow(reserve, Decimal::from(10u64), LoanKind::Standard, Decimal::one(), 0)
            .unwrap();
        obligation
            .borrow(reserve, Decimal::from(20u64), farming, Decimal::one(), 0)
            .unwrap();

        assert_eq!(obligation.find_liquidity(&reserve, LoanKind::Standard).unwrap().0, 0);
        assert_eq!(obligation.find_liquidity(&reserve, farming).unwrap().0, 1);
    }

    #[test]
    fn repay_in_full_frees_the_slot() {
        let mut obligation = Obligation::default();
        let reserve = Pubkey::new_unique();
        obligation
            .borrow(reserve, Decimal::from(10u64), LoanKind::Standard, Decimal::one(), 0)
            .unwrap();

        obligation.repay(0, Decimal::from(4u64)).unwrap();
        let (_, liquidity) = obligation.find_liquidity(&reserve, LoanKind::Standard).unwrap();
        assert_eq!(liquidity.borrowed_amount, Decimal::from(6u64));

        obligation.repay(0, Decimal::from(6u64)).unwrap();
        assert_eq!(obligation.reserves[0], ObligationReserve::Empty);
    }

    #[test]
    fn liquidity_accrues_through_cumulative_rate() {
        let mut liquidity = liquidity(Decimal::from(100u64), 0);
        liquidity
            .accrue_interest(Decimal::from_percent(110))
            .unwrap();
        assert_eq!(liquidity.borrowed_amount, Decimal::from(110u64));
        assert!(liquidity.accrue_interest(Decimal::one()).is_err());
    }

    #[test]
    fn borrowed_value_is_zero_until_refresh() {
        let collateral_key = Pubkey::new_unique();
        let borrow_key = Pubkey::new_unique();
        let collateral_reserve = reserve(1_000, 10, 5);
        let borrow_reserve = reserve(1_000, 2, 5);

        let mut obligation = Obligation::default();
        obligation.deposit(collateral_key, 100, 5).unwrap();
        obligation
            .borrow(borrow_key, Decimal::from(100u64), LoanKind::Standard, Decimal::one(), 5)
            .unwrap();
        assert_eq!(obligation.borrowed_value, Decimal::zero());
        assert!(obligation.is_stale(5).unwrap());

        let reserves = [(collateral_key, &collateral_reserve), (borrow_key, &borrow_reserve)];
        obligation.refresh(5, &reserves).unwrap();
        assert!(!obligation.is_stale(5).unwrap());
        assert_eq!(obligation.deposited_value, Decimal::from(1_000u64));
        assert_eq!(obligation.borrowed_value, Decimal::from(200u64));
        assert_eq!(obligation.allowed_borrow_value, Decimal::from(500u64));
        assert_eq!(obligation.unhealthy_borrow_value, Decimal::from(550u64));
        assert!(obligation.is_healthy());

        let snapshot = (
            obligation.deposited_value,
            obligation.borrowed_value,
            obligation.allowed_borrow_value,
        );
        obligation.refresh(5, &reserves).unwrap();
        assert_eq!(
            snapshot,
            (
                obligation.deposited_value,
                obligation.borrowed_value,
                obligation.allowed_borrow_value,
            )
        );
    }

    #[test]
    fn leveraged_loans_count_divided_by_leverage() {
        let collateral_key = Pubkey::new_unique();
        let borrow_key = Pubkey::new_unique();
        let collateral_reserve = reserve(1_000, 10, 0);
        let borrow_reserve = reserve(1_000, 1, 0);

        let mut obligation = Obligation::default();
        obligation.deposit(collateral_key, 100, 0).unwrap();
        obligation
            .borrow(
                borrow_key,
                Decimal::from(300u64),
                LoanKind::YieldFarming { leverage: 300 },
                Decimal::one(),
                0,
            )
            .unwrap();

        obligation
            .refresh(0, &[(collateral_key, &collateral_reserve), (borrow_key, &borrow_reserve)])
            .unwrap();
        assert_eq!(obligation.borrowed_value, Decimal::from(300u64));
        assert_eq!(obligation.collateralized_borrowed_value, Decimal::from(100u64));
        assert_eq!(obligation.remaining_borrow_value(), Decimal::from(400u64));
    }

    #[test]
    fn refresh_requires_every_reserve() {
        let key = Pubkey::new_unique();
        let mut obligation = Obligation::default();
        obligation.deposit(key, 100, 0).unwrap();

        assert_eq!(
            obligation.refresh(0, &[]).unwrap_err(),
            LendingError::MissingReserveAccount.into()
        );

        let mut stale = reserve(1_000, 1, 0);
        stale.mark_stale();
        assert_eq!(
            obligation.refresh(0, &[(key, &stale)]).unwrap_err(),
            LendingError::ReserveStale.into()
        );
    }

    #[test]
    fn only_unhealthy_obligations_are_liquidatable() {
        let mut obligation = Obligation::default();
        assert_eq!(
            obligation.check_liquidatable().unwrap_err(),
            LendingError::ObligationDepositsZero.into()
        );

        obligation.deposited_value = Decimal::from(1_000u64);
        assert_eq!(
            obligation.check_liquidatable().unwrap_err(),
            LendingError::ObligationLiquidityEmpty.into()
        );

        obligation.borrowed_value = Decimal::from(800u64);
        obligation.unhealthy_borrow_value = Decimal::from(800u64);
        assert_eq!(
            obligation.check_liquidatable().unwrap_err(),
            LendingError::ObligationHealthy.into()
        );

        obligation.borrowed_value = Decimal::from(801u64);
        assert!(obligation.check_liquidatable().is_ok());
    }

    #[test]
    fn withdraw_without_borrows_is_unrestricted() {
        let obligation = Obligation::default();
        let deposit = collateral(100, Decimal::from(1_000u64));
        assert_eq!(obligation.max_withdraw_amount(&deposit, 50, 150).unwrap(), 100);
        assert_eq!(
            obligation
                .max_withdraw_amount(&collateral(0, Decimal::zero()), 50, 1)
                .unwrap_err(),
            LendingError::ObligationCollateralEmpty.into()
        );
    }

    #[test]
    fn withdraw_keeps_borrows_covered() {
        let mut obligation = Obligation::default();
        obligation
            .borrow(Pubkey::new_unique(), Decimal::from(200u64), LoanKind::Standard, Decimal::one(), 0)
            .unwrap();
        obligation.deposited_value = Decimal::from(1_000u64);
        obligation.allowed_borrow_value = Decimal::from(500u64);
        obligation.collateralized_borrowed_value = Decimal::from(200u64);
        let deposit = collateral(100, Decimal::from(1_000u64));

        // 300 of remaining borrow value at 50% LTV frees 600 of collateral value
        assert_eq!(obligation.max_withdraw_amount(&deposit, 50, 60).unwrap(), 60);
        assert_eq!(
            obligation.max_withdraw_amount(&deposit, 50, 61).unwrap_err(),
            LendingError::WithdrawTooLarge.into()
        );
    }

    #[test]
    fn liquidation_repays_in_full_when_collateral_suffices() {
        let obligation = obligation_with_borrowed_value(1_500);
        let amounts = obligation
            .calculate_liquidation(
                100,
                &liquidity(Decimal::from(100u64), 500),
                &collateral(80, Decimal::from(570u64)),
                5,
            )
            .unwrap();
        assert_eq!(amounts.settle_amount, Decimal::from(100u64));
        assert_eq!(amounts.repay_amount, 100);
        assert_eq!(amounts.withdraw_amount, 73);
    }

    #[test]
    fn liquidation_is_bounded_by_collateral_and_close_factor() {
        let obligation = obligation_with_borrowed_value(1_500);
        let amounts = obligation
            .calculate_liquidation(
                100,
                &liquidity(Decimal::from(100u64), 900),
                &collateral(80, Decimal::from(570u64)),
                5,
            )
            .unwrap();
        assert!(amounts.settle_amount > Decimal::from(60u64));
        assert!(amounts.settle_amount < Decimal::from(61u64));
        assert_eq!(amounts.repay_amount, 61);
        assert_eq!(amounts.withdraw_amount, 80);
    }

    #[test]
    fn liquidation_with_collateral_matching_bonus_value() {
        let obligation = obligation_with_borrowed_value(1_500);
        let amounts = obligation
            .calculate_liquidation(
                100,
                &liquidity(Decimal::from(100u64), 800),
                &collateral(
                    80,
                    Decimal::from(787u64).try_add(Decimal::from_percent(50)).unwrap(),
                ),
                5,
            )
            .unwrap();
        assert_eq!(
            amounts.settle_amount,
            Decimal::from(93u64).try_add(Decimal::from_percent(75)).unwrap()
        );
        assert_eq!(amounts.repay_amount, 94);
        assert_eq!(amounts.withdraw_amount, 80);
    }

    #[test]
    fn tiny_loans_are_closed_in_full() {
        let obligation = obligation_with_borrowed_value(1_500);
        let tiny = liquidity(Decimal::one(), 500);

        let amounts = obligation
            .calculate_liquidation(100, &tiny, &collateral(80, Decimal::from(570u64)), 5)
            .unwrap();
        assert_eq!(
            (amounts.settle_amount, amounts.repay_amount, amounts.withdraw_amount),
            (Decimal::one(), 1, 73)
        );

        let amounts = obligation
            .calculate_liquidation(100, &tiny, &collateral(7, Decimal::from(10u64)), 5)
            .unwrap();
        assert_eq!(
            (amounts.settle_amount, amounts.repay_amount, amounts.withdraw_amount),
            (Decimal::one(), 1, 7)
        );

        let amounts = obligation
            .calculate_liquidation(
                100,
                &liquidity(Decimal::one(), 100),
                &collateral(50, Decimal::from(105u64)),
                5,
            )
            .unwrap();
        assert_eq!(
            (amounts.settle_amount, amounts.repay_amount, amounts.withdraw_amount),
            (Decimal::one(), 1, 50)
        );
    }

    #[test]
    fn dust_liquidation_is_rejected() {
        let obligation = obligation_with_borrowed_value(1_500);
        assert_eq!(
            obligation
                .calculate_liquidation(
                    100,
                    &liquidity(Decimal::from(100u64), 500),
                    &collateral(1, Decimal::from(100_000u64)),
                    5,
                )
                .unwrap_err(),
            LendingError::LiquidationTooSmall.into()
        );
    }

    proptest! {
        #[test]
        fn more_collateral_never_lowers_allowed_borrow_value(first in 1u64..1_000_000, second in 1u64..1_000_000) {
            let key = Pubkey::new_unique();
            let reserve = reserve(10_000_000, 3, 0);
            let mut obligation = Obligation::default();

            obligation.deposit(key, first, 0).unwrap();
            obligation.refresh(0, &[(key, &reserve)]).unwrap();
            let before = obligation.allowed_borrow_value;

            obligation.deposit(key, second, 0).unwrap();
            obligation.refresh(0, &[(key, &reserve)]).unwrap();
            prop_assert!(obligation.allowed_borrow_value >= before);
        }
    }
}
