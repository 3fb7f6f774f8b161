use anchor_lang::prelude::*;

use crate::adapters::{AmmPool, Side, TokenLedger};
use crate::errors::LendingError;
use crate::math::{Decimal, TryMul, TrySub};

/// Wallets a farming position moves tokens through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionWallets {
    /// Reserve liquidity supply the loan comes from
    pub reserve_supply: Pubkey,
    pub base: Pubkey,
    pub quote: Pubkey,
    pub lp: Pubkey,
}

impl PositionWallets {
    /// Wallet holding the tokens `side` sells
    pub fn for_side(&self, side: Side) -> Pubkey {
        match side {
            Side::Ask => self.base,
            Side::Bid => self.quote,
        }
    }
}

/// Arguments of a leveraged position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenPosition {
    /// Side selling the reserve's tokens
    pub side: Side,
    /// Tokens moved from the reserve supply to the borrower
    pub liquidity_amount: u64,
    /// Part of `liquidity_amount` swapped for the other pool token
    pub swap_amount: u64,
    pub min_swap_return: u64,
    pub stake_lp_amount: u64,
}

fn gained(after: u64, before: u64) -> Result<u64> {
    after
        .checked_sub(before)
        .ok_or_else(|| error!(LendingError::MathOverflow))
}

/// Moves borrowed liquidity into the pool and stakes the minted LP tokens.
///
/// Whatever the AMM does, the borrower must not end up with more base, quote
/// or LP tokens than before.
pub fn open_position<P: AmmPool + TokenLedger>(
    pool: &mut P,
    wallets: &PositionWallets,
    position: OpenPosition,
) -> Result<()> {
    require!(position.stake_lp_amount > 0, LendingError::InvalidAmount);
    if position.swap_amount > position.liquidity_amount {
        msg!(
            "Cannot swap {} tokens out of {} borrowed",
            position.swap_amount,
            position.liquidity_amount
        );
        return err!(LendingError::InvalidArgument);
    }

    let base_before = pool.balance(&wallets.base)?;
    let quote_before = pool.balance(&wallets.quote)?;
    let lp_before = pool.balance(&wallets.lp)?;

    pool.transfer(
        &wallets.reserve_supply,
        &wallets.for_side(position.side),
        position.liquidity_amount,
    )?;

    if position.swap_amount > 0 {
        pool.swap(
            position.swap_amount,
            position.min_swap_return,
            position.side,
        )?;
    }

    let base_max = pool.balance(&wallets.base)?;
    let quote_max = pool.balance(&wallets.quote)?;
    pool.create_basket(position.stake_lp_amount, base_max, quote_max)?;
    pool.start_farming(position.stake_lp_amount)?;

    let leftovers = [
        ("base", base_before, pool.balance(&wallets.base)?),
        ("quote", quote_before, pool.balance(&wallets.quote)?),
        ("LP", lp_before, pool.balance(&wallets.lp)?),
    ];
    for (name, before, after) in leftovers {
        if after > before {
            msg!(
                "Borrower's {} wallet would keep {} tokens of the position",
                name,
                after - before
            );
            return err!(LendingError::PositionMustNotLeaveTokensWithBorrower);
        }
    }

    Ok(())
}

/// Unstakes the whole farming ticket, redeems the LP tokens and swaps the
/// other pool token back. Returns the reserve tokens the caller now holds.
pub fn close_position<P: AmmPool + TokenLedger>(
    pool: &mut P,
    wallets: &PositionWallets,
    side: Side,
) -> Result<u64> {
    let lp_before = pool.balance(&wallets.lp)?;
    pool.end_farming()?;
    let unstaked = gained(pool.balance(&wallets.lp)?, lp_before)?;

    let reserve_wallet = wallets.for_side(side);
    let other_wallet = wallets.for_side(!side);
    let reserve_before = pool.balance(&reserve_wallet)?;
    let other_before = pool.balance(&other_wallet)?;

    if unstaked > 0 {
        pool.redeem_basket(unstaked, 0, 0)?;
    }

    let other_redeemed = gained(pool.balance(&other_wallet)?, other_before)?;
    if other_redeemed > 0 {
        pool.swap(other_redeemed, 0, !side)?;
    }

    let withdrawn = gained(pool.balance(&reserve_wallet)?, reserve_before)?;
    msg!(
        "Unstaked {} LP tokens worth {} reserve tokens",
        unstaked,
        withdrawn
    );

    Ok(withdrawn)
}

/// Arguments of a compound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compound {
    /// LP tokens the bot stakes in exchange for the harvest
    pub stake_lp_amount: u64,
    pub lp_token_price: Decimal,
    /// Percentage of the harvest value the bot keeps
    pub compound_fee: u8,
}

/// Harvests the farming ticket into the bot's farm wallet and stakes the
/// bot's LP tokens in its place. The LP tokens must be worth at least the
/// harvest minus the fee. Returns the harvested amount.
pub fn compound_position<P, F>(
    pool: &mut P,
    farm_wallet: &Pubkey,
    compound: Compound,
    farm_value: F,
) -> Result<u64>
where
    P: AmmPool + TokenLedger,
    F: Fn(u64) -> Result<Decimal>,
{
    let farm_before = pool.balance(farm_wallet)?;
    pool.withdraw_farmed()?;
    let farmed = gained(pool.balance(farm_wallet)?, farm_before)?;

    let lp_value = compound.lp_token_price.try_mul(compound.stake_lp_amount)?;
    let farmed_value = farm_value(farmed)?;
    let fee = farmed_value.try_mul(Decimal::from_percent(compound.compound_fee))?;

    if lp_value < farmed_value.try_sub(fee)? {
        msg!(
            "Price of LP tokens ({}) is less than the price of farmed tokens ({}) minus fees ({})",
            lp_value,
            farmed_value,
            fee
        );
        return err!(LendingError::CompoundingLpPriceMustNotBeLessThanFarmPrice);
    }

    pool.start_farming(compound.stake_lp_amount)?;

    Ok(farmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash_loan::tests::MemoryLedger;

    /// Constant price pool: every LP token holds `base_per_lp` base and
    /// `quote_per_lp` quote, swaps are 1:1
    struct FakeAmm {
        ledger: MemoryLedger,
        wallets: PositionWallets,
        farm_wallet: Pubkey,
        base_per_lp: u64,
        quote_per_lp: u64,
        staked: u64,
        reward: u64,
    }

    impl FakeAmm {
        fn new(wallets: PositionWallets, balances: &[(Pubkey, u64)]) -> Self {
            Self {
                ledger: MemoryLedger::with(balances),
                wallets,
                farm_wallet: Pubkey::new_unique(),
                base_per_lp: 2,
                quote_per_lp: 2,
                staked: 0,
                reward: 0,
            }
        }

        fn debit(&self, wallet: &Pubkey, amount: u64) -> Result<()> {
            let balance = self
                .ledger
                .get(wallet)
                .checked_sub(amount)
                .ok_or(LendingError::InsufficientFunds)?;
            self.ledger.set(wallet, balance);
            Ok(())
        }

        fn credit(&self, wallet: &Pubkey, amount: u64) {
            self.ledger.set(wallet, self.ledger.get(wallet) + amount);
        }
    }

    impl AmmPool for FakeAmm {
        fn swap(&mut self, tokens: u64, min_tokens: u64, side: Side) -> Result<()> {
            require!(tokens >= min_tokens, LendingError::InvalidArgument);
            let (from, to) = match side {
                Side::Ask => (self.wallets.base, self.wallets.quote),
                Side::Bid => (self.wallets.quote, self.wallets.base),
            };
            self.debit(&from, tokens)?;
            self.credit(&to, tokens);
            Ok(())
        }

        fn create_basket(&mut self, lp_tokens: u64, base_max: u64, quote_max: u64) -> Result<()> {
            let base = lp_tokens * self.base_per_lp;
            let quote = lp_tokens * self.quote_per_lp;
            require!(base <= base_max && quote <= quote_max, LendingError::InvalidArgument);
            self.debit(&self.wallets.base, base)?;
            self.debit(&self.wallets.quote, quote)?;
            self.credit(&self.wallets.lp, lp_tokens);
            Ok(())
        }

        fn start_farming(&mut self, lp_tokens: u64) -> Result<()> {
            self.debit(&self.wallets.lp, lp_tokens)?;
            self.staked += lp_tokens;
            Ok(())
        }

        fn end_farming(&mut self) -> Result<()> {
            self.credit(&self.wallets.lp, self.staked);
            self.staked = 0;
            Ok(())
        }

        fn redeem_basket(&mut self, lp_tokens: u64, _: u64, _: u64) -> Result<()> {
            self.debit(&self.wallets.lp, lp_tokens)?;
            self.credit(&self.wallets.base, lp_tokens * self.base_per_lp);
            self.credit(&self.wallets.quote, lp_tokens * self.quote_per_lp);
            Ok(())
        }

        fn withdraw_farmed(&mut self) -> Result<()> {
            self.credit(&self.farm_wallet, self.reward);
            Ok(())
        }
    }

    impl TokenLedger for FakeAmm {
        fn balance(&self, wallet: &Pubkey) -> Result<u64> {
            self.ledger.balance(wallet)
        }

        fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
            self.ledger.transfer(from, to, amount)
        }
    }

    fn wallets() -> PositionWallets {
        PositionWallets {
            reserve_supply: Pubkey::new_unique(),
            base: Pubkey::new_unique(),
            quote: Pubkey::new_unique(),
            lp: Pubkey::new_unique(),
        }
    }

    fn open(stake_lp_amount: u64) -> OpenPosition {
        OpenPosition {
            side: Side::Ask,
            liquidity_amount: 100,
            swap_amount: 50,
            min_swap_return: 50,
            stake_lp_amount,
        }
    }

    #[test]
    fn open_stakes_everything_borrowed() {
        let wallets = wallets();
        let mut amm = FakeAmm::new(wallets, &[(wallets.reserve_supply, 1_000)]);

        open_position(&mut amm, &wallets, open(25)).unwrap();

        assert_eq!(amm.staked, 25);
        assert_eq!(amm.ledger.get(&wallets.reserve_supply), 900);
        assert_eq!(amm.ledger.get(&wallets.base), 0);
        assert_eq!(amm.ledger.get(&wallets.quote), 0);
        assert_eq!(amm.ledger.get(&wallets.lp), 0);
    }

    #[test]
    fn open_must_not_leave_tokens_with_borrower() {
        let wallets = wallets();
        let mut amm = FakeAmm::new(wallets, &[(wallets.reserve_supply, 1_000)]);

        assert_eq!(
            open_position(&mut amm, &wallets, open(20)).unwrap_err(),
            LendingError::PositionMustNotLeaveTokensWithBorrower.into()
        );
    }

    #[test]
    fn open_may_use_borrower_tokens() {
        let wallets = wallets();
        let mut amm = FakeAmm::new(
            wallets,
            &[(wallets.reserve_supply, 1_000), (wallets.quote, 10)],
        );

        open_position(&mut amm, &wallets, open(25)).unwrap();
        assert_eq!(amm.ledger.get(&wallets.quote), 10);
    }

    #[test]
    fn open_rejects_bad_arguments() {
        let wallets = wallets();
        let mut amm = FakeAmm::new(wallets, &[(wallets.reserve_supply, 1_000)]);

        assert_eq!(
            open_position(&mut amm, &wallets, open(0)).unwrap_err(),
            LendingError::InvalidAmount.into()
        );

        let mut position = open(25);
        position.swap_amount = 101;
        assert_eq!(
            open_position(&mut amm, &wallets, position).unwrap_err(),
            LendingError::InvalidArgument.into()
        );
    }

    #[test]
    fn close_returns_reserve_tokens() {
        let wallets = wallets();
        let mut amm = FakeAmm::new(wallets, &[(wallets.reserve_supply, 1_000)]);
        open_position(&mut amm, &wallets, open(25)).unwrap();

        let withdrawn = close_position(&mut amm, &wallets, Side::Ask).unwrap();

        assert_eq!(withdrawn, 100);
        assert_eq!(amm.staked, 0);
        assert_eq!(amm.ledger.get(&wallets.base), 100);
        assert_eq!(amm.ledger.get(&wallets.quote), 0);
    }

    #[test]
    fn close_on_quote_side_swaps_base_back() {
        let wallets = wallets();
        let mut amm = FakeAmm::new(wallets, &[(wallets.reserve_supply, 1_000)]);
        let mut position = open(25);
        position.side = Side::Bid;
        open_position(&mut amm, &wallets, position).unwrap();

        assert_eq!(close_position(&mut amm, &wallets, Side::Bid).unwrap(), 100);
        assert_eq!(amm.ledger.get(&wallets.quote), 100);
    }

    #[test]
    fn compound_requires_fair_lp_value() {
        let wallets = wallets();
        let mut amm = FakeAmm::new(wallets, &[(wallets.lp, 100)]);
        amm.reward = 30;
        let farm_wallet = amm.farm_wallet;
        let farm_value = |amount: u64| -> Result<Decimal> { Ok(Decimal::from(amount)) };

        // 13 LP at 2 is worth 26, harvest minus 10% fee is 27
        let unfair = Compound {
            stake_lp_amount: 13,
            lp_token_price: Decimal::from(2u64),
            compound_fee: 10,
        };
        assert_eq!(
            compound_position(&mut amm, &farm_wallet, unfair, farm_value).unwrap_err(),
            LendingError::CompoundingLpPriceMustNotBeLessThanFarmPrice.into()
        );

        let fair = Compound {
            stake_lp_amount: 14,
            ..unfair
        };
        let farmed = compound_position(&mut amm, &farm_wallet, fair, farm_value).unwrap();
        assert_eq!(farmed, 30);
        assert_eq!(amm.staked, 14);
        assert_eq!(amm.ledger.get(&wallets.lp), 86);
    }
}
