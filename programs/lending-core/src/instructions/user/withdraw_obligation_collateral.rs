use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::events::CollateralWithdrawn;
use crate::state::{LendingMarket, Obligation, Reserve};

/// Accounts for withdrawing collateral from an obligation
#[derive(Accounts)]
pub struct WithdrawObligationCollateral<'info> {
    /// Obligation owner
    pub owner: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the collateral supply
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// Owner's obligation
    #[account(
        mut,
        has_one = owner @ LendingError::IllegalOwner,
        constraint = obligation.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub obligation: Box<Account<'info, Obligation>>,

    /// Reserve whose collateral is withdrawn
    #[account(
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Reserve's collateral supply (source)
    #[account(
        mut,
        constraint = reserve_collateral_supply.key() == reserve.collateral.supply @ LendingError::InvalidAccountInput
    )]
    pub reserve_collateral_supply: Box<Account<'info, TokenAccount>>,

    /// Owner's collateral wallet (destination)
    #[account(
        mut,
        constraint = destination_collateral_wallet.key() != reserve.collateral.supply @ LendingError::InvalidAccountInput
    )]
    pub destination_collateral_wallet: Box<Account<'info, TokenAccount>>,

    /// Token program
    pub token_program: Program<'info, Token>,
}

/// Withdraw collateral tokens from an obligation
///
/// With open borrows the withdrawal may not push the collateralized borrow
/// value above the allowed borrow value of what remains.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `collateral_amount` - Requested amount, capped at the deposited amount
pub fn handler(ctx: Context<WithdrawObligationCollateral>, collateral_amount: u64) -> Result<()> {
    require!(collateral_amount > 0, LendingError::InvalidAmount);

    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let reserve_key = ctx.accounts.reserve.key();
    let reserve = &ctx.accounts.reserve;
    let obligation = &mut ctx.accounts.obligation;

    if reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }
    if obligation.is_stale(clock.slot)? {
        msg!("Obligation is stale and must be refreshed in the current slot");
        return err!(LendingError::ObligationStale);
    }

    let (index, collateral) = obligation.find_collateral(&reserve_key).ok_or_else(|| {
        msg!("Obligation has no such reserve collateral");
        error!(LendingError::ObligationCollateralEmpty)
    })?;

    let withdraw_amount = obligation.max_withdraw_amount(
        &collateral,
        reserve.config.loan_to_value_ratio,
        collateral_amount,
    )?;
    obligation.withdraw(index, withdraw_amount)?;

    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.reserve_collateral_supply.to_account_info(),
                to: ctx.accounts.destination_collateral_wallet.to_account_info(),
                authority: ctx.accounts.lending_market_authority.to_account_info(),
            },
            signer_seeds,
        ),
        withdraw_amount,
    )?;

    emit!(CollateralWithdrawn {
        obligation: ctx.accounts.obligation.key(),
        reserve: reserve_key,
        collateral_amount: withdraw_amount,
    });

    msg!("Withdrew {} collateral from obligation", withdraw_amount);

    Ok(())
}
