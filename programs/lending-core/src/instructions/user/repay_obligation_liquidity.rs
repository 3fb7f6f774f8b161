use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::errors::LendingError;
use crate::events::LiquidityRepaid;
use crate::state::{LendingMarket, LoanKind, Obligation, Reserve};

/// Accounts for repaying borrowed liquidity
#[derive(Accounts)]
pub struct RepayObligationLiquidity<'info> {
    /// Anyone may repay on behalf of the obligation
    pub repayer: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// Obligation whose loan is repaid
    #[account(
        mut,
        constraint = obligation.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub obligation: Box<Account<'info, Obligation>>,

    /// The reserve the loan was taken from
    #[account(
        mut,
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Repayer's liquidity wallet (source)
    #[account(
        mut,
        constraint = source_liquidity_wallet.key() != reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub source_liquidity_wallet: Box<Account<'info, TokenAccount>>,

    /// Reserve's liquidity supply (destination)
    #[account(
        mut,
        constraint = reserve_liquidity_supply.key() == reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub reserve_liquidity_supply: Box<Account<'info, TokenAccount>>,

    /// Token program
    pub token_program: Program<'info, Token>,
}

/// Repay borrowed liquidity
///
/// Repaying more than is owed settles the whole loan and transfers only
/// the owed amount, rounded up.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `liquidity_amount` - Amount of liquidity to repay, `u64::MAX` for all
/// * `loan_kind` - Which loan of the reserve to repay
pub fn handler(
    ctx: Context<RepayObligationLiquidity>,
    liquidity_amount: u64,
    loan_kind: LoanKind,
) -> Result<()> {
    require!(liquidity_amount > 0, LendingError::InvalidAmount);

    let clock = Clock::get()?;
    let reserve_key = ctx.accounts.reserve.key();
    let reserve = &mut ctx.accounts.reserve;
    let obligation = &mut ctx.accounts.obligation;

    if reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }
    if obligation.is_stale(clock.slot)? {
        msg!("Obligation is stale and must be refreshed in the current slot");
        return err!(LendingError::ObligationStale);
    }

    let (index, liquidity) = obligation
        .find_liquidity(&reserve_key, loan_kind)
        .ok_or_else(|| {
            msg!("Obligation has no such reserve liquidity");
            error!(LendingError::ObligationLiquidityEmpty)
        })?;

    let amounts = reserve.calculate_repay(liquidity_amount, liquidity.borrowed_amount)?;

    reserve
        .liquidity
        .repay(amounts.repay_amount, amounts.settle_amount)?;
    reserve.mark_stale();
    obligation.repay(index, amounts.settle_amount)?;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.source_liquidity_wallet.to_account_info(),
                to: ctx.accounts.reserve_liquidity_supply.to_account_info(),
                authority: ctx.accounts.repayer.to_account_info(),
            },
        ),
        amounts.repay_amount,
    )?;

    emit!(LiquidityRepaid {
        obligation: ctx.accounts.obligation.key(),
        reserve: reserve_key,
        repayer: ctx.accounts.repayer.key(),
        repay_amount: amounts.repay_amount,
    });

    msg!("Repaid {} liquidity", amounts.repay_amount);

    Ok(())
}
