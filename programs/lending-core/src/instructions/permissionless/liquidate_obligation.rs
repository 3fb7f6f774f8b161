use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::events::ObligationLiquidated;
use crate::state::{LendingMarket, LoanKind, Obligation, Reserve};

/// Accounts for liquidating an unhealthy obligation
#[derive(Accounts)]
pub struct LiquidateObligation<'info> {
    /// Liquidator repaying the debt
    pub liquidator: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the collateral supply
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// The unhealthy obligation
    #[account(
        mut,
        constraint = obligation.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub obligation: Box<Account<'info, Obligation>>,

    /// The reserve of the debt being repaid
    #[account(
        mut,
        constraint = repay_reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub repay_reserve: Box<Account<'info, Reserve>>,

    /// The reserve of the collateral being seized
    #[account(
        constraint = withdraw_reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub withdraw_reserve: Box<Account<'info, Reserve>>,

    /// Liquidator's liquidity wallet (source)
    #[account(
        mut,
        constraint = source_liquidity_wallet.key() != repay_reserve.liquidity.supply @ LendingError::InvalidAccountInput,
        constraint = source_liquidity_wallet.key() != withdraw_reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub source_liquidity_wallet: Box<Account<'info, TokenAccount>>,

    /// Liquidator's collateral wallet (destination)
    #[account(
        mut,
        constraint = destination_collateral_wallet.key() != withdraw_reserve.collateral.supply @ LendingError::InvalidAccountInput,
        constraint = destination_collateral_wallet.key() != repay_reserve.collateral.supply @ LendingError::InvalidAccountInput
    )]
    pub destination_collateral_wallet: Box<Account<'info, TokenAccount>>,

    /// Repay reserve's liquidity supply
    #[account(
        mut,
        constraint = repay_reserve_liquidity_supply.key() == repay_reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub repay_reserve_liquidity_supply: Box<Account<'info, TokenAccount>>,

    /// Withdraw reserve's collateral supply
    #[account(
        mut,
        constraint = withdraw_reserve_collateral_supply.key() == withdraw_reserve.collateral.supply @ LendingError::InvalidAccountInput
    )]
    pub withdraw_reserve_collateral_supply: Box<Account<'info, TokenAccount>>,

    /// Token program
    pub token_program: Program<'info, Token>,
}

/// Liquidate an unhealthy obligation
///
/// The liquidator repays part of a loan and receives collateral worth the
/// repaid value plus the withdraw reserve's liquidation bonus. At most half
/// of the obligation's borrowed value is liquidated at once, except for
/// loans of a couple of tokens which are closed in full.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `liquidity_amount` - Maximum amount of liquidity to repay
/// * `loan_kind` - Which loan of the repay reserve to liquidate
pub fn handler(
    ctx: Context<LiquidateObligation>,
    liquidity_amount: u64,
    loan_kind: LoanKind,
) -> Result<()> {
    require!(liquidity_amount > 0, LendingError::InvalidAmount);

    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let repay_reserve_key = ctx.accounts.repay_reserve.key();
    let withdraw_reserve_key = ctx.accounts.withdraw_reserve.key();

    let repay_reserve = &mut ctx.accounts.repay_reserve;
    let withdraw_reserve = &ctx.accounts.withdraw_reserve;
    let obligation = &mut ctx.accounts.obligation;

    if repay_reserve.is_stale(clock.slot)? || withdraw_reserve.is_stale(clock.slot)? {
        msg!("Reserves must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }
    if obligation.is_stale(clock.slot)? {
        msg!("Obligation is stale and must be refreshed in the current slot");
        return err!(LendingError::ObligationStale);
    }
    obligation.check_liquidatable()?;

    let (collateral_index, collateral) =
        obligation.find_collateral(&withdraw_reserve_key).ok_or_else(|| {
            msg!("Obligation has no such reserve collateral");
            error!(LendingError::ObligationCollateralEmpty)
        })?;
    let (liquidity_index, liquidity) = obligation
        .find_liquidity(&repay_reserve_key, loan_kind)
        .ok_or_else(|| {
            msg!("Obligation has no such reserve liquidity");
            error!(LendingError::ObligationLiquidityEmpty)
        })?;

    let amounts = obligation.calculate_liquidation(
        liquidity_amount,
        &liquidity,
        &collateral,
        withdraw_reserve.config.liquidation_bonus,
    )?;

    repay_reserve
        .liquidity
        .repay(amounts.repay_amount, amounts.settle_amount)?;
    repay_reserve.mark_stale();
    obligation.repay(liquidity_index, amounts.settle_amount)?;
    obligation.withdraw(collateral_index, amounts.withdraw_amount)?;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.source_liquidity_wallet.to_account_info(),
                to: ctx.accounts.repay_reserve_liquidity_supply.to_account_info(),
                authority: ctx.accounts.liquidator.to_account_info(),
            },
        ),
        amounts.repay_amount,
    )?;

    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.withdraw_reserve_collateral_supply.to_account_info(),
                to: ctx.accounts.destination_collateral_wallet.to_account_info(),
                authority: ctx.accounts.lending_market_authority.to_account_info(),
            },
            signer_seeds,
        ),
        amounts.withdraw_amount,
    )?;

    emit!(ObligationLiquidated {
        obligation: ctx.accounts.obligation.key(),
        liquidator: ctx.accounts.liquidator.key(),
        repay_reserve: repay_reserve_key,
        withdraw_reserve: withdraw_reserve_key,
        repay_amount: amounts.repay_amount,
        withdraw_amount: amounts.withdraw_amount,
    });

    msg!(
        "Liquidated {} liquidity for {} collateral",
        amounts.repay_amount,
        amounts.withdraw_amount
    );

    Ok(())
}
