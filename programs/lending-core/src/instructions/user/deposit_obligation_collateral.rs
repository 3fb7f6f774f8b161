use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::errors::LendingError;
use crate::events::CollateralDeposited;
use crate::state::{LendingMarket, Obligation, Reserve};

/// Accounts for depositing reserve collateral into an obligation
#[derive(Accounts)]
pub struct DepositObligationCollateral<'info> {
    /// Obligation owner
    pub owner: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// Owner's obligation
    #[account(
        mut,
        has_one = owner @ LendingError::IllegalOwner,
        constraint = obligation.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub obligation: Box<Account<'info, Obligation>>,

    /// Reserve whose collateral is deposited
    #[account(
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Owner's collateral wallet (source)
    #[account(
        mut,
        constraint = source_collateral_wallet.key() != reserve.collateral.supply @ LendingError::InvalidAccountInput
    )]
    pub source_collateral_wallet: Box<Account<'info, TokenAccount>>,

    /// Reserve's collateral supply (destination)
    #[account(
        mut,
        constraint = reserve_collateral_supply.key() == reserve.collateral.supply @ LendingError::InvalidAccountInput
    )]
    pub reserve_collateral_supply: Box<Account<'info, TokenAccount>>,

    /// Token program
    pub token_program: Program<'info, Token>,
}

/// Deposit collateral tokens into an obligation
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `collateral_amount` - Amount of reserve collateral tokens to deposit
pub fn handler(ctx: Context<DepositObligationCollateral>, collateral_amount: u64) -> Result<()> {
    require!(collateral_amount > 0, LendingError::InvalidAmount);

    let clock = Clock::get()?;
    let reserve = &ctx.accounts.reserve;

    if reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }
    reserve.config.check_collateral_enabled()?;

    let reserve_key = reserve.key();
    ctx.accounts
        .obligation
        .deposit(reserve_key, collateral_amount, clock.slot)?;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.source_collateral_wallet.to_account_info(),
                to: ctx.accounts.reserve_collateral_supply.to_account_info(),
                authority: ctx.accounts.owner.to_account_info(),
            },
        ),
        collateral_amount,
    )?;

    emit!(CollateralDeposited {
        obligation: ctx.accounts.obligation.key(),
        reserve: reserve_key,
        collateral_amount,
    });

    msg!("Deposited {} collateral into obligation", collateral_amount);

    Ok(())
}
