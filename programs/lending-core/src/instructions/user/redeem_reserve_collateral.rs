use anchor_lang::prelude::*;
use anchor_spl::token::{self, Burn, Mint, Token, TokenAccount, Transfer};

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::events::ReserveCollateralRedeemed;
use crate::state::{LendingMarket, Reserve};

/// Accounts for redeeming reserve collateral for liquidity
#[derive(Accounts)]
pub struct RedeemReserveCollateral<'info> {
    /// User redeeming collateral
    pub owner: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the liquidity supply
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// The reserve to redeem from
    #[account(
        mut,
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// User's collateral wallet, burned from
    #[account(
        mut,
        constraint = source_collateral_wallet.key() != reserve.collateral.supply @ LendingError::InvalidAccountInput
    )]
    pub source_collateral_wallet: Box<Account<'info, TokenAccount>>,

    /// Reserve's collateral mint
    #[account(
        mut,
        constraint = reserve_collateral_mint.key() == reserve.collateral.mint @ LendingError::InvalidAccountInput
    )]
    pub reserve_collateral_mint: Box<Account<'info, Mint>>,

    /// Reserve's liquidity supply (source)
    #[account(
        mut,
        constraint = reserve_liquidity_supply.key() == reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub reserve_liquidity_supply: Box<Account<'info, TokenAccount>>,

    /// User's liquidity wallet (destination)
    #[account(
        mut,
        constraint = destination_liquidity_wallet.key() != reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub destination_liquidity_wallet: Box<Account<'info, TokenAccount>>,

    /// Token program
    pub token_program: Program<'info, Token>,
}

/// Burn collateral tokens and receive the underlying liquidity
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `collateral_amount` - Amount of collateral tokens to redeem
pub fn handler(ctx: Context<RedeemReserveCollateral>, collateral_amount: u64) -> Result<()> {
    require!(collateral_amount > 0, LendingError::InvalidAmount);

    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let reserve = &mut ctx.accounts.reserve;

    if reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }

    let liquidity_amount = reserve.redeem_collateral(collateral_amount)?;

    token::burn(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Burn {
                mint: ctx.accounts.reserve_collateral_mint.to_account_info(),
                from: ctx.accounts.source_collateral_wallet.to_account_info(),
                authority: ctx.accounts.owner.to_account_info(),
            },
        ),
        collateral_amount,
    )?;

    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.reserve_liquidity_supply.to_account_info(),
                to: ctx.accounts.destination_liquidity_wallet.to_account_info(),
                authority: ctx.accounts.lending_market_authority.to_account_info(),
            },
            signer_seeds,
        ),
        liquidity_amount,
    )?;

    emit!(ReserveCollateralRedeemed {
        reserve: ctx.accounts.reserve.key(),
        owner: ctx.accounts.owner.key(),
        collateral_amount,
        liquidity_amount,
    });

    msg!(
        "Redeemed {} collateral for {} liquidity",
        collateral_amount,
        liquidity_amount
    );

    Ok(())
}
