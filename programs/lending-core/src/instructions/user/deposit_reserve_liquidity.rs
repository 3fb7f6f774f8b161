use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, MintTo, Token, TokenAccount, Transfer};

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::events::ReserveLiquidityDeposited;
use crate::state::{LendingMarket, Reserve};

/// Accounts for depositing liquidity into a reserve
#[derive(Accounts)]
pub struct DepositReserveLiquidity<'info> {
    /// User depositing liquidity
    pub owner: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which mints reserve collateral
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// The reserve to deposit into
    #[account(
        mut,
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// User's liquidity wallet (source)
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

    /// Reserve's collateral mint
    #[account(
        mut,
        constraint = reserve_collateral_mint.key() == reserve.collateral.mint @ LendingError::InvalidAccountInput
    )]
    pub reserve_collateral_mint: Box<Account<'info, Mint>>,

    /// User's collateral wallet receiving the minted collateral
    #[account(
        mut,
        constraint = destination_collateral_wallet.key() != reserve.collateral.supply @ LendingError::InvalidAccountInput
    )]
    pub destination_collateral_wallet: Box<Account<'info, TokenAccount>>,

    /// Token program
    pub token_program: Program<'info, Token>,
}

/// Deposit liquidity into a reserve in exchange for collateral tokens
///
/// Collateral is minted at the reserve's current exchange rate, so earlier
/// depositors keep the interest accrued so far.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `liquidity_amount` - Amount of liquidity tokens to deposit
pub fn handler(ctx: Context<DepositReserveLiquidity>, liquidity_amount: u64) -> Result<()> {
    require!(liquidity_amount > 0, LendingError::InvalidAmount);

    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let reserve = &mut ctx.accounts.reserve;

    if reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }

    let collateral_amount = reserve.deposit_liquidity(liquidity_amount)?;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.source_liquidity_wallet.to_account_info(),
                to: ctx.accounts.reserve_liquidity_supply.to_account_info(),
                authority: ctx.accounts.owner.to_account_info(),
            },
        ),
        liquidity_amount,
    )?;

    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    token::mint_to(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            MintTo {
                mint: ctx.accounts.reserve_collateral_mint.to_account_info(),
                to: ctx.accounts.destination_collateral_wallet.to_account_info(),
                authority: ctx.accounts.lending_market_authority.to_account_info(),
            },
            signer_seeds,
        ),
        collateral_amount,
    )?;

    emit!(ReserveLiquidityDeposited {
        reserve: ctx.accounts.reserve.key(),
        owner: ctx.accounts.owner.key(),
        liquidity_amount,
        collateral_amount,
    });

    msg!(
        "Deposited {} liquidity for {} collateral",
        liquidity_amount,
        collateral_amount
    );

    Ok(())
}
