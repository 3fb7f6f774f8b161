use anchor_lang::prelude::*;

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::events::LendingMarketInitialized;
use crate::math::Decimal;
use crate::state::{LendingMarket, UniversalAssetCurrency};

/// Accounts for initializing a new lending market
#[derive(Accounts)]
pub struct InitLendingMarket<'info> {
    /// Owner who will manage the lending market
    #[account(mut)]
    pub owner: Signer<'info>,

    /// The lending market account to initialize (fresh keypair)
    #[account(
        init,
        payer = owner,
        space = 8 + LendingMarket::INIT_SPACE,
    )]
    pub lending_market: Account<'info, LendingMarket>,

    /// Market authority which will own every reserve wallet
    /// CHECK: PDA, only its bump is stored
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// Oracle program every reserve price must come from
    /// CHECK: Only the key is stored
    #[account(executable)]
    pub oracle_program: UncheckedAccount<'info>,

    /// AMM program used for yield farming
    /// CHECK: Only the key is stored
    #[account(executable)]
    pub amm_program: UncheckedAccount<'info>,

    /// System program for account creation
    pub system_program: Program<'info, System>,
}

/// Initialize a new lending market
///
/// The owner also starts out as the admin bot. Flash loans start disabled.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `currency` - Currency every reserve oracle must quote prices in
pub fn handler(ctx: Context<InitLendingMarket>, currency: UniversalAssetCurrency) -> Result<()> {
    let lending_market = &mut ctx.accounts.lending_market;

    lending_market.version = 1;
    lending_market.authority_bump = ctx.bumps.lending_market_authority;
    lending_market.owner = ctx.accounts.owner.key();
    lending_market.admin_bot = ctx.accounts.owner.key();
    lending_market.currency = currency;
    lending_market.oracle_program = ctx.accounts.oracle_program.key();
    lending_market.amm_program = ctx.accounts.amm_program.key();
    lending_market.enable_flash_loans = false;
    lending_market.leveraged_compound_fee = 0;
    lending_market.vault_compound_fee = 0;
    lending_market.min_collateral_uac_value_for_leverage = Decimal::zero();
    lending_market._padding = [0u8; 64];

    emit!(LendingMarketInitialized {
        lending_market: lending_market.key(),
        owner: lending_market.owner,
        oracle_program: lending_market.oracle_program,
        amm_program: lending_market.amm_program,
    });

    msg!("Lending market initialized: {}", lending_market.key());
    msg!("Owner: {}", lending_market.owner);
    msg!("Currency: {:?}", lending_market.currency);

    Ok(())
}
