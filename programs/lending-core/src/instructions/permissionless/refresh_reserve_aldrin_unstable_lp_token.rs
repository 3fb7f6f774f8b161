use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, TokenAccount};

use crate::adapters::{unstable_lp_token_market_price, PriceOracle, PythPrice};
use crate::errors::LendingError;
use crate::events::ReserveRefreshed;
use crate::state::{Reserve, ReserveOracle};

/// Accounts for refreshing a reserve which lends an Aldrin LP token
#[derive(Accounts)]
pub struct RefreshReserveAldrinUnstableLpToken<'info> {
    #[account(mut)]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Pyth price account of the vault's token
    /// CHECK: Validated against reserve.liquidity.oracle
    pub oracle_price: UncheckedAccount<'info>,

    /// Pool vault recorded in the reserve's oracle
    #[account(
        constraint = reserve
            .liquidity
            .oracle
            .is_aldrin_unstable_lp_token(&pool_vault.key(), &oracle_price.key())
            @ LendingError::InvalidOracleConfig
    )]
    pub pool_vault: Box<Account<'info, TokenAccount>>,

    /// The LP token mint
    #[account(
        constraint = lp_token_mint.key() == reserve.liquidity.mint @ LendingError::InvalidAccountInput
    )]
    pub lp_token_mint: Box<Account<'info, Mint>>,
}

/// Refresh a reserve lending an Aldrin LP token
///
/// Same as `refresh_reserve` but the price is derived from the pool vault,
/// the vault token's Pyth price and the LP token supply.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
pub fn handler(ctx: Context<RefreshReserveAldrinUnstableLpToken>) -> Result<()> {
    let clock = Clock::get()?;

    let vault_decimals = match ctx.accounts.reserve.liquidity.oracle {
        ReserveOracle::AldrinUnstableLpToken { vault_decimals, .. } => vault_decimals,
        ReserveOracle::Pyth { .. } => {
            msg!("Reserve is priced by Pyth, use refresh_reserve");
            return err!(LendingError::InvalidOracleConfig);
        }
    };
    let vault_token_price = {
        let data = ctx.accounts.oracle_price.try_borrow_data()?;
        PythPrice::load(&data)?.market_price(clock.slot)?
    };
    let market_price = unstable_lp_token_market_price(
        ctx.accounts.lp_token_mint.supply,
        ctx.accounts.lp_token_mint.decimals,
        ctx.accounts.pool_vault.amount,
        vault_decimals,
        vault_token_price,
    )?;

    let reserve = &mut ctx.accounts.reserve;
    reserve.refresh(clock.slot, market_price)?;

    emit!(ReserveRefreshed {
        reserve: reserve.key(),
        slot: clock.slot,
        market_price: market_price.to_scaled_val()?,
        cumulative_borrow_rate: reserve.liquidity.cumulative_borrow_rate.to_scaled_val()?,
        available_amount: reserve.liquidity.available_amount,
        borrowed_amount: reserve.liquidity.borrowed_amount.to_scaled_val()?,
    });

    Ok(())
}
