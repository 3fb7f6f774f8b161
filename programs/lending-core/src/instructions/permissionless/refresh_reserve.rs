use anchor_lang::prelude::*;

use crate::adapters::{PriceOracle, PythPrice};
use crate::errors::LendingError;
use crate::events::ReserveRefreshed;
use crate::state::Reserve;

/// Accounts for refreshing a reserve
#[derive(Accounts)]
pub struct RefreshReserve<'info> {
    /// The reserve to refresh
    #[account(mut)]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Pyth price account configured for the reserve
    /// CHECK: Validated against reserve.liquidity.oracle
    #[account(
        constraint = reserve.liquidity.oracle.is_pyth(&oracle_price.key()) @ LendingError::InvalidOracleConfig
    )]
    pub oracle_price: UncheckedAccount<'info>,
}

/// Refresh reserve state
///
/// Accrues interest for every slot since the last refresh and stores the
/// current oracle price. Anyone can call this; most instructions require
/// the reserve to have been refreshed in the same slot.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
pub fn handler(ctx: Context<RefreshReserve>) -> Result<()> {
    let clock = Clock::get()?;

    let market_price = {
        let data = ctx.accounts.oracle_price.try_borrow_data()?;
        PythPrice::load(&data)?.market_price(clock.slot)?
    };

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
