use anchor_lang::prelude::*;

use crate::errors::LendingError;
use crate::events::ReserveConfigUpdated;
use crate::state::{LendingMarket, Reserve, ReserveConfig};

/// Accounts for updating reserve configuration
#[derive(Accounts)]
pub struct UpdateReserveConfig<'info> {
    /// Owner of the lending market
    pub owner: Signer<'info>,

    #[account(
        has_one = owner @ LendingError::InvalidMarketOwner
    )]
    pub lending_market: Account<'info, LendingMarket>,

    #[account(
        mut,
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Account<'info, Reserve>,
}

/// Replace the reserve configuration
///
/// The reserve is marked stale so that obligations are revalued with the new
/// ratios before anyone acts on them.
pub fn handler(ctx: Context<UpdateReserveConfig>, config: ReserveConfig) -> Result<()> {
    config.validate()?;

    let reserve = &mut ctx.accounts.reserve;
    reserve.config = config;
    reserve.mark_stale();

    emit!(ReserveConfigUpdated {
        reserve: reserve.key(),
        loan_to_value_ratio: config.loan_to_value_ratio,
        liquidation_threshold: config.liquidation_threshold,
        max_leverage: config.max_leverage,
    });

    msg!("Reserve config updated: {}", reserve.key());

    Ok(())
}
