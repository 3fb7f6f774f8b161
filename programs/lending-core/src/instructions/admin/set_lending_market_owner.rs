use anchor_lang::prelude::*;

use crate::errors::LendingError;
use crate::events::LendingMarketOwnerChanged;
use crate::state::LendingMarket;

/// Accounts for handing over a lending market
#[derive(Accounts)]
pub struct SetLendingMarketOwner<'info> {
    /// Current owner of the lending market
    pub owner: Signer<'info>,

    /// Account which becomes the owner
    /// CHECK: Any account can own a market
    pub new_owner: UncheckedAccount<'info>,

    #[account(
        mut,
        has_one = owner @ LendingError::InvalidMarketOwner
    )]
    pub lending_market: Account<'info, LendingMarket>,
}

pub fn handler(ctx: Context<SetLendingMarketOwner>) -> Result<()> {
    let lending_market = &mut ctx.accounts.lending_market;
    let old_owner = lending_market.owner;
    lending_market.owner = ctx.accounts.new_owner.key();

    emit!(LendingMarketOwnerChanged {
        lending_market: lending_market.key(),
        old_owner,
        new_owner: lending_market.owner,
    });

    msg!("Lending market owner changed from {} to {}", old_owner, lending_market.owner);

    Ok(())
}
