use anchor_lang::prelude::*;

use crate::errors::LendingError;
use crate::events::FlashLoansToggled;
use crate::state::LendingMarket;

/// Accounts for switching flash loans on or off
#[derive(Accounts)]
pub struct ToggleFlashLoans<'info> {
    /// Owner of the lending market
    pub owner: Signer<'info>,

    #[account(
        mut,
        has_one = owner @ LendingError::InvalidMarketOwner
    )]
    pub lending_market: Account<'info, LendingMarket>,
}

pub fn handler(ctx: Context<ToggleFlashLoans>) -> Result<()> {
    let lending_market = &mut ctx.accounts.lending_market;
    lending_market.enable_flash_loans = !lending_market.enable_flash_loans;

    emit!(FlashLoansToggled {
        lending_market: lending_market.key(),
        enabled: lending_market.enable_flash_loans,
    });

    msg!("Flash loans enabled: {}", lending_market.enable_flash_loans);

    Ok(())
}
