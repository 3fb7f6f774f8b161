use anchor_lang::prelude::*;

use crate::events::ObligationInitialized;
use crate::state::{LastUpdate, LendingMarket, Obligation};

/// Accounts for initializing a user's obligation
#[derive(Accounts)]
pub struct InitObligation<'info> {
    /// User who owns this obligation
    #[account(mut)]
    pub owner: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// The obligation account to initialize
    /// PDA: ["obligation", lending_market, owner]
    #[account(
        init,
        payer = owner,
        space = 8 + Obligation::INIT_SPACE,
        seeds = [Obligation::SEED_PREFIX, lending_market.key().as_ref(), owner.key().as_ref()],
        bump
    )]
    pub obligation: Box<Account<'info, Obligation>>,

    /// System program
    pub system_program: Program<'info, System>,
}

/// Initialize a user's obligation account
///
/// An obligation tracks a user's deposits and borrows in the lending market.
/// Each user has one obligation per lending market.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
pub fn handler(ctx: Context<InitObligation>) -> Result<()> {
    let clock = Clock::get()?;
    let obligation = &mut ctx.accounts.obligation;

    obligation.version = 1;
    obligation.bump = ctx.bumps.obligation;
    obligation.lending_market = ctx.accounts.lending_market.key();
    obligation.owner = ctx.accounts.owner.key();
    // stale until the first refresh
    obligation.last_update = LastUpdate::new(clock.slot);

    emit!(ObligationInitialized {
        lending_market: obligation.lending_market,
        obligation: obligation.key(),
        owner: obligation.owner,
    });

    msg!("Obligation initialized for user: {}", obligation.owner);

    Ok(())
}
