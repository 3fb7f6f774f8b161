use anchor_lang::prelude::*;

use crate::errors::LendingError;
use crate::events::ObligationRefreshed;
use crate::state::{Obligation, Reserve};

/// Accounts for refreshing an obligation
#[derive(Accounts)]
pub struct RefreshObligation<'info> {
    /// The obligation to refresh
    #[account(mut)]
    pub obligation: Box<Account<'info, Obligation>>,
    // remaining_accounts: every reserve the obligation deposits into or
    // borrows from, refreshed in this slot
}

/// Refresh obligation state
///
/// Recomputes the value of every deposit and borrow from the reserves
/// passed in `remaining_accounts`, accrues interest on the borrows and
/// caches the aggregate borrow limits.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
pub fn handler(ctx: Context<RefreshObligation>) -> Result<()> {
    let clock = Clock::get()?;
    let lending_market = ctx.accounts.obligation.lending_market;

    let mut reserves = Vec::with_capacity(ctx.remaining_accounts.len());
    for info in ctx.remaining_accounts.iter() {
        reserves.push((info.key(), load_reserve(info, &lending_market)?));
    }
    let reserve_refs: Vec<(Pubkey, &Reserve)> =
        reserves.iter().map(|(key, reserve)| (*key, reserve)).collect();

    let obligation = &mut ctx.accounts.obligation;
    obligation.refresh(clock.slot, &reserve_refs)?;

    emit!(ObligationRefreshed {
        obligation: obligation.key(),
        slot: clock.slot,
        deposited_value: obligation.deposited_value.to_scaled_val()?,
        borrowed_value: obligation.borrowed_value.to_scaled_val()?,
        allowed_borrow_value: obligation.allowed_borrow_value.to_scaled_val()?,
        unhealthy_borrow_value: obligation.unhealthy_borrow_value.to_scaled_val()?,
    });

    Ok(())
}

/// Deserializes a reserve of this program belonging to `lending_market`
fn load_reserve(info: &AccountInfo, lending_market: &Pubkey) -> Result<Reserve> {
    if *info.owner != crate::ID {
        msg!("Reserve '{}' is not owned by this program", info.key);
        return err!(LendingError::InvalidAccountInput);
    }

    let data = info.try_borrow_data()?;
    let reserve = Reserve::try_deserialize(&mut &data[..])?;
    if reserve.lending_market != *lending_market {
        msg!("Reserve '{}' belongs to another lending market", info.key);
        return err!(LendingError::LendingMarketMismatch);
    }

    Ok(reserve)
}
