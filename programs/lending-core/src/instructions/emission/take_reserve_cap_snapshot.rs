use anchor_lang::prelude::*;

use crate::errors::LendingError;
use crate::events::ReserveCapSnapshotTaken;
use crate::state::{LendingMarket, Reserve, ReserveCap, ReserveCapSnapshots};

/// Accounts for recording the reserve's utilization
#[derive(Accounts)]
pub struct TakeReserveCapSnapshot<'info> {
    #[account(
        constraint = lending_market.is_admin_bot(&caller.key()) @ LendingError::NotAdminBot
    )]
    pub caller: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    #[account(
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch,
        constraint = reserve.snapshots == snapshots.key() @ LendingError::InvalidAccountInput
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    #[account(mut)]
    pub snapshots: AccountLoader<'info, ReserveCapSnapshots>,
}

/// Write the reserve's available and borrowed liquidity into the next
/// snapshot. Emission shares are measured against these.
pub fn handler(ctx: Context<TakeReserveCapSnapshot>) -> Result<()> {
    let clock = Clock::get()?;
    let reserve = &ctx.accounts.reserve;

    if reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }

    let mut snapshots = ctx.accounts.snapshots.load_mut()?;
    if snapshots.reserve != reserve.key() {
        msg!("Snapshots belong to reserve {}", snapshots.reserve);
        return err!(LendingError::InvalidAccountInput);
    }

    let cap = ReserveCap {
        available_amount: reserve.liquidity.available_amount,
        borrowed_amount: reserve.liquidity.borrowed_amount.try_floor_u64()?,
        slot: clock.slot,
    };
    snapshots.push(cap);

    emit!(ReserveCapSnapshotTaken {
        reserve: reserve.key(),
        slot: cap.slot,
        available_amount: cap.available_amount,
        borrowed_amount: cap.borrowed_amount,
    });

    Ok(())
}
