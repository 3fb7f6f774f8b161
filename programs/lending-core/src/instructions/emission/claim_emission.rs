use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, Transfer};

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::events::EmissionClaimed;
use crate::state::{
    emitted_amount, EmissionStrategy, LendingMarket, Obligation, Reserve, ReserveCapSnapshots,
};

/// Accounts for claiming emissions of one obligation slot
#[derive(Accounts)]
pub struct ClaimEmission<'info> {
    pub caller: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the emission wallets
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// The emission's reserve
    #[account(
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch,
        constraint = reserve.snapshots == snapshots.key() @ LendingError::InvalidAccountInput
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    pub snapshots: AccountLoader<'info, ReserveCapSnapshots>,

    #[account(
        mut,
        has_one = lending_market @ LendingError::LendingMarketMismatch,
        constraint = obligation.owner == caller.key() @ LendingError::IllegalOwner
    )]
    pub obligation: Box<Account<'info, Obligation>>,

    #[account(
        constraint = emission.reserve == reserve.key() @ LendingError::InvalidAccountInput
    )]
    pub emission: Box<Account<'info, EmissionStrategy>>,

    pub token_program: Program<'info, Token>,
}

/// Claim the rewards an obligation slot earned since its last claim
///
/// Remaining accounts are pairs of (emission wallet, caller wallet), one
/// pair per emitted token in the strategy's order.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `slot_index` - Obligation slot holding a deposit or loan of the reserve
pub fn handler<'info>(
    ctx: Context<'_, '_, '_, 'info, ClaimEmission<'info>>,
    slot_index: u8,
) -> Result<()> {
    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let emission = &ctx.accounts.emission;
    let reserve = &ctx.accounts.reserve;

    let claim = ctx
        .accounts
        .obligation
        .claim_emissions(slot_index as usize, clock.slot)?;
    if claim.reserve != emission.reserve {
        msg!(
            "Obligation slot {} belongs to reserve {} rather than {}",
            slot_index,
            claim.reserve,
            emission.reserve
        );
        return err!(LendingError::InvalidAccountInput);
    }

    let (claim_from, claim_to) = emission.claimable_slots(claim.claimable_from_slot, clock.slot)?;
    let slots = claim_to - claim_from;

    let tokens: Vec<_> = emission.tokens().copied().collect();
    if tokens.len() * 2 != ctx.remaining_accounts.len() {
        msg!("Remaining accounts must hold {} wallets", tokens.len() * 2);
        return err!(LendingError::EmissionWalletMismatch);
    }

    let (share, pool_average) = {
        let snapshots = ctx.accounts.snapshots.load()?;
        if claim.is_loan {
            (claim.amount, snapshots.average_borrowed_amount(claim_from)?)
        } else {
            let liquidity = reserve
                .collateral_exchange_rate()?
                .decimal_collateral_to_liquidity(claim.amount)?;
            (liquidity, snapshots.average_cap(claim_from)?)
        }
    };

    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    for (wallets, emitted) in ctx.remaining_accounts.chunks(2).zip(tokens.iter()) {
        if *wallets[0].key != emitted.wallet {
            msg!(
                "Wallet {} doesn't match emission wallet {}",
                wallets[0].key,
                emitted.wallet
            );
            return err!(LendingError::EmissionWalletMismatch);
        }

        let tokens_per_slot = if claim.is_loan {
            emitted.tokens_per_slot_for_loans
        } else {
            emitted.tokens_per_slot_for_deposits
        };
        let amount = emitted_amount(tokens_per_slot, slots, share, pool_average)?;
        if amount == 0 {
            continue;
        }

        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                Transfer {
                    from: wallets[0].clone(),
                    to: wallets[1].clone(),
                    authority: ctx.accounts.lending_market_authority.to_account_info(),
                },
                signer_seeds,
            ),
            amount,
        )?;
    }

    emit!(EmissionClaimed {
        emission: emission.key(),
        obligation: ctx.accounts.obligation.key(),
        claimed_from_slot: claim_from,
        claimed_to_slot: claim_to,
    });

    msg!("Claimed emissions for slots {} to {}", claim_from, claim_to);

    Ok(())
}
