use anchor_lang::prelude::*;
use anchor_spl::token::spl_token::instruction::AuthorityType;
use anchor_spl::token::{self, SetAuthority, Token};

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::events::EmissionClosed;
use crate::state::{EmissionStrategy, LendingMarket, Reserve};

/// Accounts for closing an emission strategy
#[derive(Accounts)]
pub struct CloseEmission<'info> {
    /// Market owner, receives the wallets and the rent
    #[account(mut)]
    pub owner: Signer<'info>,

    /// The lending market
    #[account(has_one = owner @ LendingError::InvalidMarketOwner)]
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the emission wallets
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    #[account(
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    #[account(
        mut,
        close = owner,
        constraint = emission.reserve == reserve.key() @ LendingError::InvalidAccountInput
    )]
    pub emission: Box<Account<'info, EmissionStrategy>>,

    pub token_program: Program<'info, Token>,
}

/// Close an emission strategy once late claims had time to land
///
/// Remaining accounts are the strategy's wallets, in order. Their owner
/// goes back to the market owner.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
pub fn handler<'info>(ctx: Context<'_, '_, '_, 'info, CloseEmission<'info>>) -> Result<()> {
    let clock = Clock::get()?;
    let emission = &ctx.accounts.emission;

    let closable_from_slot = emission.closable_from_slot()?;
    if clock.slot < closable_from_slot {
        msg!(
            "Emission can be closed from slot {}, current slot is {}",
            closable_from_slot,
            clock.slot
        );
        return err!(LendingError::EmissionCloseDelayNotPassed);
    }

    let wallets: Vec<Pubkey> = emission.tokens().map(|t| t.wallet).collect();
    if wallets.len() != ctx.remaining_accounts.len() {
        msg!("Remaining accounts must hold {} wallets", wallets.len());
        return err!(LendingError::EmissionWalletMismatch);
    }

    let lending_market_key = ctx.accounts.lending_market.key();
    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    for (info, wallet) in ctx.remaining_accounts.iter().zip(wallets.iter()) {
        if info.key != wallet {
            msg!("Wallets must follow the order of the emitted tokens");
            return err!(LendingError::EmissionWalletMismatch);
        }

        token::set_authority(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                SetAuthority {
                    current_authority: ctx.accounts.lending_market_authority.to_account_info(),
                    account_or_mint: info.clone(),
                },
                signer_seeds,
            ),
            AuthorityType::AccountOwner,
            Some(ctx.accounts.owner.key()),
        )?;
    }

    emit!(EmissionClosed {
        emission: emission.key(),
        reserve: emission.reserve,
    });

    msg!("Emission closed, {} wallets returned", wallets.len());

    Ok(())
}
