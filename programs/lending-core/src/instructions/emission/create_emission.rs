use anchor_lang::prelude::*;
use anchor_spl::token::spl_token::instruction::AuthorityType;
use anchor_spl::token::{self, SetAuthority, Token};

use crate::constants::{EMISSION_TOKENS_COUNT, MARKET_AUTHORITY_SEED};
use crate::errors::LendingError;
use crate::events::EmissionCreated;
use crate::state::{EmissionStrategy, EmittedToken, LendingMarket, Reserve};

/// Accounts for creating an emission strategy
#[derive(Accounts)]
pub struct CreateEmission<'info> {
    /// Market owner, owns the emission wallets until they're handed over
    #[account(mut)]
    pub owner: Signer<'info>,

    /// The lending market
    #[account(has_one = owner @ LendingError::InvalidMarketOwner)]
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which will own the emission wallets
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// Reserve whose lenders and borrowers are rewarded
    #[account(
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    #[account(
        init,
        payer = owner,
        space = 8 + EmissionStrategy::INIT_SPACE
    )]
    pub emission: Box<Account<'info, EmissionStrategy>>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

/// Create an emission strategy for a reserve
///
/// Remaining accounts are the wallets of `tokens`, in the same order. Their
/// owner is handed over to the market authority, which pays claims from
/// them until the strategy is closed.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `starts_at_slot` - First slot which earns rewards
/// * `ends_at_slot` - Last slot which earns rewards
/// * `min_slots_elapsed_before_claim` - Minimum slots between claims
/// * `tokens` - Emitted tokens, at most 5
pub fn handler<'info>(
    ctx: Context<'_, '_, '_, 'info, CreateEmission<'info>>,
    starts_at_slot: u64,
    ends_at_slot: u64,
    min_slots_elapsed_before_claim: u64,
    tokens: Vec<EmittedToken>,
) -> Result<()> {
    if tokens.len() > EMISSION_TOKENS_COUNT {
        msg!(
            "At most {} different emission tokens are allowed",
            EMISSION_TOKENS_COUNT
        );
        return err!(LendingError::TooManyEmittedTokens);
    }
    require!(ends_at_slot > starts_at_slot, LendingError::InvalidArgument);
    if tokens.len() != ctx.remaining_accounts.len() {
        msg!("Remaining accounts must hold {} wallets", tokens.len());
        return err!(LendingError::EmissionWalletMismatch);
    }

    for (wallet, token) in ctx.remaining_accounts.iter().zip(tokens.iter()) {
        if token.is_empty() || *wallet.key != token.wallet {
            msg!("Wallets must follow the order of the emitted tokens");
            return err!(LendingError::EmissionWalletMismatch);
        }

        token::set_authority(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                SetAuthority {
                    current_authority: ctx.accounts.owner.to_account_info(),
                    account_or_mint: wallet.clone(),
                },
            ),
            AuthorityType::AccountOwner,
            Some(ctx.accounts.lending_market_authority.key()),
        )?;
    }

    let emission = &mut ctx.accounts.emission;
    emission.reserve = ctx.accounts.reserve.key();
    emission.tokens = [EmittedToken::default(); EMISSION_TOKENS_COUNT];
    emission.tokens[..tokens.len()].copy_from_slice(&tokens);
    emission.starts_at_slot = starts_at_slot;
    emission.ends_at_slot = ends_at_slot;
    emission.min_slots_elapsed_before_claim = min_slots_elapsed_before_claim;

    emit!(EmissionCreated {
        emission: emission.key(),
        reserve: emission.reserve,
        tokens: tokens.len() as u8,
        starts_at_slot,
        ends_at_slot,
    });

    msg!(
        "Emission of {} tokens created for slots {} to {}",
        tokens.len(),
        starts_at_slot,
        ends_at_slot
    );

    Ok(())
}
