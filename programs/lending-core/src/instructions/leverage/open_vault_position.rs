use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::adapters::{AldrinAccounts, AldrinAmm, AmmPool};
use crate::constants::NO_LEVERAGE;
use crate::errors::LendingError;
use crate::events::VaultPositionOpened;
use crate::state::{FarmingReceipt, LendingMarket};

/// Accounts for staking LP tokens in an auto-compounding vault
#[derive(Accounts)]
pub struct OpenVaultPosition<'info> {
    #[account(mut)]
    pub caller: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA owning the farming ticket
    /// PDA: [caller, pool]
    #[account(
        seeds = [caller.key().as_ref(), pool.key().as_ref()],
        bump
    )]
    pub farming_ticket_owner: UncheckedAccount<'info>,

    /// Receipt of the new farming ticket
    #[account(
        init,
        payer = caller,
        space = 8 + FarmingReceipt::INIT_SPACE
    )]
    pub farming_receipt: Box<Account<'info, FarmingReceipt>>,

    /// CHECK: AMM program, matched against the lending market
    #[account(executable)]
    pub amm_program: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    #[account(
        constraint = *pool.owner == amm_program.key() @ LendingError::InvalidAmmPool
    )]
    pub pool: UncheckedAccount<'info>,

    #[account(mut)]
    pub caller_lp_wallet: Box<Account<'info, TokenAccount>>,

    /// CHECK: Checked by the AMM
    pub farming_state: UncheckedAccount<'info>,

    /// CHECK: Fresh ticket, initialized by the AMM
    #[account(mut)]
    pub farming_ticket: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    #[account(mut)]
    pub lp_token_freeze_vault: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub clock: Sysvar<'info, Clock>,
    pub rent: Sysvar<'info, Rent>,
}

/// Stake the caller's LP tokens in a farming ticket owned by a vault PDA
/// so the admin bot can compound it
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `stake_lp_amount` - LP tokens to stake
pub fn handler(ctx: Context<OpenVaultPosition>, stake_lp_amount: u64) -> Result<()> {
    require!(stake_lp_amount > 0, LendingError::InvalidAmount);

    ctx.accounts
        .lending_market
        .check_amm_program(ctx.accounts.amm_program.key)?;

    let caller_key = ctx.accounts.caller.key();
    let pool_key = ctx.accounts.pool.key();
    let farming_ticket = ctx.accounts.farming_ticket.key();

    let owner_bump = [ctx.bumps.farming_ticket_owner];
    let owner_seeds = FarmingReceipt::vault_owner_seeds(&caller_key, &pool_key, &owner_bump);
    let owner_signer = &[&owner_seeds[..]];

    let amm_accounts = AldrinAccounts {
        pool: Some(ctx.accounts.pool.to_account_info()),
        farming_state: Some(ctx.accounts.farming_state.to_account_info()),
        farming_ticket: Some(ctx.accounts.farming_ticket.to_account_info()),
        lp_token_freeze_vault: Some(ctx.accounts.lp_token_freeze_vault.to_account_info()),
        user: Some(ctx.accounts.caller.to_account_info()),
        user_lp_wallet: Some(ctx.accounts.caller_lp_wallet.to_account_info()),
        ticket_owner: Some(ctx.accounts.farming_ticket_owner.to_account_info()),
        token_program: Some(ctx.accounts.token_program.to_account_info()),
        clock: Some(ctx.accounts.clock.to_account_info()),
        rent: Some(ctx.accounts.rent.to_account_info()),
        ..Default::default()
    };
    AldrinAmm::new(
        ctx.accounts.amm_program.to_account_info(),
        amm_accounts,
        owner_signer,
    )
    .start_farming(stake_lp_amount)?;

    let receipt = &mut ctx.accounts.farming_receipt;
    receipt.owner = caller_key;
    receipt.association = pool_key;
    receipt.ticket = farming_ticket;
    receipt.leverage = NO_LEVERAGE;

    emit!(VaultPositionOpened {
        owner: caller_key,
        pool: pool_key,
        farming_ticket,
        stake_lp_amount,
    });

    msg!("Staked {} LP tokens in vault", stake_lp_amount);

    Ok(())
}
