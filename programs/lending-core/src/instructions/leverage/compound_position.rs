use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::adapters::{
    lp_token_market_price, AldrinAccounts, AldrinAmm, AldrinPool, AldrinPosition, SplTokenLedger,
};
use crate::errors::LendingError;
use crate::events::PositionCompounded;
use crate::farming::{compound_position, Compound};
use crate::math::Decimal;
use crate::state::{FarmingReceipt, LendingMarket, Reserve, TicketOwner};

/// Accounts for compounding a farming ticket
#[derive(Accounts)]
pub struct CompoundPosition<'info> {
    /// Admin bot, swaps its LP tokens for the harvest
    #[account(
        mut,
        constraint = lending_market.is_admin_bot(&caller.key()) @ LendingError::NotAdminBot
    )]
    pub caller: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: Rederived from the seeds in handler
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

    /// CHECK: Parsed in handler
    #[account(
        constraint = *pool.owner == amm_program.key() @ LendingError::InvalidAmmPool
    )]
    pub pool: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    pub pool_signer: UncheckedAccount<'info>,

    /// LP token mint, its supply prices the LP token
    pub pool_mint: Box<Account<'info, Mint>>,

    pub base_token_vault: Box<Account<'info, TokenAccount>>,

    pub quote_token_vault: Box<Account<'info, TokenAccount>>,

    /// Reserve pricing the pool's base token
    #[account(
        constraint = base_token_reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch,
        constraint = base_token_reserve.liquidity.mint == base_token_vault.mint @ LendingError::InvalidAccountInput
    )]
    pub base_token_reserve: Box<Account<'info, Reserve>>,

    /// Reserve pricing the pool's quote token
    #[account(
        constraint = quote_token_reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch,
        constraint = quote_token_reserve.liquidity.mint == quote_token_vault.mint @ LendingError::InvalidAccountInput
    )]
    pub quote_token_reserve: Box<Account<'info, Reserve>>,

    #[account(
        mut,
        constraint = caller_lp_wallet.mint == pool_mint.key() @ LendingError::InvalidAccountInput
    )]
    pub caller_lp_wallet: Box<Account<'info, TokenAccount>>,

    /// Receives the harvest
    #[account(
        mut,
        constraint = caller_farm_wallet.mint != pool_mint.key() @ LendingError::FarmMintMustDifferFromLp
    )]
    pub caller_farm_wallet: Box<Account<'info, TokenAccount>>,

    /// Reserve pricing the farmed token
    #[account(
        constraint = farm_token_reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch,
        constraint = farm_token_reserve.liquidity.mint == caller_farm_wallet.mint @ LendingError::InvalidAccountInput
    )]
    pub farm_token_reserve: Box<Account<'info, Reserve>>,

    /// CHECK: Checked by the AMM
    pub farming_state: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    #[account(mut)]
    pub farming_calc: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    #[account(mut)]
    pub farm_token_vault: UncheckedAccount<'info>,

    /// CHECK: Fresh ticket, initialized by the AMM
    #[account(mut)]
    pub new_farming_ticket: UncheckedAccount<'info>,

    /// CHECK: Matched against the pool
    #[account(mut)]
    pub lp_token_freeze_vault: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub clock: Sysvar<'info, Clock>,
    pub rent: Sysvar<'info, Rent>,
}

/// Compound a farming ticket
///
/// Harvests the ticket's rewards into the admin bot's wallet and, in
/// exchange, stakes the bot's LP tokens into a new ticket owned by the
/// same PDA. The LP tokens must be worth at least the harvest minus the
/// compound fee. Works for leveraged and vault positions alike, the PDA
/// is recognized by its seeds.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `stake_lp_amount` - LP tokens the bot stakes
/// * `seeds` - Signer seeds of the farming ticket owner, bump included
pub fn handler(
    ctx: Context<CompoundPosition>,
    stake_lp_amount: u64,
    seeds: Vec<Vec<u8>>,
) -> Result<()> {
    let clock = Clock::get()?;
    require!(stake_lp_amount > 0, LendingError::InvalidAmount);

    ctx.accounts
        .lending_market
        .check_amm_program(ctx.accounts.amm_program.key)?;

    let ticket_owner = TicketOwner::from_seeds(&seeds)?;
    let seed_slices: Vec<&[u8]> = seeds.iter().map(|s| s.as_slice()).collect();
    let derived = Pubkey::create_program_address(&seed_slices, &crate::ID).map_err(|_| {
        msg!("Seeds don't derive a program address");
        error!(LendingError::InvalidArgument)
    })?;
    if derived != ctx.accounts.farming_ticket_owner.key() {
        msg!("Seeds derive {} rather than the farming ticket owner", derived);
        return err!(LendingError::InvalidArgument);
    }
    match ticket_owner {
        TicketOwner::Leveraged { lending_market, .. } => {
            if lending_market != ctx.accounts.lending_market.key() {
                return err!(LendingError::LendingMarketMismatch);
            }
        }
        TicketOwner::Vault { pool, .. } => {
            if pool != ctx.accounts.pool.key() {
                msg!("Vault position belongs to another pool");
                return err!(LendingError::InvalidAmmPool);
            }
        }
    }

    let pool = {
        let data = ctx.accounts.pool.try_borrow_data()?;
        AldrinPool::load(&data)?
    };
    if pool.pool_mint != ctx.accounts.pool_mint.key()
        || pool.base_token_vault != ctx.accounts.base_token_vault.key()
        || pool.quote_token_vault != ctx.accounts.quote_token_vault.key()
        || pool.lp_token_freeze_vault != ctx.accounts.lp_token_freeze_vault.key()
    {
        msg!("Pool accounts don't match the AMM pool account data");
        return err!(LendingError::InvalidAmmPool);
    }

    let base_reserve = &ctx.accounts.base_token_reserve;
    let quote_reserve = &ctx.accounts.quote_token_reserve;
    let farm_reserve = &ctx.accounts.farm_token_reserve;
    if base_reserve.is_stale(clock.slot)?
        || quote_reserve.is_stale(clock.slot)?
        || farm_reserve.is_stale(clock.slot)?
    {
        msg!("Reserves pricing the pool and farm tokens must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }

    let lp_token_price = lp_token_market_price(
        ctx.accounts.pool_mint.supply,
        base_reserve.market_value(Decimal::from(ctx.accounts.base_token_vault.amount))?,
        quote_reserve.market_value(Decimal::from(ctx.accounts.quote_token_vault.amount))?,
    )?;
    let compound_fee = ticket_owner.compound_fee(
        ctx.accounts.lending_market.leveraged_compound_fee,
        ctx.accounts.lending_market.vault_compound_fee,
    );

    let owner_signer = &[&seed_slices[..]];
    let amm_accounts = AldrinAccounts {
        pool: Some(ctx.accounts.pool.to_account_info()),
        pool_signer: Some(ctx.accounts.pool_signer.to_account_info()),
        lp_token_freeze_vault: Some(ctx.accounts.lp_token_freeze_vault.to_account_info()),
        farming_state: Some(ctx.accounts.farming_state.to_account_info()),
        farming_ticket: Some(ctx.accounts.new_farming_ticket.to_account_info()),
        farming_calc: Some(ctx.accounts.farming_calc.to_account_info()),
        farm_token_vault: Some(ctx.accounts.farm_token_vault.to_account_info()),
        user: Some(ctx.accounts.caller.to_account_info()),
        user_lp_wallet: Some(ctx.accounts.caller_lp_wallet.to_account_info()),
        user_farm_wallet: Some(ctx.accounts.caller_farm_wallet.to_account_info()),
        ticket_owner: Some(ctx.accounts.farming_ticket_owner.to_account_info()),
        token_program: Some(ctx.accounts.token_program.to_account_info()),
        clock: Some(ctx.accounts.clock.to_account_info()),
        rent: Some(ctx.accounts.rent.to_account_info()),
        ..Default::default()
    };
    let mut position = AldrinPosition {
        amm: AldrinAmm::new(
            ctx.accounts.amm_program.to_account_info(),
            amm_accounts,
            owner_signer,
        ),
        ledger: SplTokenLedger::new(
            ctx.accounts.token_program.to_account_info(),
            ctx.accounts.caller.to_account_info(),
            &[],
            vec![ctx.accounts.caller_farm_wallet.to_account_info()],
        ),
    };

    let farm_wallet = ctx.accounts.caller_farm_wallet.key();
    let farmed_amount = compound_position(
        &mut position,
        &farm_wallet,
        Compound {
            stake_lp_amount,
            lp_token_price,
            compound_fee,
        },
        |amount| farm_reserve.market_value(Decimal::from(amount)),
    )?;

    let new_farming_ticket = ctx.accounts.new_farming_ticket.key();
    let receipt = &mut ctx.accounts.farming_receipt;
    receipt.set_inner(ticket_owner.receipt(new_farming_ticket));

    emit!(PositionCompounded {
        farming_ticket_owner: ctx.accounts.farming_ticket_owner.key(),
        farming_ticket: new_farming_ticket,
        farmed_amount,
        stake_lp_amount,
    });

    msg!(
        "Compounded {} farmed tokens into {} LP tokens",
        farmed_amount,
        stake_lp_amount
    );

    Ok(())
}
