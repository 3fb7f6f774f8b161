use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::adapters::{
    AldrinAccounts, AldrinAmm, AldrinPool, AldrinPosition, Side, SplTokenLedger, TokenLedger,
};
use crate::constants::{MARKET_AUTHORITY_SEED, MAX_OBLIGATION_REFRESH_SLOTS_FOR_LEVERAGE};
use crate::errors::LendingError;
use crate::events::LeveragedPositionClosed;
use crate::farming::{close_position, PositionWallets};
use crate::state::{FarmingReceipt, LendingMarket, LoanKind, Obligation, Reserve};

/// Accounts for closing a leveraged yield farming position
#[derive(Accounts)]
#[instruction(leverage: u64)]
pub struct CloseLeveragedPosition<'info> {
    /// Obligation owner, or a liquidator once the obligation has no deposits
    #[account(mut)]
    pub caller: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the liquidity supply
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// Obligation which borrowed for the position
    #[account(
        mut,
        constraint = obligation.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub obligation: Box<Account<'info, Obligation>>,

    /// The reserve the position borrowed from
    #[account(
        mut,
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Reserve's liquidity supply
    #[account(
        mut,
        constraint = reserve_liquidity_supply.key() == reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub reserve_liquidity_supply: Box<Account<'info, TokenAccount>>,

    /// CHECK: PDA owning the farming ticket
    /// PDA: [lending_market, obligation, reserve, leverage]
    #[account(
        seeds = [
            lending_market.key().as_ref(),
            obligation.key().as_ref(),
            reserve.key().as_ref(),
            leverage.to_le_bytes().as_ref()
        ],
        bump
    )]
    pub farming_ticket_owner: UncheckedAccount<'info>,

    /// Receipt of the farming ticket, rent goes to the caller
    #[account(
        mut,
        close = caller,
        constraint = farming_receipt.is_for(&obligation.key(), &reserve.key(), &farming_ticket.key())
            @ LendingError::FarmingReceiptMismatch,
        constraint = farming_receipt.leverage == leverage @ LendingError::FarmingReceiptMismatch
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

    /// CHECK: Matched against the pool
    #[account(mut)]
    pub pool_mint: UncheckedAccount<'info>,

    #[account(mut)]
    pub base_token_vault: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub quote_token_vault: Box<Account<'info, TokenAccount>>,

    /// CHECK: Checked by the AMM
    #[account(mut)]
    pub fee_pool_wallet: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    #[account(mut)]
    pub fee_base_wallet: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    #[account(mut)]
    pub fee_quote_wallet: UncheckedAccount<'info>,

    #[account(
        mut,
        constraint = caller_base_wallet.key() != reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub caller_base_wallet: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = caller_quote_wallet.key() != reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub caller_quote_wallet: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub caller_lp_wallet: Box<Account<'info, TokenAccount>>,

    /// CHECK: Checked by the AMM
    #[account(mut)]
    pub caller_sol_wallet: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    pub farming_state: UncheckedAccount<'info>,

    /// CHECK: Matched against the receipt
    #[account(mut)]
    pub farming_ticket: UncheckedAccount<'info>,

    /// CHECK: Checked by the AMM
    pub farming_snapshots: UncheckedAccount<'info>,

    /// CHECK: Matched against the pool
    #[account(mut)]
    pub lp_token_freeze_vault: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
    pub clock: Sysvar<'info, Clock>,
    pub rent: Sysvar<'info, Rent>,
}

/// Close a leveraged yield farming position
///
/// Unstakes the farming ticket, redeems the LP tokens, swaps the other
/// pool token back into the reserve's token and repays the loan from the
/// proceeds. Whatever is left stays with the caller. A position whose
/// loan was already repaid or liquidated is simply unwound.
///
/// The owner closes their own positions. Once the obligation has no
/// deposits left but the loan is still open, anyone may close it.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `leverage` - Leverage the position was opened with
pub fn handler(ctx: Context<CloseLeveragedPosition>, leverage: u64) -> Result<()> {
    ctx.accounts
        .lending_market
        .check_amm_program(ctx.accounts.amm_program.key)?;

    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let obligation_key = ctx.accounts.obligation.key();
    let reserve_key = ctx.accounts.reserve.key();
    let caller_key = ctx.accounts.caller.key();
    let loan_kind = LoanKind::YieldFarming { leverage };

    if ctx.accounts.reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }

    let loan = ctx
        .accounts
        .obligation
        .find_liquidity(&reserve_key, loan_kind);
    let is_being_liquidated = !ctx.accounts.obligation.has_deposits() && loan.is_some();
    if !is_being_liquidated && ctx.accounts.obligation.owner != caller_key {
        msg!("Only the obligation owner can close a position which is not being liquidated");
        return err!(LendingError::CannotCloseForeignPosition);
    }
    if loan.is_some()
        && ctx
            .accounts
            .obligation
            .last_update
            .is_older_than(clock.slot, MAX_OBLIGATION_REFRESH_SLOTS_FOR_LEVERAGE)?
    {
        msg!(
            "Obligation must be refreshed within {} slots",
            MAX_OBLIGATION_REFRESH_SLOTS_FOR_LEVERAGE
        );
        return err!(LendingError::ObligationStale);
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
    let side = Side::for_mint(&ctx.accounts.reserve.liquidity.mint, &pool)?;

    let leverage_bytes = leverage.to_le_bytes();
    let owner_bump = [ctx.bumps.farming_ticket_owner];
    let owner_seeds = FarmingReceipt::leveraged_owner_seeds(
        &lending_market_key,
        &obligation_key,
        &reserve_key,
        &leverage_bytes,
        &owner_bump,
    );
    let owner_signer = &[&owner_seeds[..]];
    let no_seeds: &[&[&[u8]]] = &[];

    let wallets = PositionWallets {
        reserve_supply: ctx.accounts.reserve_liquidity_supply.key(),
        base: ctx.accounts.caller_base_wallet.key(),
        quote: ctx.accounts.caller_quote_wallet.key(),
        lp: ctx.accounts.caller_lp_wallet.key(),
    };

    let amm_accounts = AldrinAccounts {
        pool: Some(ctx.accounts.pool.to_account_info()),
        pool_signer: Some(ctx.accounts.pool_signer.to_account_info()),
        pool_mint: Some(ctx.accounts.pool_mint.to_account_info()),
        base_token_vault: Some(ctx.accounts.base_token_vault.to_account_info()),
        quote_token_vault: Some(ctx.accounts.quote_token_vault.to_account_info()),
        fee_pool_wallet: Some(ctx.accounts.fee_pool_wallet.to_account_info()),
        fee_base_wallet: Some(ctx.accounts.fee_base_wallet.to_account_info()),
        fee_quote_wallet: Some(ctx.accounts.fee_quote_wallet.to_account_info()),
        lp_token_freeze_vault: Some(ctx.accounts.lp_token_freeze_vault.to_account_info()),
        farming_state: Some(ctx.accounts.farming_state.to_account_info()),
        farming_ticket: Some(ctx.accounts.farming_ticket.to_account_info()),
        farming_snapshots: Some(ctx.accounts.farming_snapshots.to_account_info()),
        user: Some(ctx.accounts.caller.to_account_info()),
        user_base_wallet: Some(ctx.accounts.caller_base_wallet.to_account_info()),
        user_quote_wallet: Some(ctx.accounts.caller_quote_wallet.to_account_info()),
        user_lp_wallet: Some(ctx.accounts.caller_lp_wallet.to_account_info()),
        user_sol_wallet: Some(ctx.accounts.caller_sol_wallet.to_account_info()),
        ticket_owner: Some(ctx.accounts.farming_ticket_owner.to_account_info()),
        token_program: Some(ctx.accounts.token_program.to_account_info()),
        clock: Some(ctx.accounts.clock.to_account_info()),
        rent: Some(ctx.accounts.rent.to_account_info()),
        ..Default::default()
    };

    // the caller owns every wallet touched here and signs the repayment
    let mut position = AldrinPosition {
        amm: AldrinAmm::new(
            ctx.accounts.amm_program.to_account_info(),
            amm_accounts,
            owner_signer,
        ),
        ledger: SplTokenLedger::new(
            ctx.accounts.token_program.to_account_info(),
            ctx.accounts.caller.to_account_info(),
            no_seeds,
            vec![
                ctx.accounts.reserve_liquidity_supply.to_account_info(),
                ctx.accounts.caller_base_wallet.to_account_info(),
                ctx.accounts.caller_quote_wallet.to_account_info(),
                ctx.accounts.caller_lp_wallet.to_account_info(),
            ],
        ),
    };

    let withdrawn_amount = close_position(&mut position, &wallets, side)?;

    let mut repay_amount = 0;
    if let Some((index, liquidity)) = loan {
        let reserve = &mut ctx.accounts.reserve;
        let obligation = &mut ctx.accounts.obligation;

        let amounts = reserve.calculate_repay(withdrawn_amount, liquidity.borrowed_amount)?;
        reserve
            .liquidity
            .repay(amounts.repay_amount, amounts.settle_amount)?;
        reserve.mark_stale();
        obligation.repay(index, amounts.settle_amount)?;

        position.transfer(
            &wallets.for_side(side),
            &wallets.reserve_supply,
            amounts.repay_amount,
        )?;
        repay_amount = amounts.repay_amount;
    }

    emit!(LeveragedPositionClosed {
        obligation: obligation_key,
        reserve: reserve_key,
        farming_ticket: ctx.accounts.farming_ticket.key(),
        leverage,
        withdrawn_amount,
        repay_amount,
    });

    msg!(
        "Closed {}% leveraged position, withdrew {} and repaid {}",
        leverage,
        withdrawn_amount,
        repay_amount
    );

    Ok(())
}
