use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::adapters::{
    AldrinAccounts, AldrinAmm, AldrinPool, AldrinPosition, Side, SplTokenLedger, TokenLedger,
};
use crate::constants::{MARKET_AUTHORITY_SEED, MAX_OBLIGATION_REFRESH_SLOTS_FOR_LEVERAGE, NO_LEVERAGE};
use crate::errors::LendingError;
use crate::events::LeveragedPositionOpened;
use crate::farming::{open_position, OpenPosition, PositionWallets};
use crate::math::{TryDiv, TryMul};
use crate::state::{FarmingReceipt, LendingMarket, LoanKind, Obligation, Reserve};

/// Accounts for opening a leveraged yield farming position
#[derive(Accounts)]
#[instruction(leverage: u64)]
pub struct OpenLeveragedPosition<'info> {
    /// Obligation owner, signs for the base, quote and LP wallets
    #[account(mut)]
    pub borrower: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the liquidity supply
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// Borrower's obligation
    #[account(mut)]
    pub obligation: Box<Account<'info, Obligation>>,

    /// The reserve to borrow from
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

    /// Reserve's fee receiver
    #[account(
        mut,
        constraint = reserve_liquidity_fee_receiver.key() == reserve.liquidity.fee_receiver @ LendingError::InvalidAccountInput
    )]
    pub reserve_liquidity_fee_receiver: Box<Account<'info, TokenAccount>>,

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

    /// Receipt of the new farming ticket (fresh keypair)
    #[account(
        init,
        payer = borrower,
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

    #[account(
        mut,
        constraint = borrower_base_wallet.key() != reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub borrower_base_wallet: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = borrower_quote_wallet.key() != reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub borrower_quote_wallet: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub borrower_lp_wallet: Box<Account<'info, TokenAccount>>,

    /// CHECK: Checked by the AMM
    pub farming_state: UncheckedAccount<'info>,

    /// CHECK: Initialized by the AMM
    #[account(mut)]
    pub farming_ticket: UncheckedAccount<'info>,

    /// CHECK: Matched against the pool
    #[account(mut)]
    pub lp_token_freeze_vault: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub clock: Sysvar<'info, Clock>,
    pub rent: Sysvar<'info, Rent>,
}

/// Open a leveraged yield farming position
///
/// Borrows `liquidity_amount` from the reserve against the obligation,
/// swaps `swap_amount` of it for the other pool token, deposits both into
/// the pool and stakes `stake_lp_amount` LP tokens in a farming ticket
/// owned by a PDA of this position. The loan only counts against the
/// obligation's borrow limit divided by the leverage.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `leverage` - Leverage in percent, at most the reserve's max leverage
/// * `stake_lp_amount` - LP tokens to mint and stake
/// * `liquidity_amount` - Amount of liquidity to borrow
/// * `swap_amount` - Part of the loan swapped for the other pool token
/// * `min_swap_return` - Slippage bound of the swap
pub fn handler(
    ctx: Context<OpenLeveragedPosition>,
    leverage: u64,
    stake_lp_amount: u64,
    liquidity_amount: u64,
    swap_amount: u64,
    min_swap_return: u64,
) -> Result<()> {
    if stake_lp_amount == 0 {
        msg!("Cannot stake 0 LP tokens");
        return err!(LendingError::InvalidAmount);
    }
    if liquidity_amount == 0 {
        msg!("Must borrow some liquidity");
        return err!(LendingError::InvalidAmount);
    }

    ctx.accounts
        .lending_market
        .check_amm_program(ctx.accounts.amm_program.key)?;

    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let obligation_key = ctx.accounts.obligation.key();
    let reserve_key = ctx.accounts.reserve.key();

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

    let market = &ctx.accounts.lending_market;
    let reserve = &mut ctx.accounts.reserve;
    let obligation = &mut ctx.accounts.obligation;

    if reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }
    reserve.config.check_leverage(leverage)?;
    if obligation.deposited_value < market.min_collateral_uac_value_for_leverage {
        msg!(
            "Obligation deposited value must be at least {}",
            market.min_collateral_uac_value_for_leverage
        );
        return err!(LendingError::CollateralTooLowForLeverage);
    }
    if obligation.owner != ctx.accounts.borrower.key() {
        msg!("Only the obligation owner can open leveraged positions");
        return err!(LendingError::IllegalOwner);
    }
    if obligation
        .last_update
        .is_older_than(clock.slot, MAX_OBLIGATION_REFRESH_SLOTS_FOR_LEVERAGE)?
    {
        msg!(
            "Obligation must be refreshed within {} slots",
            MAX_OBLIGATION_REFRESH_SLOTS_FOR_LEVERAGE
        );
        return err!(LendingError::ObligationStale);
    }
    if obligation.lending_market != lending_market_key {
        return err!(LendingError::LendingMarketMismatch);
    }

    let remaining_borrow_value = obligation.remaining_borrow_value();
    if remaining_borrow_value.is_zero() {
        msg!("Remaining borrow value is zero");
        return err!(LendingError::BorrowTooLarge);
    }
    let max_borrow_value = remaining_borrow_value
        .try_mul(leverage)?
        .try_div(NO_LEVERAGE)?;

    let loan_kind = LoanKind::YieldFarming { leverage };
    let amounts = reserve.calculate_borrow(liquidity_amount, max_borrow_value)?;

    reserve.liquidity.borrow(amounts.borrow_amount)?;
    reserve.mark_stale();
    obligation.borrow(
        reserve_key,
        amounts.borrow_amount,
        loan_kind,
        reserve.liquidity.cumulative_borrow_rate,
        clock.slot,
    )?;

    let authority_bump = [market.authority_bump];
    let authority_seeds = LendingMarket::authority_seeds(&lending_market_key, &authority_bump);
    let authority_signer = &[&authority_seeds[..]];

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

    let wallets = PositionWallets {
        reserve_supply: ctx.accounts.reserve_liquidity_supply.key(),
        base: ctx.accounts.borrower_base_wallet.key(),
        quote: ctx.accounts.borrower_quote_wallet.key(),
        lp: ctx.accounts.borrower_lp_wallet.key(),
    };

    let amm_accounts = AldrinAccounts {
        pool: Some(ctx.accounts.pool.to_account_info()),
        pool_signer: Some(ctx.accounts.pool_signer.to_account_info()),
        pool_mint: Some(ctx.accounts.pool_mint.to_account_info()),
        base_token_vault: Some(ctx.accounts.base_token_vault.to_account_info()),
        quote_token_vault: Some(ctx.accounts.quote_token_vault.to_account_info()),
        fee_pool_wallet: Some(ctx.accounts.fee_pool_wallet.to_account_info()),
        lp_token_freeze_vault: Some(ctx.accounts.lp_token_freeze_vault.to_account_info()),
        farming_state: Some(ctx.accounts.farming_state.to_account_info()),
        farming_ticket: Some(ctx.accounts.farming_ticket.to_account_info()),
        user: Some(ctx.accounts.borrower.to_account_info()),
        user_base_wallet: Some(ctx.accounts.borrower_base_wallet.to_account_info()),
        user_quote_wallet: Some(ctx.accounts.borrower_quote_wallet.to_account_info()),
        user_lp_wallet: Some(ctx.accounts.borrower_lp_wallet.to_account_info()),
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
            ctx.accounts.lending_market_authority.to_account_info(),
            authority_signer,
            vec![
                ctx.accounts.reserve_liquidity_supply.to_account_info(),
                ctx.accounts.reserve_liquidity_fee_receiver.to_account_info(),
                ctx.accounts.borrower_base_wallet.to_account_info(),
                ctx.accounts.borrower_quote_wallet.to_account_info(),
                ctx.accounts.borrower_lp_wallet.to_account_info(),
            ],
        ),
    };

    position.transfer(
        &wallets.reserve_supply,
        &ctx.accounts.reserve_liquidity_fee_receiver.key(),
        amounts.borrow_fee,
    )?;
    open_position(
        &mut position,
        &wallets,
        OpenPosition {
            side,
            liquidity_amount: amounts.receive_amount,
            swap_amount,
            min_swap_return,
            stake_lp_amount,
        },
    )?;

    let farming_ticket = ctx.accounts.farming_ticket.key();
    let receipt = &mut ctx.accounts.farming_receipt;
    receipt.owner = obligation_key;
    receipt.association = reserve_key;
    receipt.ticket = farming_ticket;
    receipt.leverage = leverage;

    emit!(LeveragedPositionOpened {
        obligation: obligation_key,
        reserve: reserve_key,
        farming_ticket,
        leverage,
        borrow_amount: liquidity_amount,
        stake_lp_amount,
    });

    msg!(
        "Opened {}% leveraged position borrowing {} and staking {} LP tokens",
        leverage,
        liquidity_amount,
        stake_lp_amount
    );

    Ok(())
}
