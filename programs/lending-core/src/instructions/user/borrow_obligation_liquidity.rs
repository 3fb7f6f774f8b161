use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::events::LiquidityBorrowed;
use crate::state::{LendingMarket, LoanKind, Obligation, Reserve};

/// Accounts for borrowing liquidity against an obligation
#[derive(Accounts)]
pub struct BorrowObligationLiquidity<'info> {
    /// Obligation owner
    pub owner: Signer<'info>,

    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the liquidity supply
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// Owner's obligation
    #[account(
        mut,
        has_one = owner @ LendingError::IllegalOwner,
        constraint = obligation.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub obligation: Box<Account<'info, Obligation>>,

    /// The reserve to borrow from
    #[account(
        mut,
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Reserve's liquidity supply (source)
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

    /// Owner's liquidity wallet (destination)
    #[account(
        mut,
        constraint = !reserve.liquidity.is_reserve_wallet(&destination_liquidity_wallet.key()) @ LendingError::InvalidAccountInput
    )]
    pub destination_liquidity_wallet: Box<Account<'info, TokenAccount>>,

    /// Token program
    pub token_program: Program<'info, Token>,
    // remaining_accounts[0]: optional host fee wallet
}

/// Borrow liquidity from a reserve against the obligation's collateral
///
/// The borrow fee is taken out of the borrowed amount, so the owner
/// receives `liquidity_amount` minus fees while the full amount is owed.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `liquidity_amount` - Amount of liquidity to borrow
pub fn handler<'info>(
    ctx: Context<'_, '_, 'info, 'info, BorrowObligationLiquidity<'info>>,
    liquidity_amount: u64,
) -> Result<()> {
    require!(liquidity_amount > 0, LendingError::InvalidAmount);

    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let reserve_key = ctx.accounts.reserve.key();
    let host_fee_wallet = ctx.remaining_accounts.first();

    let reserve = &mut ctx.accounts.reserve;
    let obligation = &mut ctx.accounts.obligation;

    if reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }
    if obligation.is_stale(clock.slot)? {
        msg!("Obligation is stale and must be refreshed in the current slot");
        return err!(LendingError::ObligationStale);
    }
    if !obligation.has_deposits() {
        msg!("Obligation has no deposits to borrow against");
        return err!(LendingError::ObligationDepositsZero);
    }
    if let Some(host_fee_wallet) = host_fee_wallet {
        let wallet = Account::<TokenAccount>::try_from(host_fee_wallet)?;
        reserve
            .liquidity
            .check_host_fee_wallet(host_fee_wallet.key, &wallet.mint)?;
    }

    let amounts = reserve.calculate_borrow(liquidity_amount, obligation.remaining_borrow_value())?;

    reserve.liquidity.borrow(amounts.borrow_amount)?;
    reserve.mark_stale();
    obligation.borrow(
        reserve_key,
        amounts.borrow_amount,
        LoanKind::Standard,
        reserve.liquidity.cumulative_borrow_rate,
        clock.slot,
    )?;

    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    let transfer_from_supply = |to: AccountInfo<'info>, amount: u64| -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.reserve_liquidity_supply.to_account_info(),
                    to,
                    authority: ctx.accounts.lending_market_authority.to_account_info(),
                },
                signer_seeds,
            ),
            amount,
        )
    };

    let mut protocol_fee = amounts.borrow_fee;
    if let Some(host_fee_wallet) = host_fee_wallet {
        protocol_fee = protocol_fee
            .checked_sub(amounts.host_fee)
            .ok_or(LendingError::MathOverflow)?;
        transfer_from_supply(host_fee_wallet.clone(), amounts.host_fee)?;
    }
    transfer_from_supply(
        ctx.accounts.reserve_liquidity_fee_receiver.to_account_info(),
        protocol_fee,
    )?;
    transfer_from_supply(
        ctx.accounts.destination_liquidity_wallet.to_account_info(),
        amounts.receive_amount,
    )?;

    emit!(LiquidityBorrowed {
        obligation: ctx.accounts.obligation.key(),
        reserve: reserve_key,
        borrow_amount: liquidity_amount,
        receive_amount: amounts.receive_amount,
        borrow_fee: amounts.borrow_fee,
        host_fee: amounts.host_fee,
    });

    msg!(
        "Borrowed {} liquidity, received {} after {} in fees",
        liquidity_amount,
        amounts.receive_amount,
        amounts.borrow_fee
    );

    Ok(())
}
