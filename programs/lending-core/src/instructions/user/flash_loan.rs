use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::adapters::SplTokenLedger;
use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::events::FlashLoanExecuted;
use crate::flash_loan::{check_target_program, execute_flash_loan, FlashLoan, ProgramReceiver};
use crate::state::{LendingMarket, Reserve};

/// Accounts for a flash loan out of a reserve
#[derive(Accounts)]
pub struct FlashLoanReserveLiquidity<'info> {
    /// The lending market
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA which owns the liquidity supply
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// The reserve lending the liquidity
    #[account(
        mut,
        constraint = reserve.lending_market == lending_market.key() @ LendingError::LendingMarketMismatch
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Reserve's liquidity supply
    #[account(
        mut,
        constraint = source_liquidity.key() == reserve.liquidity.supply @ LendingError::InvalidAccountInput
    )]
    pub source_liquidity: Box<Account<'info, TokenAccount>>,

    /// Wallet receiving the loan
    #[account(mut)]
    pub destination_liquidity: Box<Account<'info, TokenAccount>>,

    /// Reserve's fee receiver
    #[account(
        mut,
        constraint = reserve_liquidity_fee_receiver.key() == reserve.liquidity.fee_receiver @ LendingError::InvalidAccountInput
    )]
    pub reserve_liquidity_fee_receiver: Box<Account<'info, TokenAccount>>,

    /// CHECK: Program invoked with the loan, must repay before returning
    pub target_program: UncheckedAccount<'info>,

    /// Token program
    pub token_program: Program<'info, Token>,
    // remaining_accounts: passed through to the target program
}

/// Lend reserve liquidity for the duration of one CPI
///
/// The target program is invoked with `target_data_prefix` followed by the
/// amount owed as a little endian u64. By the time it returns the supply
/// must hold the loan plus the flash loan fee.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `liquidity_amount` - Amount to lend
/// * `target_data_prefix` - Instruction data prefix of the target program
pub fn handler<'info>(
    ctx: Context<'_, '_, '_, 'info, FlashLoanReserveLiquidity<'info>>,
    liquidity_amount: u64,
    target_data_prefix: Vec<u8>,
) -> Result<()> {
    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();

    ctx.accounts.lending_market.check_flash_loans_enabled()?;
    check_target_program(
        ctx.accounts.target_program.key,
        ctx.accounts.target_program.executable,
    )?;

    if ctx.accounts.reserve.is_stale(clock.slot)? {
        msg!("Reserve is stale and must be refreshed in the current slot");
        return err!(LendingError::ReserveStale);
    }

    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    let mut ledger = SplTokenLedger::new(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.lending_market_authority.to_account_info(),
        signer_seeds,
        vec![
            ctx.accounts.source_liquidity.to_account_info(),
            ctx.accounts.destination_liquidity.to_account_info(),
            ctx.accounts.reserve_liquidity_fee_receiver.to_account_info(),
        ],
    );
    let mut receiver = ProgramReceiver {
        program: ctx.accounts.target_program.to_account_info(),
        accounts: ctx.remaining_accounts.to_vec(),
        data_prefix: target_data_prefix,
    };
    let loan = FlashLoan {
        supply: ctx.accounts.source_liquidity.key(),
        destination: ctx.accounts.destination_liquidity.key(),
        fee_receiver: ctx.accounts.reserve_liquidity_fee_receiver.key(),
        amount: liquidity_amount,
    };

    let fee = execute_flash_loan(&mut ctx.accounts.reserve, &mut ledger, &mut receiver, loan)?;

    emit!(FlashLoanExecuted {
        reserve: ctx.accounts.reserve.key(),
        target_program: ctx.accounts.target_program.key(),
        amount: liquidity_amount,
        fee,
    });

    msg!("Flash loan of {} repaid with {} fee", liquidity_amount, fee);

    Ok(())
}
