use anchor_lang::prelude::*;

pub mod adapters;
pub mod constants;
pub mod errors;
pub mod events;
pub mod farming;
pub mod flash_loan;
pub mod instructions;
pub mod math;
pub mod state;

use instructions::*;
use state::{EmittedToken, LoanKind, ReserveConfig, UniversalAssetCurrency};

declare_id!("8ZvscLd4QtA2ymGiVYLbVVhpD5tTpHFo3tbKiJ18eHbx");

#[program]
pub mod lending_core {
    use super::*;

    // ============================================================================
    // ADMIN INSTRUCTIONS
    // ============================================================================

    /// Initialize a new lending market
    pub fn init_lending_market(
        ctx: Context<InitLendingMarket>,
        currency: UniversalAssetCurrency,
    ) -> Result<()> {
        instructions::admin::init_lending_market::handler(ctx, currency)
    }

    /// Hand the lending market over to a new owner
    pub fn set_lending_market_owner(ctx: Context<SetLendingMarketOwner>) -> Result<()> {
        instructions::admin::set_lending_market_owner::handler(ctx)
    }

    /// Update the admin bot, compound fees and leverage threshold
    pub fn update_lending_market(
        ctx: Context<UpdateLendingMarket>,
        params: UpdateLendingMarketParams,
    ) -> Result<()> {
        instructions::admin::update_lending_market::handler(ctx, params)
    }

    /// Enable or disable flash loans market wide
    pub fn toggle_flash_loans(ctx: Context<ToggleFlashLoans>) -> Result<()> {
        instructions::admin::toggle_flash_loans::handler(ctx)
    }

    /// Initialize a new reserve with its first deposit
    pub fn init_reserve(
        ctx: Context<InitReserve>,
        liquidity_amount: u64,
        config: ReserveConfig,
    ) -> Result<()> {
        instructions::admin::init_reserve::handler(ctx, liquidity_amount, config)
    }

    /// Initialize a reserve lending the LP token of a non stable Aldrin pool
    pub fn init_reserve_aldrin_unstable_lp_token(
        ctx: Context<InitReserveAldrinUnstableLpToken>,
        liquidity_amount: u64,
        config: ReserveConfig,
    ) -> Result<()> {
        instructions::admin::init_reserve_aldrin_unstable_lp_token::handler(
            ctx,
            liquidity_amount,
            config,
        )
    }

    /// Update reserve configuration
    pub fn update_reserve_config(
        ctx: Context<UpdateReserveConfig>,
        config: ReserveConfig,
    ) -> Result<()> {
        instructions::admin::update_reserve_config::handler(ctx, config)
    }

    // ============================================================================
    // USER INSTRUCTIONS
    // ============================================================================

    /// Initialize a user's obligation account
    pub fn init_obligation(ctx: Context<InitObligation>) -> Result<()> {
        instructions::user::init_obligation::handler(ctx)
    }

    /// Deposit liquidity into a reserve in exchange for collateral
    pub fn deposit_reserve_liquidity(
        ctx: Context<DepositReserveLiquidity>,
        liquidity_amount: u64,
    ) -> Result<()> {
        instructions::user::deposit_reserve_liquidity::handler(ctx, liquidity_amount)
    }

    /// Redeem collateral for the reserve's liquidity
    pub fn redeem_reserve_collateral(
        ctx: Context<RedeemReserveCollateral>,
        collateral_amount: u64,
    ) -> Result<()> {
        instructions::user::redeem_reserve_collateral::handler(ctx, collateral_amount)
    }

    /// Deposit collateral into an obligation
    pub fn deposit_obligation_collateral(
        ctx: Context<DepositObligationCollateral>,
        collateral_amount: u64,
    ) -> Result<()> {
        instructions::user::deposit_obligation_collateral::handler(ctx, collateral_amount)
    }

    /// Withdraw collateral from an obligation
    pub fn withdraw_obligation_collateral(
        ctx: Context<WithdrawObligationCollateral>,
        collateral_amount: u64,
    ) -> Result<()> {
        instructions::user::withdraw_obligation_collateral::handler(ctx, collateral_amount)
    }

    /// Borrow liquidity against the obligation's collateral
    pub fn borrow_obligation_liquidity<'info>(
        ctx: Context<'_, '_, 'info, 'info, BorrowObligationLiquidity<'info>>,
        liquidity_amount: u64,
    ) -> Result<()> {
        instructions::user::borrow_obligation_liquidity::handler(ctx, liquidity_amount)
    }

    /// Repay borrowed liquidity
    pub fn repay_obligation_liquidity(
        ctx: Context<RepayObligationLiquidity>,
        liquidity_amount: u64,
        loan_kind: LoanKind,
    ) -> Result<()> {
        instructions::user::repay_obligation_liquidity::handler(ctx, liquidity_amount, loan_kind)
    }

    /// Lend reserve liquidity for the duration of a CPI into another program
    pub fn flash_loan<'info>(
        ctx: Context<'_, '_, '_, 'info, FlashLoanReserveLiquidity<'info>>,
        liquidity_amount: u64,
        target_data_prefix: Vec<u8>,
    ) -> Result<()> {
        instructions::user::flash_loan::handler(ctx, liquidity_amount, target_data_prefix)
    }

    // ============================================================================
    // PERMISSIONLESS INSTRUCTIONS
    // ============================================================================

    /// Refresh reserve state (accrue interest, update price)
    pub fn refresh_reserve(ctx: Context<RefreshReserve>) -> Result<()> {
        instructions::permissionless::refresh_reserve::handler(ctx)
    }

    /// Refresh a reserve priced off an Aldrin pool vault
    pub fn refresh_reserve_aldrin_unstable_lp_token(
        ctx: Context<RefreshReserveAldrinUnstableLpToken>,
    ) -> Result<()> {
        instructions::permissionless::refresh_reserve_aldrin_unstable_lp_token::handler(ctx)
    }

    /// Refresh obligation values from its reserves
    pub fn refresh_obligation(ctx: Context<RefreshObligation>) -> Result<()> {
        instructions::permissionless::refresh_obligation::handler(ctx)
    }

    /// Liquidate an unhealthy obligation
    pub fn liquidate_obligation(
        ctx: Context<LiquidateObligation>,
        liquidity_amount: u64,
        loan_kind: LoanKind,
    ) -> Result<()> {
        instructions::permissionless::liquidate_obligation::handler(
            ctx,
            liquidity_amount,
            loan_kind,
        )
    }

    // ============================================================================
    // LEVERAGED YIELD FARMING INSTRUCTIONS
    // ============================================================================

    /// Borrow with leverage and stake the proceeds in an AMM farm
    pub fn open_leveraged_position(
        ctx: Context<OpenLeveragedPosition>,
        leverage: u64,
        stake_lp_amount: u64,
        liquidity_amount: u64,
        swap_amount: u64,
        min_swap_return: u64,
    ) -> Result<()> {
        instructions::leverage::open_leveraged_position::handler(
            ctx,
            leverage,
            stake_lp_amount,
            liquidity_amount,
            swap_amount,
            min_swap_return,
        )
    }

    /// Unstake a leveraged position and repay its loan
    pub fn close_leveraged_position(
        ctx: Context<CloseLeveragedPosition>,
        leverage: u64,
    ) -> Result<()> {
        instructions::leverage::close_leveraged_position::handler(ctx, leverage)
    }

    /// Stake LP tokens into a vault the admin bot compounds
    pub fn open_vault_position(ctx: Context<OpenVaultPosition>, stake_lp_amount: u64) -> Result<()> {
        instructions::leverage::open_vault_position::handler(ctx, stake_lp_amount)
    }

    /// Unstake a vault position
    pub fn close_vault_position(ctx: Context<CloseVaultPosition>) -> Result<()> {
        instructions::leverage::close_vault_position::handler(ctx)
    }

    /// Harvest a farming ticket and restake LP tokens in its place
    pub fn compound_position(
        ctx: Context<CompoundPosition>,
        stake_lp_amount: u64,
        seeds: Vec<Vec<u8>>,
    ) -> Result<()> {
        instructions::leverage::compound_position::handler(ctx, stake_lp_amount, seeds)
    }

    // ============================================================================
    // EMISSION INSTRUCTIONS
    // ============================================================================

    /// Create a reward emission for a reserve
    pub fn create_emission<'info>(
        ctx: Context<'_, '_, '_, 'info, CreateEmission<'info>>,
        starts_at_slot: u64,
        ends_at_slot: u64,
        min_slots_elapsed_before_claim: u64,
        tokens: Vec<EmittedToken>,
    ) -> Result<()> {
        instructions::emission::create_emission::handler(
            ctx,
            starts_at_slot,
            ends_at_slot,
            min_slots_elapsed_before_claim,
            tokens,
        )
    }

    /// Claim rewards of one obligation slot
    pub fn claim_emission<'info>(
        ctx: Context<'_, '_, '_, 'info, ClaimEmission<'info>>,
        slot_index: u8,
    ) -> Result<()> {
        instructions::emission::claim_emission::handler(ctx, slot_index)
    }

    /// Close an emission and return its wallets
    pub fn close_emission<'info>(
        ctx: Context<'_, '_, '_, 'info, CloseEmission<'info>>,
    ) -> Result<()> {
        instructions::emission::close_emission::handler(ctx)
    }

    /// Record the reserve's utilization for emission shares
    pub fn take_reserve_cap_snapshot(ctx: Context<TakeReserveCapSnapshot>) -> Result<()> {
        instructions::emission::take_reserve_cap_snapshot::handler(ctx)
    }
}
