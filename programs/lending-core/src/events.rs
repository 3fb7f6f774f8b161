use anchor_lang::prelude::*;

// Decimal values are emitted as their raw u128 scaled by 1e18.

// ============================================================================
// LENDING MARKET EVENTS
// ============================================================================

/// Emitted when a new lending market is initialized
#[event]
pub struct LendingMarketInitialized {
    pub lending_market: Pubkey,
    pub owner: Pubkey,
    pub oracle_program: Pubkey,
    pub amm_program: Pubkey,
}

/// Emitted when the market owner hands over ownership
#[event]
pub struct LendingMarketOwnerChanged {
    pub lending_market: Pubkey,
    pub old_owner: Pubkey,
    pub new_owner: Pubkey,
}

/// Emitted when the owner changes market settings
#[event]
pub struct LendingMarketUpdated {
    pub lending_market: Pubkey,
    pub admin_bot: Pubkey,
    pub leveraged_compound_fee: u8,
    pub vault_compound_fee: u8,
    pub min_collateral_uac_value_for_leverage: u128,
}

/// Emitted when flash loans are switched on or off
#[event]
pub struct FlashLoansToggled {
    pub lending_market: Pubkey,
    pub enabled: bool,
}

// ============================================================================
// RESERVE EVENTS
// ============================================================================

/// Emitted when a new reserve is initialized
#[event]
pub struct ReserveInitialized {
    pub lending_market: Pubkey,
    pub reserve: Pubkey,
    pub liquidity_mint: Pubkey,
    pub liquidity_amount: u64,
    pub market_price: u128,
}

#[event]
pub struct ReserveConfigUpdated {
    pub reserve: Pubkey,
    pub loan_to_value_ratio: u8,
    pub liquidation_threshold: u8,
    pub max_leverage: u64,
}

/// Emitted when a reserve accrues interest and reads its oracle
#[event]
pub struct ReserveRefreshed {
    pub reserve: Pubkey,
    pub slot: u64,
    pub market_price: u128,
    pub cumulative_borrow_rate: u128,
    pub available_amount: u64,
    pub borrowed_amount: u128,
}

/// Emitted when liquidity is exchanged for collateral
#[event]
pub struct ReserveLiquidityDeposited {
    pub reserve: Pubkey,
    pub owner: Pubkey,
    pub liquidity_amount: u64,
    pub collateral_amount: u64,
}

/// Emitted when collateral is exchanged back for liquidity
#[event]
pub struct ReserveCollateralRedeemed {
    pub reserve: Pubkey,
    pub owner: Pubkey,
    pub collateral_amount: u64,
    pub liquidity_amount: u64,
}

#[event]
pub struct FlashLoanExecuted {
    pub reserve: Pubkey,
    pub target_program: Pubkey,
    pub amount: u64,
    pub fee: u64,
}

// ============================================================================
// OBLIGATION EVENTS
// ============================================================================

/// Emitted when a new obligation is initialized
#[event]
pub struct ObligationInitialized {
    pub lending_market: Pubkey,
    pub obligation: Pubkey,
    pub owner: Pubkey,
}

/// Emitted when an obligation is refreshed
#[event]
pub struct ObligationRefreshed {
    pub obligation: Pubkey,
    pub slot: u64,
    pub deposited_value: u128,
    pub borrowed_value: u128,
    pub allowed_borrow_value: u128,
    pub unhealthy_borrow_value: u128,
}

// ============================================================================
// USER ACTION EVENTS
// ============================================================================

/// Emitted when collateral is deposited into an obligation
#[event]
pub struct CollateralDeposited {
    pub obligation: Pubkey,
    pub reserve: Pubkey,
    pub collateral_amount: u64,
}

/// Emitted when collateral leaves an obligation
#[event]
pub struct CollateralWithdrawn {
    pub obligation: Pubkey,
    pub reserve: Pubkey,
    pub collateral_amount: u64,
}

/// Emitted when an obligation borrows liquidity
#[event]
pub struct LiquidityBorrowed {
    pub obligation: Pubkey,
    pub reserve: Pubkey,
    pub borrow_amount: u64,
    pub receive_amount: u64,
    pub borrow_fee: u64,
    pub host_fee: u64,
}

/// Emitted when borrowed liquidity is repaid
#[event]
pub struct LiquidityRepaid {
    pub obligation: Pubkey,
    pub reserve: Pubkey,
    pub repayer: Pubkey,
    pub repay_amount: u64,
}

// ============================================================================
// LIQUIDATION EVENTS
// ============================================================================

/// Emitted when an unhealthy obligation is liquidated
#[event]
pub struct ObligationLiquidated {
    pub obligation: Pubkey,
    pub liquidator: Pubkey,
    pub repay_reserve: Pubkey,
    pub withdraw_reserve: Pubkey,
    pub repay_amount: u64,
    pub withdraw_amount: u64,
}

// ============================================================================
// YIELD FARMING EVENTS
// ============================================================================

#[event]
pub struct LeveragedPositionOpened {
    pub obligation: Pubkey,
    pub reserve: Pubkey,
    pub farming_ticket: Pubkey,
    pub leverage: u64,
    pub borrow_amount: u64,
    pub stake_lp_amount: u64,
}

#[event]
pub struct LeveragedPositionClosed {
    pub obligation: Pubkey,
    pub reserve: Pubkey,
    pub farming_ticket: Pubkey,
    pub leverage: u64,
    pub withdrawn_amount: u64,
    pub repay_amount: u64,
}

#[event]
pub struct VaultPositionOpened {
    pub owner: Pubkey,
    pub pool: Pubkey,
    pub farming_ticket: Pubkey,
    pub stake_lp_amount: u64,
}

#[event]
pub struct VaultPositionClosed {
    pub owner: Pubkey,
    pub pool: Pubkey,
    pub farming_ticket: Pubkey,
}

/// Emitted when the admin bot swaps farmed rewards for staked LP tokens
#[event]
pub struct PositionCompounded {
    pub farming_ticket_owner: Pubkey,
    pub farming_ticket: Pubkey,
    pub farmed_amount: u64,
    pub stake_lp_amount: u64,
}

// ============================================================================
// EMISSION EVENTS
// ============================================================================

#[event]
pub struct EmissionCreated {
    pub emission: Pubkey,
    pub reserve: Pubkey,
    pub tokens: u8,
    pub starts_at_slot: u64,
    pub ends_at_slot: u64,
}

/// Emitted once per claimed obligation position
#[event]
pub struct EmissionClaimed {
    pub emission: Pubkey,
    pub obligation: Pubkey,
    pub claimed_from_slot: u64,
    pub claimed_to_slot: u64,
}

#[event]
pub struct EmissionClosed {
    pub emission: Pubkey,
    pub reserve: Pubkey,
}

#[event]
pub struct ReserveCapSnapshotTaken {
    pub reserve: Pubkey,
    pub slot: u64,
    pub available_amount: u64,
    pub borrowed_amount: u64,
}
