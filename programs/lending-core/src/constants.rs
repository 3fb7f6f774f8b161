/// Lending core protocol constants

// ============================================================================
// SCALING CONSTANTS
// ============================================================================

/// Scale of the fixed-point `Decimal` (1e18)
pub const WAD: u64 = 1_000_000_000_000_000_000;

/// Half of `WAD`, used for rounding to nearest
pub const HALF_WAD: u64 = 500_000_000_000_000_000;

/// Scale of a whole percent in `WAD` units (1e16)
pub const PERCENT_SCALER: u64 = 10_000_000_000_000_000;

/// Initial exchange rate between reserve collateral and liquidity
pub const INITIAL_COLLATERAL_RATIO: u64 = 1;

// ============================================================================
// TIME
// ============================================================================

/// Target ticks per second of the host ledger
pub const DEFAULT_TICKS_PER_SECOND: u64 = 160;

/// Ticks per slot of the host ledger
pub const DEFAULT_TICKS_PER_SLOT: u64 = 64;

/// Slots per year used to spread the annual borrow rate
pub const SLOTS_PER_YEAR: u64 =
    DEFAULT_TICKS_PER_SECOND / DEFAULT_TICKS_PER_SLOT * 60 * 60 * 24 * 365;

/// Slots per week
pub const SLOTS_PER_WEEK: u64 = DEFAULT_TICKS_PER_SECOND / DEFAULT_TICKS_PER_SLOT * 60 * 60 * 24 * 7;

// ============================================================================
// STALENESS
// ============================================================================

/// A reserve or obligation is stale once this many slots pass since refresh
pub const MARKET_STALE_AFTER_SLOTS_ELAPSED: u64 = 1;

/// An oracle price older than this many slots is rejected
pub const ORACLE_STALE_AFTER_SLOTS_ELAPSED: u64 = 20;

/// Leveraged positions may open on an obligation refreshed this recently
pub const MAX_OBLIGATION_REFRESH_SLOTS_FOR_LEVERAGE: u64 = 10;

// ============================================================================
// PDA SEEDS
// ============================================================================

/// Seed prefix for the market authority PDA which owns every vault
pub const MARKET_AUTHORITY_SEED: &[u8] = b"authority";

/// Seed prefix for the reserve liquidity supply PDA
pub const LIQUIDITY_SUPPLY_SEED: &[u8] = b"liquidity_supply";

/// Seed prefix for the reserve fee receiver PDA
pub const FEE_RECEIVER_SEED: &[u8] = b"fee_receiver";

/// Seed prefix for the reserve collateral mint PDA
pub const COLLATERAL_MINT_SEED: &[u8] = b"collateral_mint";

/// Seed prefix for the reserve collateral supply PDA
pub const COLLATERAL_SUPPLY_SEED: &[u8] = b"collateral_supply";

// ============================================================================
// LIMITS
// ============================================================================

/// Maximum distinct reserves (deposits plus borrows) per obligation
pub const MAX_OBLIGATION_RESERVES: usize = 10;

/// Leverage of an unleveraged position, in percent
pub const NO_LEVERAGE: u64 = 100;

// ============================================================================
// LIQUIDATION
// ============================================================================

/// Maximum percentage of the obligation borrowed value liquidated at once
pub const LIQUIDATION_CLOSE_FACTOR: u8 = 50;

/// Loans of at most this many tokens are liquidated in full
pub const LIQUIDATION_CLOSE_AMOUNT: u64 = 2;

// ============================================================================
// EMISSIONS
// ============================================================================

/// Maximum tokens an emission strategy can distribute
pub const EMISSION_TOKENS_COUNT: usize = 5;

/// Length of the reserve cap snapshot ring buffer
pub const SNAPSHOTS_COUNT: usize = 1000;

/// Extra slots an emission stays open after it ends so late claims can land
pub const EMISSION_CLOSE_GRACE_SLOTS: u64 = SLOTS_PER_WEEK * 2;
