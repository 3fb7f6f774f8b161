use anchor_lang::prelude::*;

#[error_code]
pub enum LendingError {
    // ------------------------------------------------------------------------
    // Arithmetic and input validation
    // ------------------------------------------------------------------------
    #[msg("Math operation overflowed")]
    MathOverflow,

    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    #[msg("Reserve config values are out of range")]
    InvalidConfig,

    #[msg("Instruction argument is invalid")]
    InvalidArgument,

    #[msg("Provided account does not match the expected account")]
    InvalidAccountInput,

    // ------------------------------------------------------------------------
    // Authorization
    // ------------------------------------------------------------------------
    #[msg("Signer is not the lending market owner")]
    InvalidMarketOwner,

    #[msg("Signer is not the obligation owner")]
    IllegalOwner,

    #[msg("Signer is not the lending market admin bot")]
    NotAdminBot,

    #[msg("Account belongs to a different lending market")]
    LendingMarketMismatch,

    // ------------------------------------------------------------------------
    // Staleness and oracle
    // ------------------------------------------------------------------------
    #[msg("Reserve is stale and must be refreshed in the current slot")]
    ReserveStale,

    #[msg("Obligation is stale and must be refreshed")]
    ObligationStale,

    #[msg("Oracle account is malformed, mismatched or stale")]
    InvalidOracleConfig,

    // ------------------------------------------------------------------------
    // Reserve
    // ------------------------------------------------------------------------
    #[msg("Reserve does not hold enough liquidity")]
    InsufficientFunds,

    #[msg("Reserve collateral cannot be used as a collateral")]
    ReserveCollateralDisabled,

    #[msg("Flash loans are disabled for this lending market")]
    FlashLoansDisabled,

    #[msg("Flash loan target must be an executable program other than this one")]
    InvalidFlashLoanTargetProgram,

    #[msg("Insufficient reserve liquidity after flash loan")]
    FlashLoanNotRepaid,

    // ------------------------------------------------------------------------
    // Obligation
    // ------------------------------------------------------------------------
    #[msg("Obligation cannot hold any more distinct reserves")]
    ObligationReserveLimit,

    #[msg("Obligation has no such reserve collateral")]
    ObligationCollateralEmpty,

    #[msg("Obligation has no such reserve liquidity")]
    ObligationLiquidityEmpty,

    #[msg("Obligation has no deposits")]
    ObligationDepositsZero,

    #[msg("Obligation is healthy and cannot be liquidated")]
    ObligationHealthy,

    #[msg("No valid account provided for obligation reserve")]
    MissingReserveAccount,

    #[msg("Obligation slot index is out of range")]
    InvalidObligationSlot,

    #[msg("Borrow amount is too small to receive liquidity after fees")]
    BorrowTooSmall,

    #[msg("Borrow value cannot exceed maximum borrow value")]
    BorrowTooLarge,

    #[msg("Repay amount is too small to transfer liquidity")]
    RepayTooSmall,

    #[msg("Withdraw value cannot exceed maximum withdraw value")]
    WithdrawTooLarge,

    #[msg("Liquidation amount is too small to receive collateral")]
    LiquidationTooSmall,

    // ------------------------------------------------------------------------
    // Leveraged yield farming
    // ------------------------------------------------------------------------
    #[msg("AMM program ID must match provided account id")]
    AmmProgramMismatch,

    #[msg("AMM pool account is malformed or not owned by the AMM program")]
    InvalidAmmPool,

    #[msg("Leverage exceeds the reserve's maximum leverage")]
    LeverageTooHigh,

    #[msg("Obligation collateral value is below the minimum for leverage")]
    CollateralTooLowForLeverage,

    #[msg("Position must not leave tokens with the borrower")]
    PositionMustNotLeaveTokensWithBorrower,

    #[msg("Farmed token mint must differ from the LP token mint")]
    FarmMintMustDifferFromLp,

    #[msg("Compounded LP value must not be less than the farmed value minus fee")]
    CompoundingLpPriceMustNotBeLessThanFarmPrice,

    #[msg("Farming receipt does not belong to this position")]
    FarmingReceiptMismatch,

    #[msg("Only the owner can close a position that still has collateral")]
    CannotCloseForeignPosition,

    // ------------------------------------------------------------------------
    // Emissions and snapshots
    // ------------------------------------------------------------------------
    #[msg("Too many emitted tokens")]
    TooManyEmittedTokens,

    #[msg("Emission wallet accounts do not match the strategy")]
    EmissionWalletMismatch,

    #[msg("Must wait before emission becomes claimable")]
    EmissionNotClaimableYet,

    #[msg("Emission has ended for this position")]
    EmissionEnded,

    #[msg("Emission cannot be closed before the delay period passes")]
    EmissionCloseDelayNotPassed,

    #[msg("Not enough reserve cap snapshots")]
    NotEnoughSnapshots,
}
