use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, MintTo, Token, TokenAccount, Transfer};

use crate::adapters::{validate_oracle, PriceOracle, PythPrice, PythProduct};
use crate::constants::{
    COLLATERAL_MINT_SEED, COLLATERAL_SUPPLY_SEED, FEE_RECEIVER_SEED, LIQUIDITY_SUPPLY_SEED,
    MARKET_AUTHORITY_SEED,
};
use crate::errors::LendingError;
use crate::events::ReserveInitialized;
use crate::state::{
    InitReserveParams, LendingMarket, Reserve, ReserveCapSnapshots, ReserveConfig, ReserveOracle,
};

/// Accounts for initializing a new reserve
#[derive(Accounts)]
pub struct InitReserve<'info> {
    /// Owner of the lending market, funds the initial liquidity
    #[account(mut)]
    pub owner: Signer<'info>,

    /// The lending market this reserve belongs to
    #[account(
        has_one = owner @ LendingError::InvalidMarketOwner
    )]
    pub lending_market: Box<Account<'info, LendingMarket>>,

    /// CHECK: PDA signing for reserve wallets and the collateral mint
    #[account(
        seeds = [MARKET_AUTHORITY_SEED, lending_market.key().as_ref()],
        bump = lending_market.authority_bump
    )]
    pub lending_market_authority: UncheckedAccount<'info>,

    /// The reserve account to initialize
    /// PDA: ["reserve", lending_market, liquidity_mint]
    #[account(
        init,
        payer = owner,
        space = 8 + Reserve::INIT_SPACE,
        seeds = [Reserve::SEED_PREFIX, lending_market.key().as_ref(), liquidity_mint.key().as_ref()],
        bump
    )]
    pub reserve: Box<Account<'info, Reserve>>,

    /// Mint of the token lent by this reserve
    pub liquidity_mint: Box<Account<'info, Mint>>,

    /// Owner's wallet funding the initial liquidity
    #[account(
        mut,
        constraint = source_liquidity_wallet.mint == liquidity_mint.key() @ LendingError::InvalidAccountInput
    )]
    pub source_liquidity_wallet: Box<Account<'info, TokenAccount>>,

    /// PDA: ["liquidity_supply", reserve]
    #[account(
        init,
        payer = owner,
        seeds = [LIQUIDITY_SUPPLY_SEED, reserve.key().as_ref()],
        bump,
        token::mint = liquidity_mint,
        token::authority = lending_market_authority
    )]
    pub reserve_liquidity_supply: Box<Account<'info, TokenAccount>>,

    /// PDA: ["fee_receiver", reserve]
    #[account(
        init,
        payer = owner,
        seeds = [FEE_RECEIVER_SEED, reserve.key().as_ref()],
        bump,
        token::mint = liquidity_mint,
        token::authority = lending_market_authority
    )]
    pub reserve_liquidity_fee_receiver: Box<Account<'info, TokenAccount>>,

    /// PDA: ["collateral_mint", reserve]
    #[account(
        init,
        payer = owner,
        seeds = [COLLATERAL_MINT_SEED, reserve.key().as_ref()],
        bump,
        mint::decimals = liquidity_mint.decimals,
        mint::authority = lending_market_authority
    )]
    pub reserve_collateral_mint: Box<Account<'info, Mint>>,

    /// PDA: ["collateral_supply", reserve]
    #[account(
        init,
        payer = owner,
        seeds = [COLLATERAL_SUPPLY_SEED, reserve.key().as_ref()],
        bump,
        token::mint = reserve_collateral_mint,
        token::authority = lending_market_authority
    )]
    pub reserve_collateral_supply: Box<Account<'info, TokenAccount>>,

    /// Owner's new wallet receiving the initial collateral (fresh keypair)
    #[account(
        init,
        payer = owner,
        token::mint = reserve_collateral_mint,
        token::authority = owner
    )]
    pub destination_collateral_wallet: Box<Account<'info, TokenAccount>>,

    /// Pyth product account describing the liquidity token
    /// CHECK: Parsed and validated in handler
    #[account(
        constraint = *oracle_product.owner == lending_market.oracle_program @ LendingError::InvalidOracleConfig
    )]
    pub oracle_product: UncheckedAccount<'info>,

    /// Pyth price account of the liquidity token
    /// CHECK: Parsed and validated in handler
    #[account(
        constraint = *oracle_price.owner == lending_market.oracle_program @ LendingError::InvalidOracleConfig
    )]
    pub oracle_price: UncheckedAccount<'info>,

    /// Utilization ring buffer, allocated by the caller beforehand
    #[account(zero)]
    pub snapshots: AccountLoader<'info, ReserveCapSnapshots>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

/// Initialize a new reserve (asset pool)
///
/// The reserve starts with `liquidity_amount` tokens from the owner, who gets
/// the same amount of collateral back. The oracle product must point at the
/// price account and quote in the market's currency.
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `liquidity_amount` - Initial liquidity, must be positive
/// * `config` - Risk and interest rate parameters
pub fn handler(ctx: Context<InitReserve>, liquidity_amount: u64, config: ReserveConfig) -> Result<()> {
    let clock = Clock::get()?;
    let lending_market_key = ctx.accounts.lending_market.key();
    let reserve_key = ctx.accounts.reserve.key();
    let oracle_price_key = ctx.accounts.oracle_price.key();

    let market_price = {
        let product_data = ctx.accounts.oracle_product.try_borrow_data()?;
        let product = PythProduct::load(&product_data)?;
        validate_oracle(&product, &oracle_price_key, ctx.accounts.lending_market.currency)?;

        let price_data = ctx.accounts.oracle_price.try_borrow_data()?;
        PythPrice::load(&price_data)?.market_price(clock.slot)?
    };

    let mut snapshots = ctx.accounts.snapshots.load_init()?;
    snapshots.reserve = reserve_key;
    drop(snapshots);

    let collateral_amount = ctx.accounts.reserve.initialize(
        InitReserveParams {
            bump: ctx.bumps.reserve,
            lending_market: lending_market_key,
            slot: clock.slot,
            snapshots: ctx.accounts.snapshots.key(),
            liquidity_mint: ctx.accounts.liquidity_mint.key(),
            liquidity_mint_decimals: ctx.accounts.liquidity_mint.decimals,
            liquidity_supply: ctx.accounts.reserve_liquidity_supply.key(),
            fee_receiver: ctx.accounts.reserve_liquidity_fee_receiver.key(),
            oracle: ReserveOracle::Pyth {
                price: oracle_price_key,
            },
            market_price,
            collateral_mint: ctx.accounts.reserve_collateral_mint.key(),
            collateral_supply: ctx.accounts.reserve_collateral_supply.key(),
            config,
        },
        liquidity_amount,
    )?;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.source_liquidity_wallet.to_account_info(),
                to: ctx.accounts.reserve_liquidity_supply.to_account_info(),
                authority: ctx.accounts.owner.to_account_info(),
            },
        ),
        liquidity_amount,
    )?;

    let bump = [ctx.accounts.lending_market.authority_bump];
    let seeds = LendingMarket::authority_seeds(&lending_market_key, &bump);
    let signer_seeds = &[&seeds[..]];

    token::mint_to(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            MintTo {
                mint: ctx.accounts.reserve_collateral_mint.to_account_info(),
                to: ctx.accounts.destination_collateral_wallet.to_account_info(),
                authority: ctx.accounts.lending_market_authority.to_account_info(),
            },
            signer_seeds,
        ),
        collateral_amount,
    )?;

    emit!(ReserveInitialized {
        lending_market: lending_market_key,
        reserve: reserve_key,
        liquidity_mint: ctx.accounts.liquidity_mint.key(),
        liquidity_amount,
        market_price: market_price.to_scaled_val()?,
    });

    msg!("Reserve initialized: {}", reserve_key);
    msg!("Liquidity mint: {}", ctx.accounts.liquidity_mint.key());
    msg!("Initial liquidity: {}, market price: {}", liquidity_amount, market_price);

    Ok(())
}
