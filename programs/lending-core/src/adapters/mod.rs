pub mod aldrin;
pub mod pyth;
pub mod token_ledger;

pub use aldrin::*;
pub use pyth::*;
pub use token_ledger::*;

use anchor_lang::prelude::*;

use crate::math::Decimal;

// ============================================================================
// CAPABILITIES
// ============================================================================
//
// Flash loans and farming positions only talk to other programs through these
// traits. Handlers plug in the CPI implementations, tests plug in fakes.

/// Token balances and transfers between wallets
pub trait TokenLedger {
    fn balance(&self, wallet: &Pubkey) -> Result<u64>;

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u64) -> Result<()>;
}

/// Source of a token's market price
pub trait PriceOracle {
    /// Price of one whole token, rejected when stale at `slot`
    fn market_price(&self, slot: u64) -> Result<Decimal>;
}

/// Pool, swap and farming operations of an AMM
pub trait AmmPool {
    fn swap(&mut self, tokens: u64, min_tokens: u64, side: Side) -> Result<()>;

    /// Mints `lp_tokens` in exchange for at most the given base and quote
    fn create_basket(&mut self, lp_tokens: u64, base_max: u64, quote_max: u64) -> Result<()>;

    /// Locks LP tokens in a new farming ticket
    fn start_farming(&mut self, lp_tokens: u64) -> Result<()>;

    /// Unlocks every LP token of the farming ticket
    fn end_farming(&mut self) -> Result<()>;

    /// Burns `lp_tokens` for at least the given base and quote
    fn redeem_basket(&mut self, lp_tokens: u64, base_min: u64, quote_min: u64) -> Result<()>;

    /// Harvests rewards accrued by the farming ticket
    fn withdraw_farmed(&mut self) -> Result<()>;
}
