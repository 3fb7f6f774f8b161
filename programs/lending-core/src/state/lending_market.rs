use anchor_lang::prelude::*;

use crate::constants::MARKET_AUTHORITY_SEED;
use crate::errors::LendingError;
use crate::math::Decimal;

/// Global configuration of a lending market
/// Created with a fresh keypair, owned by `owner`
#[account]
#[derive(InitSpace)]
pub struct LendingMarket {
    /// Version for future upgrades
    pub version: u8,

    /// Bump of the market authority PDA
    /// PDA Seeds: ["authority", lending_market]
    pub authority_bump: u8,

    /// Only key allowed to change market and reserve configuration
    pub owner: Pubkey,

    /// Bot allowed to compound positions and take reserve snapshots
    pub admin_bot: Pubkey,

    /// Unit every reserve's oracle must quote its price in
    pub currency: UniversalAssetCurrency,

    /// Oracle program which owns reserve price and product accounts
    pub oracle_program: Pubkey,

    /// AMM program used for leveraged yield farming
    pub amm_program: Pubkey,

    /// Whether `flash_loan` is allowed
    pub enable_flash_loans: bool,

    /// Fee in percent the admin bot takes when compounding leveraged positions
    pub leveraged_compound_fee: u8,

    /// Fee in percent the admin bot takes when compounding vault positions
    pub vault_compound_fee: u8,

    /// Minimum obligation deposited value (in `currency`) to open leverage
    pub min_collateral_uac_value_for_leverage: Decimal,

    /// Reserved space for future upgrades
    pub _padding: [u8; 64],
}

impl LendingMarket {
    /// Signer seeds of the market authority PDA for `lending_market`
    pub fn authority_seeds<'a>(lending_market: &'a Pubkey, bump: &'a [u8; 1]) -> [&'a [u8]; 3] {
        [MARKET_AUTHORITY_SEED, lending_market.as_ref(), bump]
    }

    pub fn is_admin_bot(&self, key: &Pubkey) -> bool {
        self.admin_bot == *key
    }

    pub fn check_flash_loans_enabled(&self) -> Result<()> {
        if !self.enable_flash_loans {
            msg!("Flash loans are disabled for this market");
            return err!(LendingError::FlashLoansDisabled);
        }

        Ok(())
    }

    /// Leveraged yield farming only talks to the AMM the market was set up with
    pub fn check_amm_program(&self, amm_program: &Pubkey) -> Result<()> {
        if self.amm_program != *amm_program {
            msg!("Expected AMM program {}, got {}", self.amm_program, amm_program);
            return err!(LendingError::AmmProgramMismatch);
        }

        Ok(())
    }
}

/// Unit prices are quoted in. Either USD or any token identified by its mint.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, InitSpace, PartialEq, Eq)]
pub enum UniversalAssetCurrency {
    Usd,
    Pubkey { address: Pubkey },
}

impl Default for UniversalAssetCurrency {
    fn default() -> Self {
        Self::Usd
    }
}

impl UniversalAssetCurrency {
    /// Parses the value of the oracle product attribute `quote_currency`,
    /// zero padded on the right to 32 bytes
    pub fn from_quote_currency(value: &[u8]) -> Self {
        if value == b"USD" {
            return Self::Usd;
        }

        let mut address = [0u8; 32];
        let len = value.len().min(32);
        address[..len].copy_from_slice(&value[..len]);
        Self::Pubkey {
            address: Pubkey::new_from_array(address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> LendingMarket {
        LendingMarket {
            version: 1,
            authority_bump: 255,
            owner: Pubkey::new_unique(),
            admin_bot: Pubkey::new_unique(),
            currency: UniversalAssetCurrency::Usd,
            oracle_program: Pubkey::new_unique(),
            amm_program: Pubkey::new_unique(),
            enable_flash_loans: false,
            leveraged_compound_fee: 10,
            vault_compound_fee: 2,
            min_collateral_uac_value_for_leverage: Decimal::zero(),
            _padding: [0; 64],
        }
    }

    #[test]
    fn flash_loans_follow_the_market_toggle() {
        let mut market = market();
        assert_eq!(
            market.check_flash_loans_enabled().unwrap_err(),
            LendingError::FlashLoansDisabled.into()
        );

        market.enable_flash_loans = true;
        assert!(market.check_flash_loans_enabled().is_ok());
    }

    #[test]
    fn only_the_configured_amm_is_accepted() {
        let market = market();
        let amm_program = market.amm_program;

        assert!(market.check_amm_program(&amm_program).is_ok());
        assert_eq!(
            market.check_amm_program(&Pubkey::new_unique()).unwrap_err(),
            LendingError::AmmProgramMismatch.into()
        );
    }

    #[test]
    fn usd_quote_currency() {
        assert_eq!(
            UniversalAssetCurrency::from_quote_currency(b"USD"),
            UniversalAssetCurrency::Usd
        );
    }

    #[test]
    fn pubkey_quote_currency() {
        let mint = Pubkey::new_unique();
        assert_eq!(
            UniversalAssetCurrency::from_quote_currency(mint.as_ref()),
            UniversalAssetCurrency::Pubkey { address: mint }
        );
    }

    #[test]
    fn other_quote_currencies_never_match_usd() {
        assert_ne!(
            UniversalAssetCurrency::from_quote_currency(b"EUR"),
            UniversalAssetCurrency::Usd
        );
    }
}
