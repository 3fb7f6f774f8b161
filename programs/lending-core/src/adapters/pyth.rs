use anchor_lang::prelude::*;

use crate::adapters::PriceOracle;
use crate::constants::ORACLE_STALE_AFTER_SLOTS_ELAPSED;
use crate::errors::LendingError;
use crate::math::{Decimal, TryDiv, TryMul};
use crate::state::UniversalAssetCurrency;

// ============================================================================
// PYTH V2 ACCOUNT LAYOUT
// ============================================================================

const MAGIC: u32 = 0xa1b2_c3d4;
const VERSION_2: u32 = 2;
const ACCOUNT_TYPE_PRODUCT: u32 = 2;
const ACCOUNT_TYPE_PRICE: u32 = 3;
const PRICE_TYPE_PRICE: u32 = 1;

const PRODUCT_ACCOUNT_SIZE: usize = 512;
const PRODUCT_PRICE_ACCOUNT_OFFSET: usize = 16;
const PRODUCT_ATTRIBUTES_OFFSET: usize = 48;

const PRICE_TYPE_OFFSET: usize = 16;
const PRICE_EXPO_OFFSET: usize = 20;
const PRICE_VALID_SLOT_OFFSET: usize = 40;
const PRICE_AGGREGATE_OFFSET: usize = 208;
const PRICE_ACCOUNT_MIN_SIZE: usize = 240;

const QUOTE_CURRENCY_KEY: &[u8] = b"quote_currency";

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// Checks the header shared by every Pyth v2 account
fn validate_header(data: &[u8], account_type: u32, name: &str) -> Result<()> {
    if read_u32(data, 0) != MAGIC {
        msg!("Pyth {} account provided is not a valid Pyth account", name);
        return err!(LendingError::InvalidOracleConfig);
    }
    if read_u32(data, 4) != VERSION_2 {
        msg!(
            "Pyth {} account provided has a different version than expected",
            name
        );
        return err!(LendingError::InvalidOracleConfig);
    }
    if read_u32(data, 8) != account_type {
        msg!("Pyth {} account provided is not a valid Pyth {} account", name, name);
        return err!(LendingError::InvalidOracleConfig);
    }
    Ok(())
}

// ============================================================================
// PRODUCT
// ============================================================================

/// Product metadata, links to the price account and names the quote currency
pub struct PythProduct<'a> {
    data: &'a [u8],
}

impl<'a> PythProduct<'a> {
    pub fn load(data: &'a [u8]) -> Result<Self> {
        if data.len() < PRODUCT_ACCOUNT_SIZE {
            msg!("Pyth product account is too small");
            return err!(LendingError::InvalidOracleConfig);
        }
        validate_header(data, ACCOUNT_TYPE_PRODUCT, "product")?;
        Ok(Self { data })
    }

    /// Price account the product publishes to
    pub fn price_account(&self) -> Pubkey {
        let mut key = [0u8; 32];
        key.copy_from_slice(
            &self.data[PRODUCT_PRICE_ACCOUNT_OFFSET..PRODUCT_PRICE_ACCOUNT_OFFSET + 32],
        );
        Pubkey::new_from_array(key)
    }

    /// Walks the length prefixed key/value attributes for `quote_currency`
    pub fn quote_currency(&self) -> Result<UniversalAssetCurrency> {
        let attributes = &self.data[PRODUCT_ATTRIBUTES_OFFSET..PRODUCT_ACCOUNT_SIZE];

        let mut cursor = 0;
        while cursor < attributes.len() {
            let key_len = attributes[cursor] as usize;
            if key_len == 0 {
                break;
            }
            let key_start = cursor + 1;
            let value_len_at = key_start + key_len;
            if value_len_at >= attributes.len() {
                msg!("Pyth product attribute key length too long");
                return err!(LendingError::InvalidOracleConfig);
            }

            let value_len = attributes[value_len_at] as usize;
            let value_start = value_len_at + 1;
            let value_end = value_start + value_len;
            if value_end > attributes.len() {
                msg!("Pyth product attribute value length too long");
                return err!(LendingError::InvalidOracleConfig);
            }

            if &attributes[key_start..value_len_at] == QUOTE_CURRENCY_KEY {
                if value_len > 32 {
                    msg!("Pyth product quote currency value too long");
                    return err!(LendingError::InvalidOracleConfig);
                }
                return Ok(UniversalAssetCurrency::from_quote_currency(
                    &attributes[value_start..value_end],
                ));
            }

            cursor = value_end;
        }

        msg!("Pyth product quote currency not found");
        err!(LendingError::InvalidOracleConfig)
    }
}

// ============================================================================
// PRICE
// ============================================================================

/// Aggregate price of one whole token
pub struct PythPrice<'a> {
    data: &'a [u8],
}

impl<'a> PythPrice<'a> {
    pub fn load(data: &'a [u8]) -> Result<Self> {
        if data.len() < PRICE_ACCOUNT_MIN_SIZE {
            msg!("Pyth price account is too small");
            return err!(LendingError::InvalidOracleConfig);
        }
        validate_header(data, ACCOUNT_TYPE_PRICE, "price")?;
        if read_u32(data, PRICE_TYPE_OFFSET) != PRICE_TYPE_PRICE {
            msg!("Oracle price type is invalid");
            return err!(LendingError::InvalidOracleConfig);
        }
        Ok(Self { data })
    }

    pub fn expo(&self) -> i32 {
        read_u32(self.data, PRICE_EXPO_OFFSET) as i32
    }

    /// Slot the aggregate price was last published at
    pub fn valid_slot(&self) -> u64 {
        read_u64(self.data, PRICE_VALID_SLOT_OFFSET)
    }

    pub fn aggregate_price(&self) -> i64 {
        read_u64(self.data, PRICE_AGGREGATE_OFFSET) as i64
    }
}

impl PriceOracle for PythPrice<'_> {
    fn market_price(&self, slot: u64) -> Result<Decimal> {
        let valid_slot = self.valid_slot();
        let slots_elapsed = slot.saturating_sub(valid_slot);
        if slots_elapsed >= ORACLE_STALE_AFTER_SLOTS_ELAPSED {
            msg!(
                "Oracle price at slot {} is stale ({} slots behind)",
                valid_slot,
                slots_elapsed
            );
            return err!(LendingError::InvalidOracleConfig);
        }

        let price = u64::try_from(self.aggregate_price()).map_err(|_| {
            msg!("Oracle price cannot be negative");
            error!(LendingError::InvalidOracleConfig)
        })?;

        let expo = self.expo();
        let scaler = 10u64
            .checked_pow(expo.unsigned_abs())
            .ok_or_else(|| {
                msg!("An overflow of u64 with 10^{}", expo.unsigned_abs());
                error!(LendingError::MathOverflow)
            })?;

        if expo >= 0 {
            Decimal::from(price).try_mul(scaler)
        } else {
            Decimal::from(price).try_div(scaler)
        }
    }
}

/// Checks that `product` publishes to `price_key` in the market's currency
pub fn validate_oracle(
    product: &PythProduct,
    price_key: &Pubkey,
    currency: UniversalAssetCurrency,
) -> Result<()> {
    if product.price_account() != *price_key {
        msg!("Pyth product price account does not match the Pyth price provided");
        return err!(LendingError::InvalidOracleConfig);
    }

    if product.quote_currency()? != currency {
        msg!("Lending market quote currency does not match the oracle quote currency");
        return err!(LendingError::InvalidOracleConfig);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn header(data: &mut [u8], account_type: u32) {
        data[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        data[4..8].copy_from_slice(&VERSION_2.to_le_bytes());
        data[8..12].copy_from_slice(&account_type.to_le_bytes());
    }

    pub(crate) fn price_data(price: i64, expo: i32, valid_slot: u64) -> Vec<u8> {
        let mut data = vec![0u8; 3312];
        header(&mut data, ACCOUNT_TYPE_PRICE);
        data[PRICE_TYPE_OFFSET..PRICE_TYPE_OFFSET + 4]
            .copy_from_slice(&PRICE_TYPE_PRICE.to_le_bytes());
        data[PRICE_EXPO_OFFSET..PRICE_EXPO_OFFSET + 4].copy_from_slice(&expo.to_le_bytes());
        data[PRICE_VALID_SLOT_OFFSET..PRICE_VALID_SLOT_OFFSET + 8]
            .copy_from_slice(&valid_slot.to_le_bytes());
        data[PRICE_AGGREGATE_OFFSET..PRICE_AGGREGATE_OFFSET + 8]
            .copy_from_slice(&price.to_le_bytes());
        data
    }

    pub(crate) fn product_data(price_account: &Pubkey, attributes: &[(&[u8], &[u8])]) -> Vec<u8> {
        let mut data = vec![0u8; PRODUCT_ACCOUNT_SIZE];
        header(&mut data, ACCOUNT_TYPE_PRODUCT);
        data[PRODUCT_PRICE_ACCOUNT_OFFSET..PRODUCT_PRICE_ACCOUNT_OFFSET + 32]
            .copy_from_slice(price_account.as_ref());

        let mut cursor = PRODUCT_ATTRIBUTES_OFFSET;
        for (key, value) in attributes {
            data[cursor] = key.len() as u8;
            data[cursor + 1..cursor + 1 + key.len()].copy_from_slice(key);
            cursor += 1 + key.len();
            data[cursor] = value.len() as u8;
            data[cursor + 1..cursor + 1 + value.len()].copy_from_slice(value);
            cursor += 1 + value.len();
        }
        data
    }

    #[test]
    fn negative_exponent_divides() {
        let data = price_data(2_500_000, -4, 100);
        let price = PythPrice::load(&data).unwrap();
        assert_eq!(
            price.market_price(105).unwrap(),
            Decimal::from_scaled_val(250_000_000_000_000_000_000)
        );
    }

    #[test]
    fn positive_exponent_multiplies() {
        let data = price_data(3, 2, 100);
        let price = PythPrice::load(&data).unwrap();
        assert_eq!(price.market_price(100).unwrap(), Decimal::from(300u64));
    }

    #[test]
    fn stale_price_is_rejected() {
        let data = price_data(1, 0, 100);
        let price = PythPrice::load(&data).unwrap();
        assert!(price.market_price(119).is_ok());
        assert_eq!(
            price.market_price(120).unwrap_err(),
            LendingError::InvalidOracleConfig.into()
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        let data = price_data(-1, 0, 100);
        let price = PythPrice::load(&data).unwrap();
        assert!(price.market_price(100).is_err());
    }

    #[test]
    fn wrong_account_type_is_rejected() {
        let mut data = price_data(1, 0, 100);
        data[8..12].copy_from_slice(&ACCOUNT_TYPE_PRODUCT.to_le_bytes());
        assert!(PythPrice::load(&data).is_err());
        data[0] = 0;
        assert!(PythPrice::load(&data).is_err());
    }

    #[test]
    fn finds_quote_currency_after_other_attributes() {
        let price_key = Pubkey::new_unique();
        let data = product_data(
            &price_key,
            &[(b"symbol", b"SOL/USD"), (b"asset_type", b"Crypto"), (b"quote_currency", b"USD")],
        );
        let product = PythProduct::load(&data).unwrap();

        assert_eq!(product.price_account(), price_key);
        assert_eq!(product.quote_currency().unwrap(), UniversalAssetCurrency::Usd);
        validate_oracle(&product, &price_key, UniversalAssetCurrency::Usd).unwrap();
    }

    #[test]
    fn oracle_mismatches_are_rejected() {
        let price_key = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let data = product_data(&price_key, &[(b"quote_currency", mint.as_ref())]);
        let product = PythProduct::load(&data).unwrap();

        assert!(validate_oracle(&product, &Pubkey::new_unique(), UniversalAssetCurrency::Pubkey { address: mint }).is_err());
        assert!(validate_oracle(&product, &price_key, UniversalAssetCurrency::Usd).is_err());
        validate_oracle(&product, &price_key, UniversalAssetCurrency::Pubkey { address: mint }).unwrap();
    }

    #[test]
    fn missing_quote_currency() {
        let data = product_data(&Pubkey::new_unique(), &[(b"symbol", b"SOL/USD")]);
        let product = PythProduct::load(&data).unwrap();
        assert_eq!(
            product.quote_currency().unwrap_err(),
            LendingError::InvalidOracleConfig.into()
        );
    }
}
