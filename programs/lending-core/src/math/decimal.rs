use std::fmt;

use anchor_lang::prelude::*;
use uint::construct_uint;

use crate::constants::{HALF_WAD, PERCENT_SCALER, WAD};
use crate::errors::LendingError;
use crate::math::{TryAdd, TryDiv, TryMul, TrySub};

/// Number of decimal places kept by `Decimal`
pub const SCALE: usize = 18;

#[allow(clippy::assign_op_pattern, clippy::ptr_offset_with_cast, clippy::manual_range_contains)]
mod u192 {
    use super::construct_uint;

    construct_uint! {
        /// 192-bit unsigned integer, three little-endian u64 words
        pub struct U192(3);
    }
}

pub use u192::U192;

/// Non-negative fixed-point number with 18 decimal places.
///
/// Stored on-chain as 24 little-endian bytes. Every operation is checked and
/// fails with `LendingError::MathOverflow` rather than wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal(pub U192);

impl Decimal {
    pub fn one() -> Self {
        Self(Self::wad())
    }

    pub fn zero() -> Self {
        Self(U192::zero())
    }

    fn wad() -> U192 {
        U192::from(WAD)
    }

    fn half_wad() -> U192 {
        U192::from(HALF_WAD)
    }

    /// e.g. `from_percent(80)` is 0.8
    pub fn from_percent(percent: u8) -> Self {
        Self(U192::from(percent as u64 * PERCENT_SCALER))
    }

    /// Wraps a value already scaled by `WAD`
    pub fn from_scaled_val(scaled_val: u128) -> Self {
        Self(U192::from(scaled_val))
    }

    pub fn to_scaled_val(&self) -> Result<u128> {
        u128::try_from(self.0).map_err(|_| error!(LendingError::MathOverflow))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn try_round_u64(&self) -> Result<u64> {
        let rounded = Self::half_wad()
            .checked_add(self.0)
            .ok_or(LendingError::MathOverflow)?
            .checked_div(Self::wad())
            .ok_or(LendingError::MathOverflow)?;
        u64::try_from(rounded).map_err(|_| error!(LendingError::MathOverflow))
    }

    pub fn try_ceil_u64(&self) -> Result<u64> {
        let ceil = Self::wad()
            .checked_sub(U192::one())
            .ok_or(LendingError::MathOverflow)?
            .checked_add(self.0)
            .ok_or(LendingError::MathOverflow)?
            .checked_div(Self::wad())
            .ok_or(LendingError::MathOverflow)?;
        u64::try_from(ceil).map_err(|_| error!(LendingError::MathOverflow))
    }

    pub fn try_floor_u64(&self) -> Result<u64> {
        let floor = self
            .0
            .checked_div(Self::wad())
            .ok_or(LendingError::MathOverflow)?;
        u64::try_from(floor).map_err(|_| error!(LendingError::MathOverflow))
    }

    /// Exponentiation by squaring
    pub fn try_pow(&self, mut exp: u64) -> Result<Self> {
        let mut base = *self;
        let mut ret = if exp % 2 != 0 { base } else { Self::one() };

        while exp > 1 {
            exp /= 2;
            base = base.try_mul(base)?;
            if exp % 2 != 0 {
                ret = ret.try_mul(base)?;
            }
        }

        Ok(ret)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut scaled_val = self.0.to_string();
        if scaled_val.len() <= SCALE {
            scaled_val.insert_str(0, &"0".repeat(SCALE - scaled_val.len()));
            scaled_val.insert_str(0, "0.");
        } else {
            scaled_val.insert(scaled_val.len() - SCALE, '.');
        }
        f.write_str(&scaled_val)
    }
}

impl From<u64> for Decimal {
    fn from(val: u64) -> Self {
        Self(Self::wad() * U192::from(val))
    }
}

impl From<u128> for Decimal {
    fn from(val: u128) -> Self {
        Self(Self::wad() * U192::from(val))
    }
}

impl TryAdd for Decimal {
    fn try_add(self, rhs: Self) -> Result<Self> {
        Ok(Self(
            self.0
                .checked_add(rhs.0)
                .ok_or(LendingError::MathOverflow)?,
        ))
    }
}

impl TrySub for Decimal {
    fn try_sub(self, rhs: Self) -> Result<Self> {
        Ok(Self(
            self.0
                .checked_sub(rhs.0)
                .ok_or(LendingError::MathOverflow)?,
        ))
    }
}

impl TryDiv<u64> for Decimal {
    fn try_div(self, rhs: u64) -> Result<Self> {
        Ok(Self(
            self.0
                .checked_div(U192::from(rhs))
                .ok_or(LendingError::MathOverflow)?,
        ))
    }
}

impl TryDiv<Decimal> for Decimal {
    fn try_div(self, rhs: Self) -> Result<Self> {
        Ok(Self(
            self.0
                .checked_mul(Self::wad())
                .ok_or(LendingError::MathOverflow)?
                .checked_div(rhs.0)
                .ok_or(LendingError::MathOverflow)?,
        ))
    }
}

impl TryMul<u64> for Decimal {
    fn try_mul(self, rhs: u64) -> Result<Self> {
        Ok(Self(
            self.0
                .checked_mul(U192::from(rhs))
                .ok_or(LendingError::MathOverflow)?,
        ))
    }
}

impl TryMul<Decimal> for Decimal {
    fn try_mul(self, rhs: Self) -> Result<Self> {
        Ok(Self(
            self.0
                .checked_mul(rhs.0)
                .ok_or(LendingError::MathOverflow)?
                .checked_div(Self::wad())
                .ok_or(LendingError::MathOverflow)?,
        ))
    }
}

impl AnchorSerialize for Decimal {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        AnchorSerialize::serialize(&self.0 .0, writer)
    }
}

impl AnchorDeserialize for Decimal {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let words = <[u64; 3] as AnchorDeserialize>::deserialize_reader(reader)?;
        Ok(Self(U192(words)))
    }
}

impl anchor_lang::Space for Decimal {
    const INIT_SPACE: usize = 24;
}

#[cfg(feature = "idl-build")]
impl anchor_lang::IdlBuild for Decimal {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scaler() {
        assert_eq!(U192::exp10(SCALE), Decimal::wad());
        assert_eq!(Decimal::from_percent(100), Decimal::one());
    }

    #[test]
    fn rounds_half_up() {
        let half = Decimal::one().try_div(2u64).unwrap();
        assert_eq!(half.try_floor_u64().unwrap(), 0);
        assert_eq!(half.try_round_u64().unwrap(), 1);
        assert_eq!(half.try_ceil_u64().unwrap(), 1);

        let third = Decimal::one().try_div(3u64).unwrap();
        assert_eq!(third.try_round_u64().unwrap(), 0);
        assert_eq!(third.try_ceil_u64().unwrap(), 1);
    }

    #[test]
    fn pow_matches_repeated_multiplication() {
        let base = Decimal::from_percent(110);
        let mut expected = Decimal::one();
        for exp in 0..8 {
            assert_eq!(base.try_pow(exp).unwrap(), expected);
            expected = expected.try_mul(base).unwrap();
        }
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(Decimal::one().try_div(0u64).is_err());
        assert!(Decimal::one().try_div(Decimal::zero()).is_err());
    }

    #[test]
    fn subtraction_below_zero_is_an_error() {
        assert!(Decimal::zero().try_sub(Decimal::one()).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Decimal::from(3u64).to_string(), "3.000000000000000000");
        assert_eq!(
            Decimal::from_percent(5).to_string(),
            "0.050000000000000000"
        );
    }

    #[test]
    fn borsh_layout_is_24_bytes() {
        let value = Decimal::from(42u64);
        let mut bytes = Vec::new();
        value.serialize(&mut bytes).unwrap();
        assert_eq!(bytes.len(), <Decimal as anchor_lang::Space>::INIT_SPACE);
        assert_eq!(Decimal::deserialize(&mut bytes.as_slice()).unwrap(), value);
    }

    proptest! {
        #[test]
        fn floor_round_ceil_are_ordered(scaled in 0u128..u64::MAX as u128 * WAD as u128) {
            let d = Decimal::from_scaled_val(scaled);
            let floor = d.try_floor_u64().unwrap();
            let round = d.try_round_u64().unwrap();
            let ceil = d.try_ceil_u64().unwrap();
            prop_assert!(floor <= round);
            prop_assert!(round <= ceil);
            prop_assert!(ceil - floor <= 1);
        }

        #[test]
        fn integers_survive_mul_div(a in 0u64..u32::MAX as u64, b in 1u64..u32::MAX as u64) {
            let product = Decimal::from(a).try_mul(Decimal::from(b)).unwrap();
            prop_assert_eq!(product.try_div(Decimal::from(b)).unwrap(), Decimal::from(a));
        }
    }
}
