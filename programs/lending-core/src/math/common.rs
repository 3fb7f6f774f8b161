use anchor_lang::prelude::*;

/// Checked addition that fails with `MathOverflow` instead of wrapping
pub trait TryAdd: Sized {
    fn try_add(self, rhs: Self) -> Result<Self>;
}

/// Checked subtraction that fails with `MathOverflow` instead of wrapping
pub trait TrySub: Sized {
    fn try_sub(self, rhs: Self) -> Result<Self>;
}

/// Checked division, `RHS` may be a plain integer or another decimal
pub trait TryDiv<RHS>: Sized {
    fn try_div(self, rhs: RHS) -> Result<Self>;
}

/// Checked multiplication, `RHS` may be a plain integer or another decimal
pub trait TryMul<RHS>: Sized {
    fn try_mul(self, rhs: RHS) -> Result<Self>;
}
