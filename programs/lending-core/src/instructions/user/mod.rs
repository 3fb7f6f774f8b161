pub mod borrow_obligation_liquidity;
pub mod deposit_obligation_collateral;
pub mod deposit_reserve_liquidity;
pub mod flash_loan;
pub mod init_obligation;
pub mod redeem_reserve_collateral;
pub mod repay_obligation_liquidity;
pub mod withdraw_obligation_collateral;

pub use borrow_obligation_liquidity::*;
pub use deposit_obligation_collateral::*;
pub use deposit_reserve_liquidity::*;
pub use flash_loan::*;
pub use init_obligation::*;
pub use redeem_reserve_collateral::*;
pub use repay_obligation_liquidity::*;
pub use withdraw_obligation_collateral::*;
