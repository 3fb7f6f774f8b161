pub mod liquidate_obligation;
pub mod refresh_obligation;
pub mod refresh_reserve;
pub mod refresh_reserve_aldrin_unstable_lp_token;

pub use liquidate_obligation::*;
pub use refresh_obligation::*;
pub use refresh_reserve::*;
pub use refresh_reserve_aldrin_unstable_lp_token::*;
