pub mod init_lending_market;
pub mod init_reserve;
pub mod init_reserve_aldrin_unstable_lp_token;
pub mod set_lending_market_owner;
pub mod toggle_flash_loans;
pub mod update_lending_market;
pub mod update_reserve_config;

pub use init_lending_market::*;
pub use init_reserve::*;
pub use init_reserve_aldrin_unstable_lp_token::*;
pub use set_lending_market_owner::*;
pub use toggle_flash_loans::*;
pub use update_lending_market::*;
pub use update_reserve_config::*;
