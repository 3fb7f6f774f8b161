pub mod emission;
pub mod farming_receipt;
pub mod last_update;
pub mod lending_market;
pub mod obligation;
pub mod reserve;

pub use emission::*;
pub use farming_receipt::*;
pub use last_update::*;
pub use lending_market::*;
pub use obligation::*;
pub use reserve::*;
