pub mod admin;
pub mod emission;
pub mod leverage;
pub mod permissionless;
pub mod user;

pub use admin::*;
pub use emission::*;
pub use leverage::*;
pub use permissionless::*;
pub use user::*;
