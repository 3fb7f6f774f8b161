pub mod claim_emission;
pub mod close_emission;
pub mod create_emission;
pub mod take_reserve_cap_snapshot;

pub use claim_emission::*;
pub use close_emission::*;
pub use create_emission::*;
pub use take_reserve_cap_snapshot::*;
