pub mod close_leveraged_position;
pub mod close_vault_position;
pub mod compound_position;
pub mod open_leveraged_position;
pub mod open_vault_position;

pub use close_leveraged_position::*;
pub use close_vault_position::*;
pub use compound_position::*;
pub use open_leveraged_position::*;
pub use open_vault_position::*;
