//! Checked fixed-point arithmetic shared by every money calculation.

pub mod common;
pub mod decimal;

pub use common::*;
pub use decimal::*;
