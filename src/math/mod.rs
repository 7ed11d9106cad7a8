//! Mathematical utilities: least squares line fitting and missing-aware means.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
