//! Input/output helpers.
//!
//! - workbook / CSV sheet sources (`workbook`)
//! - CSV and JSON exports (`export`)
//! - staged publishing of output files (`staging`)

pub mod export;
pub mod staging;
pub mod workbook;

pub use export::*;
pub use staging::*;
pub use workbook::*;
