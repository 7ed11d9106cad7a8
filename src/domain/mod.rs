//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw spreadsheet cells and sheets as read from the instrument export (`RawSheet`)
//! - time-indexed measurement tables (`MeasurementTable`)
//! - calibration, renaming and plot-source vocabulary (`CalibrationCurve`, `RenameMap`, ...)

pub mod sheet;
pub mod table;
pub mod types;

pub use sheet::*;
pub use table::*;
pub use types::*;
