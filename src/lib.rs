//! `wellplate` library crate.
//!
//! The binary (`wellplate`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - transforms are reusable from other tools or notebooks
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod calibration;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod processing;
pub mod report;
