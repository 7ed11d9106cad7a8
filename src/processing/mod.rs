//! Pure table transforms.
//!
//! Each stage takes its inputs by reference and returns a fresh value:
//! - overflow cleaning on raw sheets (`overflow`)
//! - time-of-day → elapsed-hours indexing (`time_index`)
//! - division by optical density (`normalize`)
//! - renaming and replicate averaging (`replicates`)
//!
//! Nothing in here logs, reads files or knows about configuration.

pub mod normalize;
pub mod overflow;
pub mod replicates;
pub mod time_index;

pub use normalize::*;
pub use overflow::*;
pub use replicates::*;
pub use time_index::*;
