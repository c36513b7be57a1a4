//! Remote data sources.

pub mod census;

pub use census::*;
