//! Numeric helpers for time-series statistics.

pub mod rolling;

pub use rolling::*;
