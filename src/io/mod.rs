//! Input/output helpers.
//!
//! - CSV ingest of both source feeds + agricultural codes (`ingest`)
//! - CSV/JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
