//! `trade-flows` library crate.
//!
//! The binary (`tflow`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - the stages (ingest, dimensions, enrichment, aggregation, prices) can be
//!   driven from other front-ends against any `TradeStore`

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod io;
pub mod math;
pub mod normalize;
pub mod price;
pub mod reference;
pub mod report;
pub mod store;
