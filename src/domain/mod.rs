//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - request enums (`SourceKind`, `Period`, `Level`, `DateRange`)
//! - raw and enriched trade records (`RawFactRecord`, `EnrichedFact`)
//! - reference dimension entries (`CountryEntry`, `HtsEntry`, ...)
//! - aggregation and price outputs (`AggregatedRow`, `PriceRow`)

pub mod types;

pub use types::*;
