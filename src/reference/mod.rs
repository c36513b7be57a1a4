//! Reference dimension tables.
//!
//! - surrogate-key assignment over distinct natural keys (`build`)
//! - natural-key and surrogate-key lookups over a built set (`index`)

pub mod build;
pub mod index;

pub use build::*;
pub use index::*;
