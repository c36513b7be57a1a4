//! Reporting utilities: price movers and formatted terminal output.

pub mod format;

pub use format::*;

use std::cmp::Ordering;

use crate::domain::PriceRow;

/// Latest-period year-over-year movers (top-N each side).
#[derive(Debug, Clone)]
pub struct Movers {
    pub rising: Vec<PriceRow>,
    pub falling: Vec<PriceRow>,
}

/// Rank the latest period's commodity prefixes by year-over-year change in
/// moving import price. Rows without a comparison are left out.
pub fn rank_movers(rows: &[PriceRow], top_n: usize) -> Movers {
    let Some(latest) = rows.iter().map(|r| r.date).max() else {
        return Movers {
            rising: Vec::new(),
            falling: Vec::new(),
        };
    };

    let mut ranked: Vec<(f64, &PriceRow)> = rows
        .iter()
        .filter(|r| r.date == latest)
        .filter_map(|r| r.pct_change_imports_year_over_year.map(|c| (c, r)))
        .collect();

    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    let rising = ranked.iter().take(top_n).map(|(_, r)| (*r).clone()).collect();

    ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    let falling = ranked.iter().take(top_n).map(|(_, r)| (*r).clone()).collect();

    Movers { rising, falling }
}
