//! Unit normalization and calendar derivations.
//!
//! - unit conversion + quarter / fiscal-year buckets (`units`)
//! - the converted-fact stage that feeds aggregation (`ConvertedFact`)

pub mod units;

pub use units::*;

use chrono::Datelike;

use crate::domain::{HydratedFact, TradeDirection};

/// A hydrated fact reduced to what the aggregation engine groups and sums.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedFact {
    pub year: i32,
    pub month: u32,
    pub quarter: Option<u32>,
    pub fiscal_year: i32,
    pub direction: TradeDirection,
    pub hts_id: Option<i64>,
    pub naics_id: Option<i64>,
    pub country_id: Option<i64>,
    pub value: f64,
    /// `convert(qty_1, unit_1) + convert(qty_2, unit_2)`, missing quantities as 0.
    pub qty: f64,
}

/// Convert both quantity/unit pairs to canonical units and derive the
/// calendar buckets for each fact.
pub fn convert_facts(facts: &[HydratedFact]) -> Vec<ConvertedFact> {
    facts
        .iter()
        .map(|h| {
            let f = &h.fact;
            let conv_1 = convert(f.qty_1.unwrap_or(0.0), h.unit_1.as_deref().unwrap_or(""));
            let conv_2 = convert(f.qty_2.unwrap_or(0.0), h.unit_2.as_deref().unwrap_or(""));
            ConvertedFact {
                year: f.date.year(),
                month: f.date.month(),
                quarter: quarter_of(f.date.month()),
                fiscal_year: fiscal_year(f.date.year(), f.date.month()),
                direction: f.direction,
                hts_id: f.hts_id,
                naics_id: f.naics_id,
                country_id: f.country_id,
                value: f.value,
                qty: conv_1 + conv_2,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnrichedFact;
    use chrono::NaiveDate;

    fn hydrated(
        month: u32,
        qty_1: Option<f64>,
        unit_1: &str,
        qty_2: Option<f64>,
        unit_2: Option<&str>,
    ) -> HydratedFact {
        HydratedFact {
            fact: EnrichedFact {
                date: NaiveDate::from_ymd_opt(2021, month, 1).unwrap(),
                direction: TradeDirection::Import,
                country_id: Some(1),
                sitc_id: None,
                hts_id: Some(3),
                naics_id: None,
                district_id: None,
                unit1_id: Some(1),
                unit2_id: None,
                value: 10.0,
                end_use_i: None,
                end_use_e: None,
                qty_1,
                qty_2,
            },
            hts_code: Some("0101000000".to_string()),
            agri_prod: Some(true),
            naics_code: None,
            country_name: Some("X".to_string()),
            unit_1: Some(unit_1.to_string()),
            unit_2: unit_2.map(str::to_string),
        }
    }

    #[test]
    fn both_pairs_are_converted_then_summed() {
        let out = convert_facts(&[hydrated(2, Some(2.0), "t", Some(3.0), Some("kg"))]);
        assert!((out[0].qty - (2.0 * 907.185 + 3.0)).abs() < 1e-9);
    }

    #[test]
    fn missing_quantities_count_as_zero() {
        let out = convert_facts(&[hydrated(2, None, "kg", None, None)]);
        assert_eq!(out[0].qty, 0.0);
    }

    #[test]
    fn calendar_buckets_are_attached() {
        let out = convert_facts(&[hydrated(7, Some(1.0), "kg", None, None)]);
        assert_eq!(out[0].quarter, Some(2));
        assert_eq!(out[0].fiscal_year, 2022);
        assert_eq!(out[0].year, 2021);
        assert_eq!(out[0].month, 7);
    }
}
