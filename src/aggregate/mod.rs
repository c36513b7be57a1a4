//! Aggregation engine.
//!
//! Given converted facts and a (period, level) request:
//!
//! 1. drop facts with no commodity key
//! 2. split into imports and exports
//! 3. group each side by the view's key columns, summing value and quantity
//! 4. outer-merge-coalesce the two sides on those columns
//! 5. zero-fill the missing side, sort by key, derive net metrics
//!
//! The key columns for every view come from one lookup table (`keys`), so the
//! same code path serves all sixteen views.

pub mod filter;
pub mod keys;
pub mod merge;

pub use filter::apply_filters;
pub use keys::{key_columns, key_of};
pub use merge::{KeyedRow, MergedRow, outer_merge_coalesce};

use std::collections::BTreeMap;

use crate::domain::{
    AggregatedRow, AggregationRequest, HydratedFact, KeyColumn, Level, SourceKind, TradeDirection,
};
use crate::error::AppError;
use crate::normalize::{ConvertedFact, convert_facts};

/// Per-group sums for one trade direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sums {
    pub value: f64,
    pub qty: f64,
}

/// Validate the request, filter, convert units and aggregate.
pub fn aggregate(
    source: SourceKind,
    request: &AggregationRequest,
    facts: &[HydratedFact],
) -> Result<Vec<AggregatedRow>, AppError> {
    if source == SourceKind::Org && request.level == Level::Naics {
        return Err(AppError::config(format!(
            "NAICS data is not available for source '{}'.",
            source.display_name()
        )));
    }
    let columns = key_columns(request.period, request.level);
    if request.group {
        return Err(AppError::not_implemented("Grouping by classification is not implemented yet"));
    }

    let filtered = apply_filters(facts, request)?;
    let converted = convert_facts(&filtered);
    let rows = aggregate_converted(columns, &converted)?;
    log::info!(
        "aggregated {} facts into {} rows ({} / {})",
        converted.len(),
        rows.len(),
        request.period.as_str(),
        request.level.as_str()
    );
    Ok(rows)
}

/// Group, merge, zero-fill, sort and derive net metrics over `columns`.
pub fn aggregate_converted(
    columns: &'static [KeyColumn],
    facts: &[ConvertedFact],
) -> Result<Vec<AggregatedRow>, AppError> {
    let attributable: Vec<&ConvertedFact> = facts.iter().filter(|f| f.hts_id.is_some()).collect();

    let imports = group_sums(&attributable, TradeDirection::Import, columns);
    let exports = group_sums(&attributable, TradeDirection::Export, columns);

    let merged = outer_merge_coalesce(imports, exports, columns)?;

    let mut rows: Vec<AggregatedRow> = merged
        .into_iter()
        .map(|m| {
            let imp = m.left.unwrap_or_default();
            let exp = m.right.unwrap_or_default();
            AggregatedRow {
                columns,
                key: m.key,
                imports: imp.value,
                exports: exp.value,
                imports_qty: imp.qty,
                exports_qty: exp.qty,
                net_value: exp.value - imp.value,
                net_qty: exp.qty - imp.qty,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(rows)
}

/// Sum value and quantity per key for one direction, in key order.
fn group_sums(
    facts: &[&ConvertedFact],
    direction: TradeDirection,
    columns: &[KeyColumn],
) -> Vec<KeyedRow<Sums>> {
    let mut groups: BTreeMap<Vec<Option<i64>>, Sums> = BTreeMap::new();
    for f in facts.iter().filter(|f| f.direction == direction) {
        let sums = groups.entry(key_of(f, columns)).or_default();
        sums.value += f.value;
        sums.qty += f.qty;
    }
    groups
        .into_iter()
        .map(|(key, measures)| KeyedRow { key, measures })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnrichedFact, Period};
    use crate::error::ErrorKind;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn hydrated(
        month: u32,
        direction: TradeDirection,
        hts_id: Option<i64>,
        country_id: i64,
        value: f64,
        qty: f64,
    ) -> HydratedFact {
        HydratedFact {
            fact: EnrichedFact {
                date: NaiveDate::from_ymd_opt(2020, month, 1).unwrap(),
                direction,
                country_id: Some(country_id),
                sitc_id: None,
                hts_id,
                naics_id: None,
                district_id: None,
                unit1_id: Some(1),
                unit2_id: None,
                value,
                end_use_i: None,
                end_use_e: None,
                qty_1: Some(qty),
                qty_2: None,
            },
            hts_code: hts_id.map(|id| format!("{id:0>10}")),
            agri_prod: hts_id.map(|_| false),
            naics_code: None,
            country_name: Some("X".to_string()),
            unit_1: Some("kg".to_string()),
            unit_2: None,
        }
    }

    #[test]
    fn import_and_export_of_same_group_merge_into_one_row() {
        let facts = vec![
            hydrated(1, TradeDirection::Import, Some(1), 1, 100.0, 10.0),
            hydrated(1, TradeDirection::Export, Some(1), 1, 50.0, 5.0),
        ];
        let req = AggregationRequest::new(Period::Monthly, Level::Hts);
        let rows = aggregate(SourceKind::Jp, &req, &facts).unwrap();

        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.key, vec![Some(2020), Some(1), Some(1)]);
        assert_eq!(r.imports, 100.0);
        assert_eq!(r.exports, 50.0);
        assert_eq!(r.net_value, -50.0);
        assert_eq!(r.imports_qty, 10.0);
        assert_eq!(r.exports_qty, 5.0);
        assert_eq!(r.net_qty, -5.0);
    }

    #[test]
    fn one_sided_groups_are_zero_filled() {
        let facts = vec![
            hydrated(1, TradeDirection::Import, Some(1), 1, 100.0, 10.0),
            hydrated(1, TradeDirection::Export, Some(2), 1, 30.0, 3.0),
        ];
        let req = AggregationRequest::new(Period::Yearly, Level::Hts);
        let rows = aggregate(SourceKind::Jp, &req, &facts).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(KeyColumn::HtsId), Some(1));
        assert_eq!((rows[0].exports, rows[0].exports_qty), (0.0, 0.0));
        assert_eq!(rows[1].get(KeyColumn::HtsId), Some(2));
        assert_eq!(rows[1].get(KeyColumn::Year), Some(2020));
        assert_eq!((rows[1].imports, rows[1].imports_qty), (0.0, 0.0));
        assert_eq!(rows[1].net_value, 30.0);
    }

    #[test]
    fn facts_without_commodity_are_excluded() {
        let facts = vec![
            hydrated(1, TradeDirection::Import, None, 1, 100.0, 10.0),
            hydrated(1, TradeDirection::Import, Some(1), 1, 1.0, 1.0),
        ];
        let req = AggregationRequest::new(Period::Yearly, Level::Total);
        let rows = aggregate(SourceKind::Jp, &req, &facts).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].imports, 1.0);
    }

    #[test]
    fn keys_are_unique_sorted_and_nets_hold() {
        let mut facts = Vec::new();
        for month in 1..=12 {
            for hts in 1..=3 {
                let dir = if (month + hts) % 3 == 0 {
                    TradeDirection::Export
                } else {
                    TradeDirection::Import
                };
                let country = (month % 2) as i64;
                let value = month as f64 * 3.0;
                facts.push(hydrated(month, dir, Some(hts as i64), country, value, hts as f64));
                facts.push(hydrated(month, TradeDirection::Export, Some(hts as i64), 1, 2.0, 0.5));
            }
        }

        for period in [Period::Yearly, Period::Fiscal, Period::Quarterly, Period::Monthly] {
            for level in [Level::Total, Level::Hts, Level::Country] {
                let req = AggregationRequest::new(period, level);
                let rows = aggregate(SourceKind::Jp, &req, &facts).unwrap();
                let keys: HashSet<_> = rows.iter().map(|r| r.key.clone()).collect();
                assert_eq!(keys.len(), rows.len());
                assert!(rows.windows(2).all(|w| w[0].key < w[1].key));
                for r in &rows {
                    assert_eq!(r.net_value, r.exports - r.imports);
                    assert_eq!(r.net_qty, r.exports_qty - r.imports_qty);
                }
                let total: f64 = rows.iter().map(|r| r.imports + r.exports).sum();
                let expected: f64 = facts.iter().map(|f| f.fact.value).sum();
                assert!((total - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn quarterly_view_puts_july_and_august_in_q2() {
        let facts = vec![
            hydrated(7, TradeDirection::Import, Some(1), 1, 1.0, 1.0),
            hydrated(8, TradeDirection::Import, Some(1), 1, 1.0, 1.0),
            hydrated(9, TradeDirection::Import, Some(1), 1, 1.0, 1.0),
        ];
        let req = AggregationRequest::new(Period::Quarterly, Level::Total);
        let rows = aggregate(SourceKind::Jp, &req, &facts).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(KeyColumn::Quarter), Some(2));
        assert_eq!(rows[0].imports, 2.0);
        assert_eq!(rows[1].get(KeyColumn::Quarter), Some(3));
    }

    #[test]
    fn naics_on_org_source_is_a_config_error() {
        let facts = vec![hydrated(1, TradeDirection::Import, Some(1), 1, 1.0, 1.0)];
        let req = AggregationRequest::new(Period::Yearly, Level::Naics);
        let err = aggregate(SourceKind::Org, &req, &facts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn classification_grouping_is_not_implemented() {
        let facts = vec![hydrated(1, TradeDirection::Import, Some(1), 1, 1.0, 1.0)];
        let mut req = AggregationRequest::new(Period::Yearly, Level::Total);
        req.group = true;
        let err = aggregate(SourceKind::Jp, &req, &facts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }
}
