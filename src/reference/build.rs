//! Derive deduplicated dimension tables from a raw fact stream.
//!
//! Every dimension follows the same recipe: project the natural key and its
//! descriptive attributes, drop rows with a null key, keep one row per distinct
//! key (first occurrence wins for the attributes), then number the keys 1..=N
//! in natural-key order. Equal input therefore always yields equal keys.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::{
    CountryEntry, Dimensions, DistrictEntry, HtsEntry, NaicsEntry, RawFactRecord, SitcEntry,
    UnitEntry,
};

/// Build every dimension table for one ingestion batch.
pub fn build_dimensions(records: &[RawFactRecord], agri_codes: &HashSet<String>) -> Dimensions {
    let dims = Dimensions {
        country: build_country(records),
        hts: build_hts(records, agri_codes),
        sitc: build_sitc(records),
        naics: build_naics(records),
        district: build_district(records),
        unit: build_unit(records),
    };
    log::info!(
        "built dimensions: country={} hts={} sitc={} naics={} district={} unit={}",
        dims.country.len(),
        dims.hts.len(),
        dims.sitc.len(),
        dims.naics.len(),
        dims.district.len(),
        dims.unit.len()
    );
    dims
}

pub fn build_country(records: &[RawFactRecord]) -> Vec<CountryEntry> {
    rank_distinct(records.iter().map(|r| (r.country_code.clone(), r.country_name.clone())))
        .into_iter()
        .map(|(id, cty_code, country_name)| CountryEntry {
            id,
            cty_code,
            country_name,
        })
        .collect()
}

/// Commodity dimension; `agri_prod` is set when the 4-digit prefix is in `agri_codes`.
pub fn build_hts(records: &[RawFactRecord], agri_codes: &HashSet<String>) -> Vec<HtsEntry> {
    rank_distinct(records.iter().map(|r| {
        (
            r.commodity_code.clone(),
            (r.commodity_short_desc.clone(), r.commodity_long_desc.clone()),
        )
    }))
    .into_iter()
    .map(|(id, hts_code, (hts_short_desc, hts_long_desc))| {
        let agri_prod = hts_code.get(0..4).is_some_and(|p| agri_codes.contains(p));
        HtsEntry {
            id,
            hts_code,
            hts_short_desc,
            hts_long_desc,
            agri_prod,
        }
    })
    .collect()
}

pub fn build_sitc(records: &[RawFactRecord]) -> Vec<SitcEntry> {
    rank_distinct(
        records
            .iter()
            .map(|r| (r.sitc_code.clone(), (r.sitc_short_desc.clone(), r.sitc_long_desc.clone()))),
    )
    .into_iter()
    .map(|(id, sitc_code, (sitc_short_desc, sitc_long_desc))| SitcEntry {
        id,
        sitc_code,
        sitc_short_desc,
        sitc_long_desc,
    })
    .collect()
}

pub fn build_naics(records: &[RawFactRecord]) -> Vec<NaicsEntry> {
    rank_distinct(records.iter().map(|r| (r.naics_code.clone(), r.naics_desc.clone())))
        .into_iter()
        .map(|(id, naics_code, naics_description)| NaicsEntry {
            id,
            naics_code,
            naics_description,
        })
        .collect()
}

pub fn build_district(records: &[RawFactRecord]) -> Vec<DistrictEntry> {
    rank_distinct(records.iter().map(|r| (r.district_code.clone(), r.district_desc.clone())))
        .into_iter()
        .map(|(id, district_code, district_desc)| DistrictEntry {
            id,
            district_code,
            district_desc,
        })
        .collect()
}

/// Units are drawn from both quantity columns so either join can resolve.
pub fn build_unit(records: &[RawFactRecord]) -> Vec<UnitEntry> {
    let codes = records
        .iter()
        .flat_map(|r| [r.unit_1.clone(), r.unit_2.clone()])
        .map(|code| (code, ()));
    rank_distinct(codes)
        .into_iter()
        .map(|(id, unit_code, ())| UnitEntry { id, unit_code })
        .collect()
}

/// Assign dense 1-based keys to the distinct non-null natural keys.
///
/// Attributes come from the first row carrying each key. Ordering is
/// [`code_order`]; the sort is stable, so ordinal ties keep input order.
pub fn rank_distinct<A>(
    rows: impl IntoIterator<Item = (Option<String>, A)>,
) -> Vec<(i64, String, A)> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut distinct: Vec<(String, A)> = Vec::new();
    for (key, attrs) in rows {
        let Some(key) = key else { continue };
        if seen.insert(key.clone()) {
            distinct.push((key, attrs));
        }
    }

    distinct.sort_by(|a, b| code_order(&a.0, &b.0));

    distinct
        .into_iter()
        .enumerate()
        .map(|(idx, (key, attrs))| (idx as i64 + 1, key, attrs))
        .collect()
}

/// Numeric comparison when both codes are all digits, text comparison otherwise.
///
/// Numerically equal codes with different text (`"01"` vs `"1"`) fall back to
/// text order so the ordering stays total.
pub fn code_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(
        country: Option<&str>,
        name: &str,
        hts: Option<&str>,
        unit_1: Option<&str>,
        unit_2: Option<&str>,
    ) -> RawFactRecord {
        RawFactRecord {
            year: 2020,
            month: 1,
            country_code: country.map(str::to_string),
            country_name: Some(name.to_string()),
            commodity_code: hts.map(str::to_string),
            unit_1: unit_1.map(str::to_string),
            unit_2: unit_2.map(str::to_string),
            ..RawFactRecord::default()
        }
    }

    #[test]
    fn keys_are_dense_and_follow_natural_order() {
        let records = vec![
            rec(Some("5700"), "China", None, None, None),
            rec(Some("1220"), "Canada", None, None, None),
            rec(Some("5700"), "China", None, None, None),
            rec(None, "Unknown", None, None, None),
            rec(Some("49"), "Somewhere", None, None, None),
        ];
        let countries = build_country(&records);
        let ids: Vec<i64> = countries.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let codes: Vec<&str> = countries.iter().map(|c| c.cty_code.as_str()).collect();
        assert_eq!(codes, vec!["49", "1220", "5700"]);
    }

    #[test]
    fn same_key_keeps_first_attributes_and_one_id() {
        let records = vec![
            rec(Some("1220"), "Canada", None, None, None),
            rec(Some("1220"), "Canada (alt)", None, None, None),
        ];
        let countries = build_country(&records);
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].country_name.as_deref(), Some("Canada"));
    }

    #[test]
    fn build_is_deterministic_regardless_of_input_order() {
        let a = vec![
            rec(Some("3"), "c", None, None, None),
            rec(Some("1"), "a", None, None, None),
            rec(Some("2"), "b", None, None, None),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(build_country(&a), build_country(&b));
    }

    #[test]
    fn all_null_keys_yield_an_empty_dimension() {
        let records = vec![rec(Some("1"), "a", None, None, None)];
        assert!(build_naics(&records).is_empty());
        assert!(build_hts(&records, &HashSet::new()).is_empty());
    }

    #[test]
    fn all_null_column_leaves_its_dimension_empty_and_ids_null() {
        let records = vec![
            rec(Some("1220"), "Canada", Some("0101000000"), Some("kg"), None),
            rec(Some("5700"), "China", Some("0202000000"), Some("kg"), None),
        ];
        let dims = build_dimensions(&records, &HashSet::new());
        assert!(dims.naics.is_empty());
        assert!(dims.district.is_empty());
        assert_eq!(dims.country.len(), 2);

        let index = crate::reference::DimensionIndex::new(&dims);
        let facts = crate::enrich::enrich(&records, crate::domain::SourceKind::Jp, &index);
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.naics_id.is_none() && f.district_id.is_none()));
        assert!(facts.iter().all(|f| f.hts_id.is_some()));
    }

    #[test]
    fn hts_flags_agricultural_prefixes() {
        let records = vec![
            rec(None, "", Some("0101000000"), None, None),
            rec(None, "", Some("8802000000"), None, None),
        ];
        let agri: HashSet<String> = ["0101".to_string()].into_iter().collect();
        let hts = build_hts(&records, &agri);
        assert!(hts[0].agri_prod);
        assert!(!hts[1].agri_prod);
    }

    #[test]
    fn unit_dimension_covers_both_columns() {
        let records = vec![
            rec(None, "", None, Some("kg"), Some("t")),
            rec(None, "", None, Some("kg"), None),
            rec(None, "", None, Some("doz"), Some("kg")),
        ];
        let units = build_unit(&records);
        let codes: Vec<&str> = units.iter().map(|u| u.unit_code.as_str()).collect();
        assert_eq!(codes, vec!["doz", "kg", "t"]);
        assert_eq!(units.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn code_order_is_numeric_for_digit_codes() {
        assert_eq!(code_order("49", "1220"), Ordering::Less);
        assert_eq!(code_order("abc", "abd"), Ordering::Less);
        assert_eq!(code_order("01", "1"), Ordering::Less);
    }
}
