//! Price/trend pipeline over the monthly commodity view.
//!
//! Unit prices are computed per 4-digit commodity prefix (`hs4`) and month,
//! then smoothed with a trailing 3-period window. Ranks are cross-sectional
//! within a month; period-over-period and year-over-year changes run along
//! each prefix's own history.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::domain::{AggregatedRow, KeyColumn, PriceRow};
use crate::error::AppError;
use crate::math::{lag, ordinal_rank, pct_change, relative_change, rolling_mean, rolling_std};
use crate::reference::DimensionIndex;

pub const MOVING_WINDOW: usize = 3;
pub const BAND_WIDTH: f64 = 2.0;
/// Periods back for year-over-year comparisons.
pub const YEAR_LAG: usize = 12;

/// Monthly totals for one commodity prefix.
#[derive(Debug, Clone, PartialEq)]
struct Bucket {
    date: NaiveDate,
    year: i32,
    month: u32,
    hs4: String,
    imports: f64,
    exports: f64,
    imports_qty: f64,
    exports_qty: f64,
    price_imports: f64,
    price_exports: f64,
}

/// Moving statistics, ranks and bands for one (date, hs4).
#[derive(Debug, Clone, Copy, Default)]
struct Banded {
    moving_imports: f64,
    moving_exports: f64,
    std_imports: f64,
    std_exports: f64,
    rank_imports: i64,
    rank_exports: i64,
}

/// Run the price pipeline over rows from the (monthly, hts) view.
pub fn price_trends(
    rows: &[AggregatedRow],
    index: &DimensionIndex,
) -> Result<Vec<PriceRow>, AppError> {
    let buckets = bucket_by_prefix(rows, index)?;
    let banded = band(&buckets);
    let joined = join_one_to_one(buckets, &banded)?;
    let out = with_changes(joined);
    log::info!("computed {} price rows", out.len());
    Ok(out)
}

/// Zero quantities become 1, then rows are summed per (year, month, hs4) and
/// priced. Output is ordered by (date, hs4).
fn bucket_by_prefix(
    rows: &[AggregatedRow],
    index: &DimensionIndex,
) -> Result<Vec<Bucket>, AppError> {
    let mut sums: BTreeMap<(i32, u32, String), [f64; 4]> = BTreeMap::new();

    for row in rows {
        let (Some(year), Some(month)) = (row.get(KeyColumn::Year), row.get(KeyColumn::Month)) else {
            return Err(AppError::config(
                "Price trends need the monthly view (year and month keys).",
            ));
        };
        if !row.columns.contains(&KeyColumn::HtsId) {
            return Err(AppError::config("Price trends need the commodity view (hts keys)."));
        }
        let hts_id = row.get(KeyColumn::HtsId);
        let entry = index
            .hts(hts_id)
            .ok_or_else(|| {
                AppError::integrity(format!("Unknown hts_id in aggregated rows: {hts_id:?}"))
            })?;
        let hs4: String = entry.hts_code.chars().take(4).collect();

        let year = i32::try_from(year)
            .map_err(|_| AppError::integrity(format!("Year out of range: {year}")))?;
        let month = u32::try_from(month)
            .map_err(|_| AppError::integrity(format!("Month out of range: {month}")))?;

        let acc = sums.entry((year, month, hs4)).or_insert([0.0; 4]);
        acc[0] += row.imports;
        acc[1] += row.exports;
        acc[2] += one_if_zero(row.imports_qty);
        acc[3] += one_if_zero(row.exports_qty);
    }

    let mut buckets = Vec::with_capacity(sums.len());
    for ((year, month, hs4), [imports, exports, imports_qty, exports_qty]) in sums {
        let date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::integrity(format!("Invalid period: {year}-{month}")))?;
        buckets.push(Bucket {
            date,
            year,
            month,
            hs4,
            imports,
            exports,
            imports_qty,
            exports_qty,
            price_imports: imports / imports_qty,
            price_exports: exports / exports_qty,
        });
    }
    Ok(buckets)
}

fn one_if_zero(qty: f64) -> f64 {
    if qty == 0.0 { 1.0 } else { qty }
}

/// Positions of each prefix's rows, in date order.
fn series_by_prefix(buckets: &[Bucket]) -> BTreeMap<&str, Vec<usize>> {
    let mut series: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, b) in buckets.iter().enumerate() {
        series.entry(b.hs4.as_str()).or_default().push(i);
    }
    series
}

/// Moving mean/std per prefix, then ranks per date. Returns one entry per
/// input bucket, keyed by (date, hs4).
fn band(buckets: &[Bucket]) -> Vec<((NaiveDate, String), Banded)> {
    let mut stats = vec![Banded::default(); buckets.len()];

    for idxs in series_by_prefix(buckets).values() {
        let imports: Vec<f64> = idxs.iter().map(|&i| buckets[i].price_imports).collect();
        let exports: Vec<f64> = idxs.iter().map(|&i| buckets[i].price_exports).collect();
        let mi = rolling_mean(&imports, MOVING_WINDOW);
        let me = rolling_mean(&exports, MOVING_WINDOW);
        let si = rolling_std(&imports, MOVING_WINDOW);
        let se = rolling_std(&exports, MOVING_WINDOW);
        for (pos, &i) in idxs.iter().enumerate() {
            stats[i].moving_imports = mi[pos];
            stats[i].moving_exports = me[pos];
            stats[i].std_imports = si[pos];
            stats[i].std_exports = se[pos];
        }
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, b) in buckets.iter().enumerate() {
        by_date.entry(b.date).or_default().push(i);
    }
    for idxs in by_date.values() {
        let imports: Vec<f64> = idxs.iter().map(|&i| stats[i].moving_imports).collect();
        let exports: Vec<f64> = idxs.iter().map(|&i| stats[i].moving_exports).collect();
        let ri = ordinal_rank(&imports);
        let re = ordinal_rank(&exports);
        for (pos, &i) in idxs.iter().enumerate() {
            stats[i].rank_imports = ri[pos];
            stats[i].rank_exports = re[pos];
        }
    }

    buckets
        .iter()
        .zip(stats)
        .map(|(b, s)| ((b.date, b.hs4.clone()), s))
        .collect()
}

/// Attach banded statistics to each bucket. Every bucket must match exactly
/// one banded entry.
fn join_one_to_one(
    buckets: Vec<Bucket>,
    banded: &[((NaiveDate, String), Banded)],
) -> Result<Vec<(Bucket, Banded)>, AppError> {
    let mut lookup: HashMap<(NaiveDate, &str), Banded> = HashMap::with_capacity(banded.len());
    for ((date, hs4), stats) in banded {
        if lookup.insert((*date, hs4.as_str()), *stats).is_some() {
            return Err(AppError::integrity(format!(
                "Price band join is not one-to-one: duplicate ({date}, {hs4})"
            )));
        }
    }

    let mut seen: HashSet<(NaiveDate, String)> = HashSet::with_capacity(buckets.len());
    let mut out = Vec::with_capacity(buckets.len());
    for b in buckets {
        let key = (b.date, b.hs4.clone());
        if !seen.insert(key) {
            return Err(AppError::integrity(format!(
                "Price band join is not one-to-one: repeated ({}, {})",
                b.date, b.hs4
            )));
        }
        let stats = lookup.get(&(b.date, b.hs4.as_str())).copied().ok_or_else(|| {
            AppError::integrity(format!("Price band join missed ({}, {})", b.date, b.hs4))
        })?;
        out.push((b, stats));
    }
    Ok(out)
}

/// Bands, period-over-period change and year-over-year comparisons.
fn with_changes(joined: Vec<(Bucket, Banded)>) -> Vec<PriceRow> {
    let buckets: Vec<Bucket> = joined.iter().map(|(b, _)| b.clone()).collect();
    let mut pct_i = vec![None; joined.len()];
    let mut pct_e = vec![None; joined.len()];
    let mut prev_i = vec![None; joined.len()];
    let mut prev_e = vec![None; joined.len()];
    let mut prev_ri = vec![None; joined.len()];
    let mut prev_re = vec![None; joined.len()];

    for idxs in series_by_prefix(&buckets).values() {
        let mi: Vec<f64> = idxs.iter().map(|&i| joined[i].1.moving_imports).collect();
        let me: Vec<f64> = idxs.iter().map(|&i| joined[i].1.moving_exports).collect();
        let ri: Vec<i64> = idxs.iter().map(|&i| joined[i].1.rank_imports).collect();
        let re: Vec<i64> = idxs.iter().map(|&i| joined[i].1.rank_exports).collect();

        let (ci, ce) = (pct_change(&mi), pct_change(&me));
        let (li, le) = (lag(&mi, YEAR_LAG), lag(&me, YEAR_LAG));
        let (lri, lre) = (lag(&ri, YEAR_LAG), lag(&re, YEAR_LAG));
        for (pos, &i) in idxs.iter().enumerate() {
            pct_i[i] = ci[pos];
            pct_e[i] = ce[pos];
            prev_i[i] = li[pos];
            prev_e[i] = le[pos];
            prev_ri[i] = lri[pos];
            prev_re[i] = lre[pos];
        }
    }

    joined
        .into_iter()
        .enumerate()
        .map(|(i, (b, s))| PriceRow {
            date: b.date,
            year: b.year,
            month: b.month,
            hs4: b.hs4,
            imports: b.imports,
            exports: b.exports,
            imports_qty: b.imports_qty,
            exports_qty: b.exports_qty,
            price_imports: b.price_imports,
            price_exports: b.price_exports,
            moving_price_imports: s.moving_imports,
            moving_price_exports: s.moving_exports,
            moving_price_imports_std: s.std_imports,
            moving_price_exports_std: s.std_exports,
            rank_imports: s.rank_imports,
            rank_exports: s.rank_exports,
            upper_band_imports: s.moving_imports + BAND_WIDTH * s.std_imports,
            lower_band_imports: s.moving_imports - BAND_WIDTH * s.std_imports,
            upper_band_exports: s.moving_exports + BAND_WIDTH * s.std_exports,
            lower_band_exports: s.moving_exports - BAND_WIDTH * s.std_exports,
            pct_change_imports: pct_i[i],
            pct_change_exports: pct_e[i],
            prev_year_imports: prev_i[i],
            prev_year_exports: prev_e[i],
            prev_year_rank_imports: prev_ri[i],
            prev_year_rank_exports: prev_re[i],
            pct_change_imports_year_over_year: prev_i[i]
                .and_then(|p| relative_change(p, s.moving_imports)),
            pct_change_exports_year_over_year: prev_e[i]
                .and_then(|p| relative_change(p, s.moving_exports)),
            rank_imports_change_year_over_year: prev_ri[i].map(|p| s.rank_imports - p),
            rank_exports_change_year_over_year: prev_re[i].map(|p| s.rank_exports - p),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::key_columns;
    use crate::domain::{Dimensions, HtsEntry, Level, Period};
    use crate::error::ErrorKind;

    fn index() -> DimensionIndex {
        let hts = |id: i64, code: &str| HtsEntry {
            id,
            hts_code: code.to_string(),
            hts_short_desc: None,
            hts_long_desc: None,
            agri_prod: false,
        };
        DimensionIndex::new(&Dimensions {
            hts: vec![hts(1, "0101000000"), hts(2, "0101990000"), hts(3, "0202000000")],
            ..Default::default()
        })
    }

    fn row(
        year: i64,
        month: i64,
        hts_id: i64,
        imports: f64,
        imports_qty: f64,
        exports: f64,
        exports_qty: f64,
    ) -> AggregatedRow {
        AggregatedRow {
            columns: key_columns(Period::Monthly, Level::Hts),
            key: vec![Some(year), Some(month), Some(hts_id)],
            imports,
            exports,
            imports_qty,
            exports_qty,
            net_value: exports - imports,
            net_qty: exports_qty - imports_qty,
        }
    }

    #[test]
    fn codes_sharing_a_prefix_are_summed_and_priced() {
        let rows = vec![
            row(2020, 1, 1, 100.0, 10.0, 0.0, 0.0),
            row(2020, 1, 2, 50.0, 15.0, 0.0, 0.0),
        ];
        let out = price_trends(&rows, &index()).unwrap();

        assert_eq!(out.len(), 1);
        let p = &out[0];
        assert_eq!(p.hs4, "0101");
        assert_eq!(p.imports, 150.0);
        assert_eq!(p.imports_qty, 25.0);
        assert!((p.price_imports - 6.0).abs() < 1e-12);
        // both zero quantities became 1
        assert_eq!(p.exports_qty, 2.0);
        assert_eq!(p.price_exports, 0.0);
        assert_eq!(p.moving_price_imports_std, 0.0);
        assert_eq!(p.upper_band_imports, p.moving_price_imports);
        assert_eq!(p.pct_change_imports, None);
    }

    #[test]
    fn zero_quantity_prices_at_raw_value() {
        let out = price_trends(&[row(2020, 3, 3, 42.0, 0.0, 7.0, 0.0)], &index()).unwrap();
        assert_eq!(out[0].price_imports, 42.0);
        assert_eq!(out[0].price_exports, 7.0);
    }

    #[test]
    fn ranks_are_per_date_and_rows_sorted() {
        let rows = vec![
            row(2020, 2, 3, 10.0, 1.0, 1.0, 1.0),
            row(2020, 2, 1, 20.0, 1.0, 1.0, 1.0),
            row(2020, 1, 3, 30.0, 1.0, 1.0, 1.0),
            row(2020, 1, 1, 5.0, 1.0, 1.0, 1.0),
        ];
        let out = price_trends(&rows, &index()).unwrap();
        let keys: Vec<(u32, &str)> = out.iter().map(|p| (p.month, p.hs4.as_str())).collect();
        assert_eq!(keys, vec![(1, "0101"), (1, "0202"), (2, "0101"), (2, "0202")]);

        // January: 5 vs 30
        assert_eq!((out[0].rank_imports, out[1].rank_imports), (1, 2));
        // February moving prices: 0101 -> (5+20)/2, 0202 -> (30+10)/2
        assert_eq!((out[2].rank_imports, out[3].rank_imports), (1, 2));
        // equal export prices keep (date, hs4) order
        assert_eq!((out[2].rank_exports, out[3].rank_exports), (1, 2));

        let pct = out[2].pct_change_imports.unwrap();
        assert!((pct - (12.5 - 5.0) / 5.0).abs() < 1e-12);
    }

    #[test]
    fn year_over_year_is_missing_without_twelve_periods() {
        let mut rows = Vec::new();
        for i in 0..14_i64 {
            let (year, month) = (2020 + i / 12, i % 12 + 1);
            rows.push(row(year, month, 1, 10.0 * (i + 1) as f64, 1.0, 5.0, 1.0));
        }
        let out = price_trends(&rows, &index()).unwrap();
        assert_eq!(out.len(), 14);

        for p in &out[..12] {
            assert_eq!(p.prev_year_imports, None);
            assert_eq!(p.pct_change_imports_year_over_year, None);
            assert_eq!(p.rank_imports_change_year_over_year, None);
        }
        let p = &out[12];
        assert_eq!(p.prev_year_imports, Some(out[0].moving_price_imports));
        let base = out[0].moving_price_imports;
        let expected = (p.moving_price_imports - base) / base;
        assert!((p.pct_change_imports_year_over_year.unwrap() - expected).abs() < 1e-12);
        assert_eq!(p.rank_imports_change_year_over_year, Some(0));
    }

    #[test]
    fn unknown_commodity_is_an_integrity_error() {
        let err = price_trends(&[row(2020, 1, 99, 1.0, 1.0, 1.0, 1.0)], &index()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn non_monthly_view_is_rejected() {
        let mut r = row(2020, 1, 1, 1.0, 1.0, 1.0, 1.0);
        r.columns = key_columns(Period::Yearly, Level::Hts);
        r.key = vec![Some(2020), Some(1)];
        let err = price_trends(&[r], &index()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn duplicate_band_keys_fail_the_join() {
        let b = Bucket {
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            year: 2020,
            month: 1,
            hs4: "0101".to_string(),
            imports: 1.0,
            exports: 1.0,
            imports_qty: 1.0,
            exports_qty: 1.0,
            price_imports: 1.0,
            price_exports: 1.0,
        };
        let banded = band(std::slice::from_ref(&b));
        let err = join_one_to_one(vec![b.clone(), b], &banded).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }
}
