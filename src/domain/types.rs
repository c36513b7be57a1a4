//! Shared domain types.
//!
//! Records are plain owned structs so each pipeline stage can take a slice of
//! the previous stage's output and return a fresh `Vec` without mutating it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which upstream feed a file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Planning-board extract with the full classification set
    /// (country, HTS, SITC, NAICS, district, units).
    Jp,
    /// HTS10 import/export files keyed by country name; no NAICS/SITC/district.
    Org,
}

impl SourceKind {
    /// Fact table written for this source.
    pub fn fact_table(self) -> &'static str {
        match self {
            SourceKind::Jp => "jptradedata",
            SourceKind::Org => "inttradedata",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::Jp => "JP (agency extract)",
            SourceKind::Org => "ORG (HTS10 files)",
        }
    }
}

/// Trade direction, persisted as `trade_id` 1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TradeDirection {
    Import,
    Export,
}

impl TradeDirection {
    /// `"i"` is an import; every other flag is treated as an export.
    pub fn from_flag(flag: &str) -> Self {
        if flag.trim().eq_ignore_ascii_case("i") {
            TradeDirection::Import
        } else {
            TradeDirection::Export
        }
    }

    pub fn code(self) -> i64 {
        match self {
            TradeDirection::Import => 1,
            TradeDirection::Export => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TradeDirection::Import),
            2 => Some(TradeDirection::Export),
            _ => None,
        }
    }
}

/// Time granularity of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Yearly,
    Fiscal,
    #[value(name = "qrt")]
    #[serde(rename = "qrt")]
    Quarterly,
    Monthly,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Yearly => "yearly",
            Period::Fiscal => "fiscal",
            Period::Quarterly => "qrt",
            Period::Monthly => "monthly",
        }
    }
}

/// Non-temporal breakdown axis of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Total,
    Hts,
    Naics,
    Country,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Total => "total",
            Level::Hts => "hts",
            Level::Naics => "naics",
            Level::Country => "country",
        }
    }
}

/// Date filter applied before aggregation.
///
/// Textual form: empty (no filter), `YYYY-MM-DD` (exact month start) or
/// `YYYY-MM-DD+YYYY-MM-DD` (inclusive range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    All,
    On(NaiveDate),
    Between(NaiveDate, NaiveDate),
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            DateRange::All => true,
            DateRange::On(d) => date == d,
            DateRange::Between(start, end) => date >= start && date <= end,
        }
    }
}

impl FromStr for DateRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(DateRange::All);
        }
        let parts: Vec<&str> = s.split('+').collect();
        match parts.as_slice() {
            [single] => Ok(DateRange::On(parse_range_date(single)?)),
            [start, end] => {
                Ok(DateRange::Between(parse_range_date(start)?, parse_range_date(end)?))
            }
            _ => Err(AppError::config(
                "Invalid time format. Use \"date\" or \"start_date+end_date\"",
            )),
        }
    }
}

fn parse_range_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::config(format!(
            "Invalid date '{s}' in time filter. \
             Use \"date\" or \"start_date+end_date\" with YYYY-MM-DD dates."
        ))
    })
}

/// One raw transaction line, after header normalization and before keying.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFactRecord {
    pub year: i32,
    pub month: u32,
    pub direction: Option<TradeDirection>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    /// Zero-padded to 10 characters.
    pub commodity_code: Option<String>,
    pub commodity_short_desc: Option<String>,
    pub commodity_long_desc: Option<String>,
    pub sitc_code: Option<String>,
    pub sitc_short_desc: Option<String>,
    pub sitc_long_desc: Option<String>,
    pub naics_code: Option<String>,
    pub naics_desc: Option<String>,
    pub district_code: Option<String>,
    pub district_desc: Option<String>,
    pub value: f64,
    pub qty_1: Option<f64>,
    pub unit_1: Option<String>,
    pub qty_2: Option<f64>,
    pub unit_2: Option<String>,
    pub end_use_i: Option<i64>,
    pub end_use_e: Option<i64>,
}

impl RawFactRecord {
    /// First day of the reporting month.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryEntry {
    pub id: i64,
    pub cty_code: String,
    pub country_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtsEntry {
    pub id: i64,
    pub hts_code: String,
    pub hts_short_desc: Option<String>,
    pub hts_long_desc: Option<String>,
    /// 4-digit prefix appears in the agricultural reference set.
    pub agri_prod: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitcEntry {
    pub id: i64,
    pub sitc_code: String,
    pub sitc_short_desc: Option<String>,
    pub sitc_long_desc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaicsEntry {
    pub id: i64,
    pub naics_code: String,
    pub naics_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictEntry {
    pub id: i64,
    pub district_code: String,
    pub district_desc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub id: i64,
    pub unit_code: String,
}

/// All reference tables produced by one ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimensions {
    pub country: Vec<CountryEntry>,
    pub hts: Vec<HtsEntry>,
    pub sitc: Vec<SitcEntry>,
    pub naics: Vec<NaicsEntry>,
    pub district: Vec<DistrictEntry>,
    pub unit: Vec<UnitEntry>,
}

/// A raw record with natural keys replaced by surrogate keys.
///
/// `None` ids mean the natural key had no dimension match.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedFact {
    pub date: NaiveDate,
    pub direction: TradeDirection,
    pub country_id: Option<i64>,
    pub sitc_id: Option<i64>,
    pub hts_id: Option<i64>,
    pub naics_id: Option<i64>,
    pub district_id: Option<i64>,
    pub unit1_id: Option<i64>,
    pub unit2_id: Option<i64>,
    pub value: f64,
    pub end_use_i: Option<i64>,
    pub end_use_e: Option<i64>,
    pub qty_1: Option<f64>,
    pub qty_2: Option<f64>,
}

/// A persisted fact with the natural attributes needed for filtering and
/// unit conversion re-attached from the dimension tables.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratedFact {
    pub fact: EnrichedFact,
    pub hts_code: Option<String>,
    pub agri_prod: Option<bool>,
    pub naics_code: Option<String>,
    pub country_name: Option<String>,
    pub unit_1: Option<String>,
    pub unit_2: Option<String>,
}

/// Which grouped-sum view to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    pub period: Period,
    pub level: Level,
    pub date_range: DateRange,
    pub agriculture_only: bool,
    /// Prefix match on the level's natural attribute; empty matches everything.
    pub level_filter: String,
    /// Group by classification category (declared, not implemented).
    pub group: bool,
}

impl AggregationRequest {
    pub fn new(period: Period, level: Level) -> Self {
        Self {
            period,
            level,
            date_range: DateRange::All,
            agriculture_only: false,
            level_filter: String::new(),
            group: false,
        }
    }
}

/// A group-by column of an aggregation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyColumn {
    Year,
    FiscalYear,
    Quarter,
    Month,
    HtsId,
    NaicsId,
    CountryId,
}

impl KeyColumn {
    pub fn name(self) -> &'static str {
        match self {
            KeyColumn::Year => "year",
            KeyColumn::FiscalYear => "fiscal_year",
            KeyColumn::Quarter => "qrt",
            KeyColumn::Month => "month",
            KeyColumn::HtsId => "hts_id",
            KeyColumn::NaicsId => "naics_id",
            KeyColumn::CountryId => "country_id",
        }
    }
}

impl fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One output row of the aggregation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub columns: &'static [KeyColumn],
    /// Values aligned with `columns`.
    pub key: Vec<Option<i64>>,
    pub imports: f64,
    pub exports: f64,
    pub imports_qty: f64,
    pub exports_qty: f64,
    pub net_value: f64,
    pub net_qty: f64,
}

impl AggregatedRow {
    /// Value of one key column; `None` if the column is not part of this view
    /// or the key is null.
    pub fn get(&self, column: KeyColumn) -> Option<i64> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .and_then(|idx| self.key.get(idx).copied().flatten())
    }
}

/// One row of the price/trend output, keyed by (date, hs4).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub hs4: String,
    pub imports: f64,
    pub exports: f64,
    pub imports_qty: f64,
    pub exports_qty: f64,
    pub price_imports: f64,
    pub price_exports: f64,
    pub moving_price_imports: f64,
    pub moving_price_exports: f64,
    pub moving_price_imports_std: f64,
    pub moving_price_exports_std: f64,
    pub rank_imports: i64,
    pub rank_exports: i64,
    pub upper_band_imports: f64,
    pub lower_band_imports: f64,
    pub upper_band_exports: f64,
    pub lower_band_exports: f64,
    pub pct_change_imports: Option<f64>,
    pub pct_change_exports: Option<f64>,
    pub prev_year_imports: Option<f64>,
    pub prev_year_exports: Option<f64>,
    pub prev_year_rank_imports: Option<i64>,
    pub prev_year_rank_exports: Option<i64>,
    pub pct_change_imports_year_over_year: Option<f64>,
    pub pct_change_exports_year_over_year: Option<f64>,
    pub rank_imports_change_year_over_year: Option<i64>,
    pub rank_exports_change_year_over_year: Option<i64>,
}

/// Classification a Census state-level series is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CensusKind {
    Hts,
    Naics,
}

/// Direction of a Census series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CensusFlow {
    Imports,
    Exports,
}

/// One monthly Census observation for a (country, commodity) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CensusRecord {
    pub date: NaiveDate,
    pub value: i64,
    pub comm_level: String,
    /// HTS commodity or NAICS code, depending on the series.
    pub code: String,
    pub country_name: String,
    pub country_code: String,
}

/// Runtime configuration shared by every command.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// SQLite database file backing the store.
    pub db_path: PathBuf,
    /// JSON object keyed by 4-digit agricultural HTS prefixes.
    pub agr_file: Option<PathBuf>,
    /// Re-append facts even when the fact table already exists.
    pub update: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/data.sqlite"),
            agr_file: None,
            update: false,
        }
    }
}
