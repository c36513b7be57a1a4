//! CSV ingest and normalization for both source feeds.
//!
//! This module is responsible for turning a source-specific trade CSV into a
//! list of `RawFactRecord`s with a single, shared shape:
//!
//! - header names are trimmed, BOM-stripped and lower-cased
//! - commodity codes are apostrophe-free and zero-padded to 10 characters
//! - unit codes are lower-cased
//! - trade direction flags are decoded (`"i"` → import, otherwise export)
//!
//! Bad rows are skipped and reported, never fatal. Missing required columns are.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{RawFactRecord, SourceKind, TradeDirection};
use crate::error::AppError;

/// SITC code assigned to rows described as civilian aircraft.
pub const SITC_CIVILIAN: &str = "9998";
/// SITC code assigned to rows whose description is a bare dash.
pub const SITC_UNSPECIFIED: &str = "9999";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: normalized records + row errors + counters.
#[derive(Debug, Clone)]
pub struct IngestedFeed {
    pub source: SourceKind,
    pub records: Vec<RawFactRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows dropped on purpose (e.g. jp rows with no commodity code).
    pub rows_dropped: usize,
}

/// Column names per source.
struct FeedColumns {
    direction: &'static str,
    commodity: &'static str,
    value: &'static str,
}

impl FeedColumns {
    fn for_source(source: SourceKind) -> Self {
        match source {
            SourceKind::Jp => FeedColumns {
                direction: "trade",
                commodity: "commodity_code",
                value: "data",
            },
            SourceKind::Org => FeedColumns {
                direction: "import_export",
                commodity: "hts",
                value: "value",
            },
        }
    }
}

/// Open and normalize a source file.
pub fn load_feed(path: &Path, source: SourceKind) -> Result<IngestedFeed, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let feed = read_feed(file, source)?;
    log::info!(
        "read {} rows from '{}' ({} used, {} dropped, {} errors)",
        feed.rows_read,
        path.display(),
        feed.records.len(),
        feed.rows_dropped,
        feed.row_errors.len()
    );
    Ok(feed)
}

/// Normalize CSV text from any reader.
pub fn read_feed<R: Read>(input: R, source: SourceKind) -> Result<IngestedFeed, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let columns = FeedColumns::for_source(source);
    ensure_required_columns_exist(&header_map, &columns)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_dropped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = match source {
            SourceKind::Jp => parse_jp_row(&record, &header_map, &columns),
            SourceKind::Org => parse_org_row(&record, &header_map, &columns),
        };

        match parsed {
            Ok(Some(row)) => records.push(row),
            Ok(None) => rows_dropped += 1,
            Err(message) => {
                log::debug!("skipping line {line}: {message}");
                row_errors.push(RowError { line, message });
            }
        }
    }

    if !row_errors.is_empty() {
        log::warn!("{} rows skipped during ingest", row_errors.len());
    }

    Ok(IngestedFeed {
        source,
        records,
        row_errors,
        rows_read,
        rows_dropped,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(
    header_map: &HashMap<String, usize>,
    columns: &FeedColumns,
) -> Result<(), AppError> {
    for name in ["year", "month", columns.direction, columns.commodity, columns.value] {
        if !header_map.contains_key(name) {
            return Err(AppError::config(format!("Missing required column: `{name}`")));
        }
    }
    Ok(())
}

/// Fields common to both feeds.
fn parse_base(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    columns: &FeedColumns,
) -> Result<RawFactRecord, String> {
    let year = parse_int(get_required(record, header_map, "year")?)
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| "Invalid `year` value.".to_string())?;
    let month = parse_int(get_required(record, header_map, "month")?)
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(|| "Invalid `month` value.".to_string())?;

    let row = RawFactRecord {
        year,
        month,
        // a blank flag counts as an export, like any flag other than "i"
        direction: Some(TradeDirection::from_flag(
            get_optional(record, header_map, columns.direction).unwrap_or_default(),
        )),
        commodity_code: get_optional(record, header_map, columns.commodity)
            .and_then(normalize_commodity_code),
        value: parse_f64(get_required(record, header_map, columns.value)?)
            .ok_or_else(|| format!("Invalid `{}` value.", columns.value))?,
        qty_1: get_optional(record, header_map, "qty_1").and_then(parse_f64),
        unit_1: get_optional(record, header_map, "unit_1").map(normalize_unit_code),
        qty_2: get_optional(record, header_map, "qty_2").and_then(parse_f64),
        unit_2: get_optional(record, header_map, "unit_2").map(normalize_unit_code),
        ..RawFactRecord::default()
    };

    if row.date().is_none() {
        return Err(format!("Invalid report date {year}-{month}."));
    }
    Ok(row)
}

fn parse_jp_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    columns: &FeedColumns,
) -> Result<Option<RawFactRecord>, String> {
    let base = parse_base(record, header_map, columns)?;
    if base.commodity_code.is_none() {
        return Ok(None);
    }

    let text = |name: &str| get_optional(record, header_map, name).map(str::to_string);
    let sitc_short_desc = text("sitc_short_desc");

    Ok(Some(RawFactRecord {
        country_code: text("cty_code"),
        country_name: text("country"),
        commodity_short_desc: text("commodity_short_name"),
        commodity_long_desc: text("commodity_description"),
        sitc_code: override_sitc(text("sitc"), sitc_short_desc.as_deref()),
        sitc_short_desc,
        sitc_long_desc: text("sitc_long_desc"),
        naics_code: text("naics"),
        naics_desc: text("naics_description"),
        district_code: text("district_posh"),
        district_desc: text("districtposhdesc"),
        end_use_i: get_optional(record, header_map, "end_use_i").and_then(parse_int),
        end_use_e: get_optional(record, header_map, "end_use_e").and_then(parse_int),
        ..base
    }))
}

fn parse_org_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    columns: &FeedColumns,
) -> Result<Option<RawFactRecord>, String> {
    let base = parse_base(record, header_map, columns)?;
    Ok(Some(RawFactRecord {
        country_name: get_optional(record, header_map, "country").map(str::to_string),
        ..base
    }))
}

/// Civilian-aircraft and dash-described rows get reserved SITC codes.
fn override_sitc(sitc: Option<String>, short_desc: Option<&str>) -> Option<String> {
    match short_desc {
        Some(d) if d.starts_with("Civilian") => Some(SITC_CIVILIAN.to_string()),
        Some(d) if d.starts_with('-') => Some(SITC_UNSPECIFIED.to_string()),
        _ => sitc,
    }
}

/// Strip apostrophes (spreadsheet text markers) and zero-pad to 10 characters.
pub fn normalize_commodity_code(raw: &str) -> Option<String> {
    let code: String = raw.chars().filter(|c| *c != '\'').collect();
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    Some(format!("{code:0>10}"))
}

fn normalize_unit_code(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Load the agricultural reference file as a set of 4-digit prefixes.
///
/// The file is a JSON object keyed by prefix; only keys are used. A JSON array
/// of codes is accepted as well.
pub fn load_agri_codes(path: &Path) -> Result<HashSet<String>, AppError> {
    let file = File::open(path)
        .map_err(|e| {
            AppError::io(format!("Failed to open agricultural codes '{}': {e}", path.display()))
        })?;
    let json: serde_json::Value = serde_json::from_reader(file)
        .map_err(|e| AppError::config(format!("Invalid agricultural codes JSON: {e}")))?;
    parse_agri_codes(&json)
}

pub fn parse_agri_codes(json: &serde_json::Value) -> Result<HashSet<String>, AppError> {
    let pad = |s: &str| format!("{:0>4}", s.trim());
    match json {
        serde_json::Value::Object(map) => Ok(map.keys().map(|k| pad(k)).collect()),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => Ok(pad(s)),
                serde_json::Value::Number(n) => Ok(pad(&n.to_string())),
                other => Err(AppError::config(format!("Invalid agricultural code entry: {other}"))),
            })
            .collect(),
        _ => Err(AppError::config(
            "Agricultural codes JSON must be an object keyed by 4-digit prefix.",
        )),
    }
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Integers sometimes arrive as `"2020.0"` from spreadsheet exports.
fn parse_int(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 { Some(f as i64) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JP_CSV: &str = concat!(
        "\u{feff}Year,Month,Trade,CTY_CODE,Country,Commodity_Code,Commodity_Short_Name,",
        "Commodity_Description,SITC,SITC_Short_Desc,SITC_Long_Desc,NAICS,NAICS_Description,",
        "District_Posh,DistrictPoshDesc,Unit_1,Unit_2,Data,End_Use_I,End_Use_E,Qty_1,Qty_2\n",
        "2020,1,i,1220,Canada,101,Horses,Live horses,1,Live animals,Live animals long,",
        "1121,Cattle,49,San Juan,KG,,100,10000,,10,\n",
        "2020,1,e,1220,Canada,101,Horses,Live horses,1,Live animals,Live animals long,",
        "1121,Cattle,49,San Juan,kg,,50,,,5,\n",
        "2020,2,i,5700,China,,,,,,,,,,,kg,,5,,,1,\n",
        "2020,13,i,5700,China,8802,Planes,Planes,792,Civilian aircraft,x,",
        "3364,Aero,49,San Juan,no,,1,,,1,\n",
        "2020,3,e,5700,China,8802,Planes,Planes,792,Civilian aircraft,x,",
        "3364,Aero,49,San Juan,no,t,1,,,1,2\n",
    );

    #[test]
    fn jp_feed_normalizes_headers_codes_and_flags() {
        let feed = read_feed(JP_CSV.as_bytes(), SourceKind::Jp).unwrap();
        assert_eq!(feed.rows_read, 5);
        assert_eq!(feed.records.len(), 3);
        assert_eq!(feed.rows_dropped, 1);
        assert_eq!(feed.row_errors.len(), 1);
        assert_eq!(feed.row_errors[0].line, 5);

        let first = &feed.records[0];
        assert_eq!(first.direction, Some(TradeDirection::Import));
        assert_eq!(first.commodity_code.as_deref(), Some("0000000101"));
        assert_eq!(first.unit_1.as_deref(), Some("kg"));
        assert_eq!(first.unit_2, None);
        assert_eq!(first.country_code.as_deref(), Some("1220"));
        assert_eq!(first.end_use_i, Some(10000));
        assert_eq!(first.value, 100.0);

        assert_eq!(feed.records[1].direction, Some(TradeDirection::Export));
        assert_eq!(feed.records[2].sitc_code.as_deref(), Some(SITC_CIVILIAN));
        assert_eq!(feed.records[2].qty_2, Some(2.0));
    }

    #[test]
    fn org_feed_uses_its_own_column_names() {
        let csv = "year,month,hts,import_export,country,value,qty_1,qty_2,unit_1,unit_2\n\
                   2021,6,'0101000000,i,Canada,12.5,3,,KG,\n\
                   2021,6,,e,Canada,7,1,,kg,\n";
        let feed = read_feed(csv.as_bytes(), SourceKind::Org).unwrap();
        assert_eq!(feed.records.len(), 2);
        let r = &feed.records[0];
        assert_eq!(r.commodity_code.as_deref(), Some("0101000000"));
        assert_eq!(r.country_name.as_deref(), Some("Canada"));
        assert_eq!(r.country_code, None);
        assert_eq!(r.naics_code, None);
        assert_eq!(feed.records[1].commodity_code, None);
    }

    #[test]
    fn blank_direction_flag_is_an_export() {
        let csv = "year,month,hts,import_export,country,value\n\
                   2021,6,0101000000,,Canada,4\n\
                   2021,6,0101000000,I,Canada,3\n";
        let feed = read_feed(csv.as_bytes(), SourceKind::Org).unwrap();
        assert!(feed.row_errors.is_empty());
        assert_eq!(feed.records[0].direction, Some(TradeDirection::Export));
        assert_eq!(feed.records[1].direction, Some(TradeDirection::Import));
    }

    #[test]
    fn missing_required_column_is_a_config_error() {
        let csv = "year,month,trade,data\n2020,1,i,1\n";
        let err = read_feed(csv.as_bytes(), SourceKind::Jp).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        assert!(err.message().contains("commodity_code"));
    }

    #[test]
    fn sitc_override_rules() {
        assert_eq!(override_sitc(Some("1".into()), Some("-")).as_deref(), Some(SITC_UNSPECIFIED));
        let civilian = override_sitc(Some("1".into()), Some("Civilian goods"));
        assert_eq!(civilian.as_deref(), Some(SITC_CIVILIAN));
        assert_eq!(override_sitc(Some("1".into()), Some("Food")).as_deref(), Some("1"));
    }

    #[test]
    fn agri_codes_use_object_keys_padded_to_four() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"101": "horses", "0201": "beef"}"#).unwrap();
        let set = parse_agri_codes(&json).unwrap();
        assert!(set.contains("0101"));
        assert!(set.contains("0201"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn integer_columns_accept_float_text() {
        assert_eq!(parse_int("2020.0"), Some(2020));
        assert_eq!(parse_int("2020.5"), None);
    }
}
