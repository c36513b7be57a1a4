//! Export aggregated views, price trends and Census pulls to CSV/JSON.
//!
//! Each CSV writer has a `Write`-generic core so it can be exercised against a
//! buffer; the `export_*` wrappers open the destination file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{AggregatedRow, CensusRecord, PriceRow};
use crate::error::AppError;

const MEASURE_COLUMNS: [&str; 6] =
    ["imports", "exports", "imports_qty", "exports_qty", "net_value", "net_qty"];

fn create(path: &Path) -> Result<File, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::io(format!("Failed to create directory '{}': {e}", parent.display()))
        })?;
    }
    File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))
}

fn csv_err(e: csv::Error) -> AppError {
    AppError::io(format!("Failed to write CSV: {e}"))
}

/// Key columns first (view order), then the six measures.
pub fn write_aggregated_csv<W: Write>(out: W, rows: &[AggregatedRow]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(out);
    let Some(first) = rows.first() else {
        w.flush().map_err(|e| AppError::io(format!("Failed to flush CSV: {e}")))?;
        return Ok(());
    };

    let mut header: Vec<&str> = first.columns.iter().map(|c| c.name()).collect();
    header.extend(MEASURE_COLUMNS);
    w.write_record(&header).map_err(csv_err)?;

    for r in rows {
        let mut record: Vec<String> = r
            .key
            .iter()
            .map(|k| k.map(|v| v.to_string()).unwrap_or_default())
            .collect();
        for m in [r.imports, r.exports, r.imports_qty, r.exports_qty, r.net_value, r.net_qty] {
            record.push(m.to_string());
        }
        w.write_record(&record).map_err(csv_err)?;
    }
    w.flush().map_err(|e| AppError::io(format!("Failed to flush CSV: {e}")))
}

pub fn export_aggregated_csv(path: &Path, rows: &[AggregatedRow]) -> Result<(), AppError> {
    write_aggregated_csv(create(path)?, rows)?;
    log::info!("wrote {} aggregated rows to {}", rows.len(), path.display());
    Ok(())
}

/// Serialize any row type with a header derived from its field names.
pub fn write_serialized_csv<W: Write, T: Serialize>(out: W, rows: &[T]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(out);
    for r in rows {
        w.serialize(r).map_err(csv_err)?;
    }
    w.flush().map_err(|e| AppError::io(format!("Failed to flush CSV: {e}")))
}

pub fn export_price_csv(path: &Path, rows: &[PriceRow]) -> Result<(), AppError> {
    write_serialized_csv(create(path)?, rows)?;
    log::info!("wrote {} price rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn export_census_csv(path: &Path, rows: &[CensusRecord]) -> Result<(), AppError> {
    write_serialized_csv(create(path)?, rows)?;
    log::info!("wrote {} census records to {}", rows.len(), path.display());
    Ok(())
}

/// One JSON object per row; null keys stay `null`.
pub fn aggregated_to_json(rows: &[AggregatedRow]) -> Value {
    let items = rows
        .iter()
        .map(|r| {
            let mut obj = Map::new();
            for (col, key) in r.columns.iter().zip(&r.key) {
                obj.insert(col.name().to_string(), key.map(Value::from).unwrap_or(Value::Null));
            }
            let measures =
                [r.imports, r.exports, r.imports_qty, r.exports_qty, r.net_value, r.net_qty];
            for (name, v) in MEASURE_COLUMNS.iter().zip(measures) {
                obj.insert((*name).to_string(), Value::from(v));
            }
            Value::Object(obj)
        })
        .collect();
    Value::Array(items)
}

pub fn export_aggregated_json(path: &Path, rows: &[AggregatedRow]) -> Result<(), AppError> {
    let file = create(path)?;
    serde_json::to_writer_pretty(file, &aggregated_to_json(rows))
        .map_err(|e| AppError::io(format!("Failed to write JSON '{}': {e}", path.display())))?;
    log::info!("wrote {} aggregated rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::key_columns;
    use crate::domain::{Level, Period};
    use chrono::NaiveDate;

    fn rows() -> Vec<AggregatedRow> {
        let columns = key_columns(Period::Yearly, Level::Country);
        vec![
            AggregatedRow {
                columns,
                key: vec![Some(2020), None],
                imports: 1.5,
                exports: 0.0,
                imports_qty: 2.0,
                exports_qty: 0.0,
                net_value: -1.5,
                net_qty: -2.0,
            },
            AggregatedRow {
                columns,
                key: vec![Some(2020), Some(3)],
                imports: 0.0,
                exports: 4.0,
                imports_qty: 0.0,
                exports_qty: 1.0,
                net_value: 4.0,
                net_qty: 1.0,
            },
        ]
    }

    #[test]
    fn aggregated_csv_has_key_then_measure_columns() {
        let mut buf = Vec::new();
        write_aggregated_csv(&mut buf, &rows()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "year,country_id,imports,exports,imports_qty,exports_qty,net_value,net_qty"
        );
        assert_eq!(lines[1], "2020,,1.5,0,2,0,-1.5,-2");
        assert_eq!(lines[2], "2020,3,0,4,0,1,4,1");
    }

    #[test]
    fn aggregated_json_keeps_null_keys() {
        let json = aggregated_to_json(&rows());
        assert_eq!(json[0]["country_id"], Value::Null);
        assert_eq!(json[1]["country_id"], Value::from(3));
        assert_eq!(json[1]["exports"], Value::from(4.0));
    }

    #[test]
    fn census_csv_uses_field_names() {
        let recs = vec![CensusRecord {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            value: 10,
            comm_level: "HS2".to_string(),
            code: "85".to_string(),
            country_name: "CHINA".to_string(),
            country_code: "5700".to_string(),
        }];
        let mut buf = Vec::new();
        write_serialized_csv(&mut buf, &recs).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "date,value,comm_level,code,country_name,country_code\n\
             2023-01-01,10,HS2,85,CHINA,5700\n"
        );
    }

    #[test]
    fn export_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/agg.json");
        export_aggregated_json(&path, &rows()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"net_qty\""));
    }
}
