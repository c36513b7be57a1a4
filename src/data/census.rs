//! US Census international-trade API (state-level monthly series).

use std::collections::HashMap;

use chrono::NaiveDate;
use reqwest::blocking::Client;

use crate::domain::{CensusFlow, CensusKind, CensusRecord};
use crate::error::AppError;

const BASE_URL: &str = "https://api.census.gov/data/timeseries/";

/// Endpoint path and requested columns for one (kind, flow) series.
struct SeriesSpec {
    path: &'static str,
    value_col: &'static str,
    code_col: &'static str,
}

fn series_spec(kind: CensusKind, flow: CensusFlow) -> SeriesSpec {
    match (kind, flow) {
        (CensusKind::Hts, CensusFlow::Imports) => SeriesSpec {
            path: "intltrade/imports/statehs",
            value_col: "GEN_VAL_MO",
            code_col: "I_COMMODITY",
        },
        (CensusKind::Hts, CensusFlow::Exports) => SeriesSpec {
            path: "intltrade/exports/statehs",
            value_col: "ALL_VAL_MO",
            code_col: "E_COMMODITY",
        },
        (CensusKind::Naics, CensusFlow::Imports) => SeriesSpec {
            path: "intltrade/imports/statenaics",
            value_col: "GEN_VAL_MO",
            code_col: "NAICS",
        },
        (CensusKind::Naics, CensusFlow::Exports) => SeriesSpec {
            path: "intltrade/exports/statenaics",
            value_col: "ALL_VAL_MO",
            code_col: "NAICS",
        },
    }
}

impl SeriesSpec {
    fn get_param(&self) -> String {
        format!("CTY_CODE,CTY_NAME,{},COMM_LVL,{}", self.value_col, self.code_col)
    }
}

pub struct CensusClient {
    client: Client,
    api_key: String,
}

impl CensusClient {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("CENSUS_API_KEY")
            .map_err(|_| AppError::config("Missing CENSUS_API_KEY in environment (.env)."))?;
        Ok(Self {
            client: Client::new(),
            api_key,
        })
    }

    /// Pull every year in `start..=end`, one request per year.
    pub fn fetch_range(
        &self,
        kind: CensusKind,
        flow: CensusFlow,
        state: &str,
        start: i32,
        end: i32,
    ) -> Result<Vec<CensusRecord>, AppError> {
        if start > end {
            return Err(AppError::config(format!("Start year {start} is after end year {end}.")));
        }
        let mut out = Vec::new();
        for year in start..=end {
            let records = self.fetch_year(kind, flow, state, year)?;
            log::info!("census {:?}/{:?} {year}: {} records", kind, flow, records.len());
            out.extend(records);
        }
        Ok(out)
    }

    fn fetch_year(
        &self,
        kind: CensusKind,
        flow: CensusFlow,
        state: &str,
        year: i32,
    ) -> Result<Vec<CensusRecord>, AppError> {
        let series = series_spec(kind, flow);
        let url = format!("{BASE_URL}{}", series.path);

        let get = series.get_param();
        let time = year.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("get", get.as_str()),
                ("STATE", state),
                ("key", self.api_key.as_str()),
                ("time", time.as_str()),
            ])
            .send()
            .map_err(|e| AppError::remote(format!("Census request failed: {e}")))?;

        // the API answers 204 when a year has no data
        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(AppError::remote(format!(
                "Census request failed with status {}.",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .map_err(|e| AppError::remote(format!("Failed to parse Census response: {e}")))?;
        parse_census_response(&body, kind, flow)
    }
}

/// Decode the API's array-of-arrays body; the first row is the header.
pub fn parse_census_response(
    body: &serde_json::Value,
    kind: CensusKind,
    flow: CensusFlow,
) -> Result<Vec<CensusRecord>, AppError> {
    let series = series_spec(kind, flow);
    let rows = body
        .as_array()
        .ok_or_else(|| AppError::remote("Census response is not a JSON array."))?;
    let Some((header, data)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let header: HashMap<&str, usize> = header
        .as_array()
        .ok_or_else(|| AppError::remote("Census header row is not an array."))?
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.as_str().map(|name| (name, i)))
        .collect();
    let col = |name: &str| {
        header
            .get(name)
            .copied()
            .ok_or_else(|| AppError::remote(format!("Census response is missing column {name}.")))
    };
    let (i_cty, i_name, i_val, i_lvl, i_code, i_time) = (
        col("CTY_CODE")?,
        col("CTY_NAME")?,
        col(series.value_col)?,
        col("COMM_LVL")?,
        col(series.code_col)?,
        col("time")?,
    );

    let mut out = Vec::with_capacity(data.len());
    for (n, row) in data.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or_else(|| AppError::remote(format!("Census row {} is not an array.", n + 1)))?;
        let cell = |i: usize| cells.get(i).and_then(cell_text).unwrap_or_default();

        let time = cell(i_time);
        let date = NaiveDate::parse_from_str(&format!("{time}-01"), "%Y-%m-%d")
            .map_err(|e| AppError::remote(format!("Invalid Census period '{time}': {e}")))?;
        let raw_value = cell(i_val);
        let value = raw_value
            .parse::<i64>()
            .map_err(|e| AppError::remote(format!("Invalid Census value '{raw_value}': {e}")))?;

        out.push(CensusRecord {
            date,
            value,
            comm_level: cell(i_lvl),
            code: cell(i_code),
            country_name: cell(i_name),
            country_code: cell(i_cty),
        });
    }
    Ok(out)
}

fn cell_text(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_header_row_and_records() {
        let body = json!([
            ["CTY_CODE", "CTY_NAME", "GEN_VAL_MO", "COMM_LVL", "I_COMMODITY", "time", "STATE"],
            ["5700", "CHINA", "12345", "HS2", "85", "2023-04", "PR"],
            ["1220", "CANADA", "0", "HS4", "0101", "2023-05", "PR"]
        ]);
        let recs = parse_census_response(&body, CensusKind::Hts, CensusFlow::Imports).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].date, NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
        assert_eq!(recs[0].value, 12345);
        assert_eq!(recs[0].code, "85");
        assert_eq!(recs[0].country_name, "CHINA");
        assert_eq!(recs[1].comm_level, "HS4");
        assert_eq!(recs[1].country_code, "1220");
    }

    #[test]
    fn export_naics_uses_its_own_columns() {
        let body = json!([
            ["CTY_CODE", "CTY_NAME", "ALL_VAL_MO", "COMM_LVL", "NAICS", "time"],
            ["-", "TOTAL FOR ALL COUNTRIES", "99", "NA3", "325", "2022-12"]
        ]);
        let recs = parse_census_response(&body, CensusKind::Naics, CensusFlow::Exports).unwrap();
        assert_eq!(recs[0].code, "325");
        assert_eq!(recs[0].value, 99);

        let err = parse_census_response(&body, CensusKind::Hts, CensusFlow::Exports).unwrap_err();
        assert!(err.message().contains("E_COMMODITY"));
    }

    #[test]
    fn empty_body_yields_no_records() {
        let recs = parse_census_response(&json!([]), CensusKind::Hts, CensusFlow::Imports).unwrap();
        assert!(recs.is_empty());
        let not_array = json!({"error": "x"});
        assert!(parse_census_response(&not_array, CensusKind::Hts, CensusFlow::Imports).is_err());
    }
}
