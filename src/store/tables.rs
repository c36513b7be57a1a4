//! Table names and row mappings for every persisted entity.

use crate::domain::{
    CountryEntry, Dimensions, DistrictEntry, EnrichedFact, HtsEntry, NaicsEntry, SitcEntry,
    SourceKind, TradeDirection, UnitEntry,
};
use crate::error::AppError;
use crate::store::schema::{
    Column, ColumnType, TableRow, Value, opt_float, opt_int, opt_text, req_bool, req_date,
    req_float, req_int, req_text,
};
use crate::store::{TradeStore, create_and_insert_if_absent, read_rows};

pub const COUNTRY_TABLE: &str = "countrytable";
pub const HTS_TABLE: &str = "htstable";
pub const SITC_TABLE: &str = "sitctable";
pub const NAICS_TABLE: &str = "naicstable";
pub const DISTRICT_TABLE: &str = "districttable";
pub const UNIT_TABLE: &str = "unittable";

impl TableRow for CountryEntry {
    const SCHEMA: &'static [Column] = &[
        Column::required("id", ColumnType::Int),
        Column::required("cty_code", ColumnType::Text),
        Column::nullable("country_name", ColumnType::Text),
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.id),
            Value::Text(self.cty_code.clone()),
            self.country_name.clone().into(),
        ]
    }

    fn from_values(v: &[Value]) -> Result<Self, AppError> {
        Ok(Self {
            id: req_int(v, 0)?,
            cty_code: req_text(v, 1)?,
            country_name: opt_text(v, 2)?,
        })
    }
}

impl TableRow for HtsEntry {
    const SCHEMA: &'static [Column] = &[
        Column::required("id", ColumnType::Int),
        Column::required("hts_code", ColumnType::Text),
        Column::nullable("hts_short_desc", ColumnType::Text),
        Column::nullable("hts_long_desc", ColumnType::Text),
        Column::required("agri_prod", ColumnType::Bool),
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.id),
            Value::Text(self.hts_code.clone()),
            self.hts_short_desc.clone().into(),
            self.hts_long_desc.clone().into(),
            Value::Bool(self.agri_prod),
        ]
    }

    fn from_values(v: &[Value]) -> Result<Self, AppError> {
        Ok(Self {
            id: req_int(v, 0)?,
            hts_code: req_text(v, 1)?,
            hts_short_desc: opt_text(v, 2)?,
            hts_long_desc: opt_text(v, 3)?,
            agri_prod: req_bool(v, 4)?,
        })
    }
}

impl TableRow for SitcEntry {
    const SCHEMA: &'static [Column] = &[
        Column::required("id", ColumnType::Int),
        Column::required("sitc_code", ColumnType::Text),
        Column::nullable("sitc_short_desc", ColumnType::Text),
        Column::nullable("sitc_long_desc", ColumnType::Text),
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.id),
            Value::Text(self.sitc_code.clone()),
            self.sitc_short_desc.clone().into(),
            self.sitc_long_desc.clone().into(),
        ]
    }

    fn from_values(v: &[Value]) -> Result<Self, AppError> {
        Ok(Self {
            id: req_int(v, 0)?,
            sitc_code: req_text(v, 1)?,
            sitc_short_desc: opt_text(v, 2)?,
            sitc_long_desc: opt_text(v, 3)?,
        })
    }
}

impl TableRow for NaicsEntry {
    const SCHEMA: &'static [Column] = &[
        Column::required("id", ColumnType::Int),
        Column::required("naics_code", ColumnType::Text),
        Column::nullable("naics_description", ColumnType::Text),
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.id),
            Value::Text(self.naics_code.clone()),
            self.naics_description.clone().into(),
        ]
    }

    fn from_values(v: &[Value]) -> Result<Self, AppError> {
        Ok(Self {
            id: req_int(v, 0)?,
            naics_code: req_text(v, 1)?,
            naics_description: opt_text(v, 2)?,
        })
    }
}

impl TableRow for DistrictEntry {
    const SCHEMA: &'static [Column] = &[
        Column::required("id", ColumnType::Int),
        Column::required("district_code", ColumnType::Text),
        Column::nullable("district_desc", ColumnType::Text),
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.id),
            Value::Text(self.district_code.clone()),
            self.district_desc.clone().into(),
        ]
    }

    fn from_values(v: &[Value]) -> Result<Self, AppError> {
        Ok(Self {
            id: req_int(v, 0)?,
            district_code: req_text(v, 1)?,
            district_desc: opt_text(v, 2)?,
        })
    }
}

impl TableRow for UnitEntry {
    const SCHEMA: &'static [Column] = &[
        Column::required("id", ColumnType::Int),
        Column::required("unit_code", ColumnType::Text),
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Int(self.id), Value::Text(self.unit_code.clone())]
    }

    fn from_values(v: &[Value]) -> Result<Self, AppError> {
        Ok(Self {
            id: req_int(v, 0)?,
            unit_code: req_text(v, 1)?,
        })
    }
}

impl TableRow for EnrichedFact {
    const SCHEMA: &'static [Column] = &[
        Column::required("date", ColumnType::Date),
        Column::required("trade_id", ColumnType::Int),
        Column::nullable("country_id", ColumnType::Int),
        Column::nullable("sitc_id", ColumnType::Int),
        Column::nullable("hts_id", ColumnType::Int),
        Column::nullable("naics_id", ColumnType::Int),
        Column::nullable("district_id", ColumnType::Int),
        Column::nullable("unit1_id", ColumnType::Int),
        Column::nullable("unit2_id", ColumnType::Int),
        Column::required("data", ColumnType::Float),
        Column::nullable("end_use_i", ColumnType::Int),
        Column::nullable("end_use_e", ColumnType::Int),
        Column::nullable("qty_1", ColumnType::Float),
        Column::nullable("qty_2", ColumnType::Float),
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Int(self.direction.code()),
            self.country_id.into(),
            self.sitc_id.into(),
            self.hts_id.into(),
            self.naics_id.into(),
            self.district_id.into(),
            self.unit1_id.into(),
            self.unit2_id.into(),
            Value::Float(self.value),
            self.end_use_i.into(),
            self.end_use_e.into(),
            self.qty_1.into(),
            self.qty_2.into(),
        ]
    }

    fn from_values(v: &[Value]) -> Result<Self, AppError> {
        let trade_id = req_int(v, 1)?;
        let direction = TradeDirection::from_code(trade_id)
            .ok_or_else(|| {
                AppError::integrity(format!("Unknown trade_id {trade_id} in fact table"))
            })?;
        Ok(Self {
            date: req_date(v, 0)?,
            direction,
            country_id: opt_int(v, 2)?,
            sitc_id: opt_int(v, 3)?,
            hts_id: opt_int(v, 4)?,
            naics_id: opt_int(v, 5)?,
            district_id: opt_int(v, 6)?,
            unit1_id: opt_int(v, 7)?,
            unit2_id: opt_int(v, 8)?,
            value: req_float(v, 9)?,
            end_use_i: opt_int(v, 10)?,
            end_use_e: opt_int(v, 11)?,
            qty_1: opt_float(v, 12)?,
            qty_2: opt_float(v, 13)?,
        })
    }
}

/// Persist every dimension table that does not exist yet.
pub fn write_dimensions(store: &mut dyn TradeStore, dims: &Dimensions) -> Result<(), AppError> {
    create_and_insert_if_absent(store, COUNTRY_TABLE, &dims.country)?;
    create_and_insert_if_absent(store, SITC_TABLE, &dims.sitc)?;
    create_and_insert_if_absent(store, HTS_TABLE, &dims.hts)?;
    create_and_insert_if_absent(store, NAICS_TABLE, &dims.naics)?;
    create_and_insert_if_absent(store, DISTRICT_TABLE, &dims.district)?;
    create_and_insert_if_absent(store, UNIT_TABLE, &dims.unit)?;
    Ok(())
}

/// `true` when the reference tables needed to enrich facts are present.
pub fn has_dimensions(store: &dyn TradeStore) -> Result<bool, AppError> {
    for name in [COUNTRY_TABLE, HTS_TABLE, UNIT_TABLE] {
        if !store.table_exists(name)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Reload persisted dimension tables; missing tables read as empty.
pub fn load_dimensions(store: &dyn TradeStore) -> Result<Dimensions, AppError> {
    fn table<T: TableRow>(store: &dyn TradeStore, name: &str) -> Result<Vec<T>, AppError> {
        if store.table_exists(name)? {
            read_rows(store, name)
        } else {
            Ok(Vec::new())
        }
    }

    Ok(Dimensions {
        country: table(store, COUNTRY_TABLE)?,
        hts: table(store, HTS_TABLE)?,
        sitc: table(store, SITC_TABLE)?,
        naics: table(store, NAICS_TABLE)?,
        district: table(store, DISTRICT_TABLE)?,
        unit: table(store, UNIT_TABLE)?,
    })
}

/// Read the fact table of a source.
pub fn load_facts(
    store: &dyn TradeStore,
    source: SourceKind,
) -> Result<Vec<EnrichedFact>, AppError> {
    let name = source.fact_table();
    if !store.table_exists(name)? {
        return Err(AppError::config(format!(
            "No facts ingested for source '{}' (table '{name}' is missing). \
             Run `tflow ingest` first.",
            source.display_name()
        )));
    }
    read_rows(store, name)
}
