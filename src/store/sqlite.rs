//! SQLite-backed store (rusqlite).
//!
//! DDL is generated from the table schema. Inserts for one call run in a
//! single transaction, so a failed call leaves no partial rows behind.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};

use crate::error::AppError;
use crate::store::TradeStore;
use crate::store::schema::{Column, ColumnType, Value};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file, creating its parent directory.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::io(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(db_path)?;
        log::info!("opened SQLite store at {}", db_path.display());
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, AppError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }
}

impl TradeStore for SqliteStore {
    fn table_exists(&self, name: &str) -> Result<bool, AppError> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn create_table(&mut self, name: &str, schema: &[Column]) -> Result<(), AppError> {
        check_identifier(name)?;
        let columns = schema
            .iter()
            .map(|c| {
                check_identifier(c.name)?;
                let null = if c.nullable { "" } else { " NOT NULL" };
                Ok(format!("{} {}{}", c.name, sql_type(c.ty), null))
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        self.conn
            .execute(&format!("CREATE TABLE {name} ({})", columns.join(", ")), [])?;
        log::debug!("created table '{name}'");
        Ok(())
    }

    fn insert(&mut self, name: &str, rows: &[Vec<Value>]) -> Result<usize, AppError> {
        check_identifier(name)?;
        let Some(width) = rows.first().map(Vec::len) else {
            return Ok(0);
        };
        if rows.iter().any(|r| r.len() != width) {
            return Err(AppError::store(format!("Ragged rows inserted into '{name}'")));
        }

        let placeholders: Vec<String> = (1..=width).map(|i| format!("?{i}")).collect();
        let sql = format!("INSERT INTO {name} VALUES ({})", placeholders.join(", "));

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter().map(to_sql)))?;
            }
        }
        tx.commit()?;
        log::debug!("flushed {} rows to '{name}'", rows.len());
        Ok(rows.len())
    }

    fn read(&self, name: &str, schema: &[Column]) -> Result<Vec<Vec<Value>>, AppError> {
        check_identifier(name)?;
        let cols: Vec<&str> = schema.iter().map(|c| c.name).collect();
        let sql = format!("SELECT {} FROM {name} ORDER BY rowid", cols.join(", "));
        let mut stmt = self.conn.prepare(&sql)?;
        let width = schema.len();
        let raw = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(schema)
                    .map(|(v, c)| from_sql(v, c))
                    .collect::<Result<Vec<_>, AppError>>()
            })
            .collect()
    }
}

fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Int | ColumnType::Bool => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Text | ColumnType::Date => "TEXT",
    }
}

/// Table and column names are interpolated into SQL, so keep them plain.
fn check_identifier(name: &str) -> Result<(), AppError> {
    let ok = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(AppError::store(format!("Invalid table/column name '{name}'")))
    }
}

fn to_sql(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
    }
}

fn from_sql(v: SqlValue, column: &Column) -> Result<Value, AppError> {
    let bad = |v: &SqlValue| {
        AppError::store(format!("Column '{}': unexpected stored value {v:?}", column.name))
    };
    match (column.ty, v) {
        (_, SqlValue::Null) => Ok(Value::Null),
        (ColumnType::Int, SqlValue::Integer(i)) => Ok(Value::Int(i)),
        (ColumnType::Bool, SqlValue::Integer(i)) => Ok(Value::Bool(i != 0)),
        (ColumnType::Float, SqlValue::Real(f)) => Ok(Value::Float(f)),
        (ColumnType::Float, SqlValue::Integer(i)) => Ok(Value::Float(i as f64)),
        (ColumnType::Text, SqlValue::Text(s)) => Ok(Value::Text(s)),
        (ColumnType::Date, SqlValue::Text(s)) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| bad(&SqlValue::Text(s))),
        (_, other) => Err(bad(&other)),
    }
}
