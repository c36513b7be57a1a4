//! Store-neutral value model.

use chrono::NaiveDate;

use crate::error::AppError;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Value::Null, Value::Int)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Value::Null, Value::Float)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map_or(Value::Null, Value::Text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Bool,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl Column {
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty, nullable: false }
    }

    pub const fn nullable(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty, nullable: true }
    }
}

/// A typed record that maps to one table row.
pub trait TableRow: Sized {
    const SCHEMA: &'static [Column];

    fn to_values(&self) -> Vec<Value>;

    fn from_values(values: &[Value]) -> Result<Self, AppError>;
}

fn cell<'a>(values: &'a [Value], idx: usize) -> Result<&'a Value, AppError> {
    values
        .get(idx)
        .ok_or_else(|| {
            AppError::store(format!(
                "Row has {} columns, expected at least {}",
                values.len(),
                idx + 1
            ))
        })
}

fn mismatch(idx: usize, expected: &str, got: &Value) -> AppError {
    AppError::store(format!("Column {idx}: expected {expected}, got {got:?}"))
}

pub(crate) fn opt_int(values: &[Value], idx: usize) -> Result<Option<i64>, AppError> {
    match cell(values, idx)? {
        Value::Null => Ok(None),
        Value::Int(v) => Ok(Some(*v)),
        other => Err(mismatch(idx, "integer", other)),
    }
}

pub(crate) fn req_int(values: &[Value], idx: usize) -> Result<i64, AppError> {
    opt_int(values, idx)?.ok_or_else(|| AppError::store(format!("Column {idx}: unexpected NULL")))
}

pub(crate) fn opt_float(values: &[Value], idx: usize) -> Result<Option<f64>, AppError> {
    match cell(values, idx)? {
        Value::Null => Ok(None),
        Value::Float(v) => Ok(Some(*v)),
        Value::Int(v) => Ok(Some(*v as f64)),
        other => Err(mismatch(idx, "float", other)),
    }
}

pub(crate) fn req_float(values: &[Value], idx: usize) -> Result<f64, AppError> {
    opt_float(values, idx)?.ok_or_else(|| AppError::store(format!("Column {idx}: unexpected NULL")))
}

pub(crate) fn opt_text(values: &[Value], idx: usize) -> Result<Option<String>, AppError> {
    match cell(values, idx)? {
        Value::Null => Ok(None),
        Value::Text(v) => Ok(Some(v.clone())),
        other => Err(mismatch(idx, "text", other)),
    }
}

pub(crate) fn req_text(values: &[Value], idx: usize) -> Result<String, AppError> {
    opt_text(values, idx)?.ok_or_else(|| AppError::store(format!("Column {idx}: unexpected NULL")))
}

pub(crate) fn req_bool(values: &[Value], idx: usize) -> Result<bool, AppError> {
    match cell(values, idx)? {
        Value::Bool(v) => Ok(*v),
        other => Err(mismatch(idx, "boolean", other)),
    }
}

pub(crate) fn req_date(values: &[Value], idx: usize) -> Result<NaiveDate, AppError> {
    match cell(values, idx)? {
        Value::Date(v) => Ok(*v),
        other => Err(mismatch(idx, "date", other)),
    }
}
