//! In-memory store. Each instance is independent, so tests can run in parallel.

use std::collections::HashMap;

use crate::error::AppError;
use crate::store::TradeStore;
use crate::store::schema::{Column, Value};

#[derive(Debug, Clone)]
struct MemTable {
    schema: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, MemTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TradeStore for MemoryStore {
    fn table_exists(&self, name: &str) -> Result<bool, AppError> {
        Ok(self.tables.contains_key(name))
    }

    fn create_table(&mut self, name: &str, schema: &[Column]) -> Result<(), AppError> {
        if self.tables.contains_key(name) {
            return Err(AppError::store(format!("Table '{name}' already exists")));
        }
        self.tables.insert(
            name.to_string(),
            MemTable {
                schema: schema.to_vec(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn insert(&mut self, name: &str, rows: &[Vec<Value>]) -> Result<usize, AppError> {
        let table = self
            .tables
            .get_mut(name)
            .ok_or_else(|| AppError::store(format!("Table '{name}' does not exist")))?;
        if let Some(bad) = rows.iter().find(|r| r.len() != table.schema.len()) {
            return Err(AppError::store(format!(
                "Row width {} does not match table '{name}' ({} columns)",
                bad.len(),
                table.schema.len()
            )));
        }
        table.rows.extend(rows.iter().cloned());
        Ok(rows.len())
    }

    fn read(&self, name: &str, schema: &[Column]) -> Result<Vec<Vec<Value>>, AppError> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| AppError::store(format!("Table '{name}' does not exist")))?;
        if table.schema.len() != schema.len() {
            return Err(AppError::store(format!("Schema mismatch reading table '{name}'")));
        }
        Ok(table.rows.clone())
    }
}
