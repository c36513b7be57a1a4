//! Persistence gateway.
//!
//! The pipeline only needs three operations from a store: check whether a
//! table exists, create it, and append rows. Reads return rows in insertion
//! order. Nothing is ever updated or deleted.
//!
//! - value model + table schemas (`schema`)
//! - typed row mappings for every persisted table (`tables`)
//! - in-memory store for tests and isolated runs (`memory`)
//! - SQLite store (`sqlite`)

pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod tables;

pub use memory::MemoryStore;
pub use schema::*;
pub use sqlite::SqliteStore;
pub use tables::*;

use crate::error::AppError;

/// Create-if-missing + append contract over a tabular store.
pub trait TradeStore {
    fn table_exists(&self, name: &str) -> Result<bool, AppError>;

    /// Create a table. Fails if it already exists.
    fn create_table(&mut self, name: &str, schema: &[Column]) -> Result<(), AppError>;

    /// Append rows; each row must match the table's column count.
    fn insert(&mut self, name: &str, rows: &[Vec<Value>]) -> Result<usize, AppError>;

    /// All rows of a table, columns ordered as in `schema`.
    fn read(&self, name: &str, schema: &[Column]) -> Result<Vec<Vec<Value>>, AppError>;
}

/// Write `rows` into a fresh table unless the table already exists.
///
/// Returns `false` (and writes nothing) when the table was already present:
/// the first successful ingestion wins.
pub fn create_and_insert_if_absent<T: TableRow>(
    store: &mut dyn TradeStore,
    name: &str,
    rows: &[T],
) -> Result<bool, AppError> {
    if store.table_exists(name)? {
        log::info!("table '{name}' already exists, skipping");
        return Ok(false);
    }
    store.create_table(name, T::SCHEMA)?;
    let values: Vec<Vec<Value>> = rows.iter().map(TableRow::to_values).collect();
    let n = store.insert(name, &values)?;
    log::info!("inserted {n} rows into '{name}'");
    Ok(true)
}

/// Append `rows`, creating the table first if needed.
pub fn append_rows<T: TableRow>(
    store: &mut dyn TradeStore,
    name: &str,
    rows: &[T],
) -> Result<usize, AppError> {
    if !store.table_exists(name)? {
        store.create_table(name, T::SCHEMA)?;
        log::info!("initialized table '{name}'");
    }
    let values: Vec<Vec<Value>> = rows.iter().map(TableRow::to_values).collect();
    let n = store.insert(name, &values)?;
    log::info!("appended {n} rows to '{name}'");
    Ok(n)
}

/// Read and decode every row of a table.
pub fn read_rows<T: TableRow>(store: &dyn TradeStore, name: &str) -> Result<Vec<T>, AppError> {
    store
        .read(name, T::SCHEMA)?
        .iter()
        .map(|values| T::from_values(values))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UnitEntry;

    #[test]
    fn first_write_wins() {
        let mut store = MemoryStore::new();
        let first = vec![UnitEntry { id: 1, unit_code: "kg".into() }];
        let second = vec![UnitEntry { id: 1, unit_code: "t".into() }];

        assert!(create_and_insert_if_absent(&mut store, UNIT_TABLE, &first).unwrap());
        assert!(!create_and_insert_if_absent(&mut store, UNIT_TABLE, &second).unwrap());

        let back: Vec<UnitEntry> = read_rows(&store, UNIT_TABLE).unwrap();
        assert_eq!(back, first);
    }

    #[test]
    fn append_creates_then_extends() {
        let mut store = MemoryStore::new();
        let rows = vec![UnitEntry { id: 1, unit_code: "kg".into() }];
        append_rows(&mut store, UNIT_TABLE, &rows).unwrap();
        append_rows(&mut store, UNIT_TABLE, &rows).unwrap();
        let back: Vec<UnitEntry> = read_rows(&store, UNIT_TABLE).unwrap();
        assert_eq!(back.len(), 2);
    }
}
