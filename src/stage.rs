//! In-memory staging store backed by DuckDB
//!
//! Every deployment run gets a fresh `:memory:` database. CSV files are bulk
//! loaded with `read_csv_auto`, which handles the header row and column type
//! inference. Staged tables live only as long as the store connection.

use crate::{Error, Result};
use duckdb::arrow::datatypes::SchemaRef;
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::Connection;
use std::path::Path;
use tracing::info;

/// One staged table exported from the store, ready to ship to the warehouse.
#[derive(Debug, Clone)]
pub struct StagedTable {
    pub name: String,
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl StagedTable {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Ephemeral in-memory analytical store.
pub struct StagingStore {
    conn: Connection,
}

impl StagingStore {
    /// Open a fresh, empty in-memory store. No state survives across runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Bulk-load one CSV file into a new staged table and return its name.
    ///
    /// The table name is the file's base name with the extension stripped and
    /// upper-cased. `CREATE OR REPLACE` means a second file mapping to the
    /// same name silently replaces the first (last-loaded-wins).
    pub fn load_csv(&self, path: &Path) -> Result<String> {
        let table_name = table_name_for(path).ok_or_else(|| {
            Error::Other(format!("cannot derive a table name from {}", path.display()))
        })?;

        let sql = format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_csv_auto({})",
            quote_ident(&table_name),
            quote_literal(&path.to_string_lossy()),
        );
        self.conn.execute_batch(&sql)?;

        info!("Loaded '{}' into staged table '{}'", path.display(), table_name);
        Ok(table_name)
    }

    /// Names of all staged tables, in whatever order the catalog returns them.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = 'main'",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Export a staged table as Arrow record batches.
    ///
    /// The schema is carried alongside the batches so that an empty table can
    /// still be recreated remotely.
    pub fn export(&self, name: &str) -> Result<StagedTable> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(name)))?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        let schema = stmt.schema();
        Ok(StagedTable {
            name: name.to_string(),
            schema,
            batches,
        })
    }

    /// Release the store. Dropping the store has the same effect; this form
    /// surfaces teardown errors to the caller.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Staging(e))
    }
}

/// Derive a staged table name from a file path: base name, extension stripped,
/// upper-cased. Returns `None` for paths without a usable file stem.
pub fn table_name_for(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_uppercase())
}

/// Quote a SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_table_name_derivation() {
        assert_eq!(
            table_name_for(&PathBuf::from("/data/sales_2024.csv")),
            Some("SALES_2024".to_string())
        );
        assert_eq!(
            table_name_for(&PathBuf::from("Mixed.Case.csv")),
            Some("MIXED.CASE".to_string())
        );
        assert_eq!(table_name_for(&PathBuf::from("/")), None);
    }

    #[test]
    fn test_load_and_export_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("people.csv");
        std::fs::write(&csv_path, "id,name\n1,Alice\n2,Bob\n").unwrap();

        let store = StagingStore::open_in_memory().unwrap();
        let name = store.load_csv(&csv_path).unwrap();
        assert_eq!(name, "PEOPLE");

        let table = store.export("PEOPLE").unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.schema.fields().len(), 2);
        assert_eq!(table.schema.field(0).name(), "id");

        store.close().unwrap();
    }

    #[test]
    fn test_collision_is_last_loaded_wins() {
        // Two files mapping to the same derived name: the second load must
        // silently replace the first. Defined behavior, not an error.
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("Sales.csv");
        let second = temp_dir.path().join("sales.csv");
        std::fs::write(&first, "id\n1\n2\n3\n").unwrap();
        std::fs::write(&second, "id\n99\n").unwrap();

        let store = StagingStore::open_in_memory().unwrap();
        store.load_csv(&first).unwrap();
        store.load_csv(&second).unwrap();

        let names = store.table_names().unwrap();
        assert_eq!(names, vec!["SALES".to_string()]);

        let table = store.export("SALES").unwrap();
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn test_malformed_csv_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("broken.csv");
        // read_csv_auto tolerates ragged and unterminated-quote input, but
        // rejects invalid UTF-8 bytes.
        std::fs::write(&csv_path, b"id,name\n1,\xff\xfe\n").unwrap();

        let store = StagingStore::open_in_memory().unwrap();
        assert!(store.load_csv(&csv_path).is_err());
    }

    #[test]
    fn test_fresh_store_is_empty() {
        let store = StagingStore::open_in_memory().unwrap();
        assert!(store.table_names().unwrap().is_empty());
    }
}
