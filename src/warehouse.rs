//! Warehouse writer contract and a file-backed implementation
//!
//! Tables are JSON arrays at `<root>/<schema>/<table>.json`. Loading the same
//! primary-keyed record repeatedly under `merge` converges to one row.

use crate::api::Record;
use crate::endpoints::{EndpointConfig, WriteDisposition};
use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination table and how a batch is applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub schema: String,
    pub table: String,
    pub primary_key: Vec<String>,
    pub disposition: WriteDisposition,
}

impl TableSpec {
    pub fn from_endpoint(endpoint: &EndpointConfig) -> Self {
        Self {
            schema: endpoint.schema.to_string(),
            table: endpoint.table.to_string(),
            primary_key: endpoint.primary_key.iter().map(|c| c.to_string()).collect(),
            disposition: endpoint.disposition,
        }
    }

    pub fn with_disposition(mut self, disposition: WriteDisposition) -> Self {
        self.disposition = disposition;
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Primary-key tuple rendered as JSON, or `None` if a key column is missing or null.
    fn key_of(&self, record: &Record) -> Option<String> {
        let mut parts = Vec::with_capacity(self.primary_key.len());
        for column in &self.primary_key {
            match record.get(column) {
                None | Some(Value::Null) => return None,
                Some(value) => parts.push(value),
            }
        }
        serde_json::to_string(&parts).ok()
    }
}

/// Result of one load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadInfo {
    pub table: String,
    pub disposition: WriteDisposition,
    pub received: usize,
    pub rows_after: usize,
}

pub trait Warehouse {
    /// Applies `records` to `table` according to its write disposition.
    fn load(&mut self, table: &TableSpec, records: Vec<Record>) -> Result<LoadInfo, AppError>;

    /// Rows currently stored in `table`; zero for a table never written.
    fn row_count(&self, table: &TableSpec) -> Result<usize, AppError>;
}

/// Directory of JSON tables.
#[derive(Debug, Clone)]
pub struct FileWarehouse {
    root: PathBuf,
}

impl FileWarehouse {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, table: &TableSpec) -> PathBuf {
        self.root
            .join(&table.schema)
            .join(format!("{}.json", table.table))
    }

    /// Reads every row of `table`.
    pub fn read_rows(&self, table: &TableSpec) -> Result<Vec<Record>, AppError> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            AppError::warehouse_error(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            AppError::warehouse_error(format!("Corrupt table file {}: {}", path.display(), e))
        })
    }

    fn write_rows(&self, table: &TableSpec, rows: &[Record]) -> Result<(), AppError> {
        let path = self.table_path(table);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::warehouse_error(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
        let content = serde_json::to_string_pretty(rows)?;
        fs::write(&path, content).map_err(|e| {
            AppError::warehouse_error(format!("Cannot write {}: {}", path.display(), e))
        })
    }

    fn merge(
        table: &TableSpec,
        mut rows: Vec<Record>,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, AppError> {
        let mut keyed = Vec::with_capacity(records.len());
        for record in records {
            let key = table.key_of(&record).ok_or_else(|| {
                AppError::warehouse_error(format!(
                    "{}: record is missing primary key column(s) {}",
                    table.qualified_name(),
                    table.primary_key.join(", ")
                ))
            })?;
            keyed.push((key, record));
        }

        let mut index: HashMap<String, usize> = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| table.key_of(row).map(|key| (key, i)))
            .collect();

        for (key, record) in keyed {
            match index.get(&key) {
                Some(&i) => rows[i] = record,
                None => {
                    index.insert(key, rows.len());
                    rows.push(record);
                }
            }
        }
        Ok(rows)
    }
}

impl Warehouse for FileWarehouse {
    fn load(&mut self, table: &TableSpec, records: Vec<Record>) -> Result<LoadInfo, AppError> {
        let received = records.len();
        let rows = match table.disposition {
            WriteDisposition::Merge => Self::merge(table, self.read_rows(table)?, records)?,
            WriteDisposition::Replace => records,
            WriteDisposition::Append => {
                let mut rows = self.read_rows(table)?;
                rows.extend(records);
                rows
            }
        };

        self.write_rows(table, &rows)?;
        debug!(
            "{} {} rows into {}",
            table.disposition,
            received,
            self.table_path(table).display()
        );
        info!(
            "Loaded {} records into {} ({}), {} rows total",
            received,
            table.qualified_name(),
            table.disposition,
            rows.len()
        );

        Ok(LoadInfo {
            table: table.qualified_name(),
            disposition: table.disposition,
            received,
            rows_after: rows.len(),
        })
    }

    fn row_count(&self, table: &TableSpec) -> Result<usize, AppError> {
        Ok(self.read_rows(table)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::Source;
    use crate::testing_utils::TestDataBuilder;
    use serde_json::json;
    use tempfile::TempDir;

    fn games_table(disposition: WriteDisposition) -> TableSpec {
        TableSpec {
            schema: "core".to_string(),
            table: "games".to_string(),
            primary_key: vec!["id".to_string()],
            disposition,
        }
    }

    fn game(id: i64, home_points: i64) -> Record {
        TestDataBuilder::record(json!({"id": id, "home_points": home_points}))
    }

    #[test]
    fn test_table_spec_from_endpoint() {
        let endpoint = Source::Betting.endpoints()[0];
        let table = TableSpec::from_endpoint(&endpoint);
        assert_eq!(table.qualified_name(), "betting.lines");
        assert_eq!(table.primary_key, vec!["game_id", "provider"]);
        assert_eq!(table.disposition, WriteDisposition::Merge);
    }

    #[test]
    fn test_merge_upserts_in_place() {
        let dir = TempDir::new().unwrap();
        let mut warehouse = FileWarehouse::new(dir.path());
        let table = games_table(WriteDisposition::Merge);

        warehouse.load(&table, vec![game(1, 10), game(2, 20)]).unwrap();
        let info = warehouse.load(&table, vec![game(2, 27), game(3, 30)]).unwrap();

        assert_eq!(info.received, 2);
        assert_eq!(info.rows_after, 3);
        let rows = warehouse.read_rows(&table).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(rows[1]["home_points"], 27);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut warehouse = FileWarehouse::new(dir.path());
        let table = games_table(WriteDisposition::Merge);

        warehouse.load(&table, vec![game(1, 10)]).unwrap();
        warehouse.load(&table, vec![game(1, 10)]).unwrap();
        warehouse.load(&table, vec![game(1, 10), game(1, 10)]).unwrap();

        assert_eq!(warehouse.row_count(&table).unwrap(), 1);
    }

    #[test]
    fn test_merge_composite_key() {
        let dir = TempDir::new().unwrap();
        let mut warehouse = FileWarehouse::new(dir.path());
        let table = TableSpec::from_endpoint(&Source::Betting.endpoints()[0]);

        let line = |provider: &str, spread: f64| {
            TestDataBuilder::record(json!({"game_id": 9, "provider": provider, "spread": spread}))
        };
        warehouse
            .load(&table, vec![line("Bovada", -3.0), line("DraftKings", -3.5)])
            .unwrap();
        warehouse.load(&table, vec![line("Bovada", -4.0)]).unwrap();

        let rows = warehouse.read_rows(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["spread"], -4.0);
    }

    #[test]
    fn test_merge_rejects_missing_key() {
        let dir = TempDir::new().unwrap();
        let mut warehouse = FileWarehouse::new(dir.path());
        let table = games_table(WriteDisposition::Merge);

        let err = warehouse
            .load(&table, vec![game(1, 10), TestDataBuilder::record(json!({"home_points": 3}))])
            .unwrap_err();
        assert!(matches!(err, AppError::Warehouse(_)));
        assert_eq!(warehouse.row_count(&table).unwrap(), 0);
    }

    #[test]
    fn test_replace_truncates() {
        let dir = TempDir::new().unwrap();
        let mut warehouse = FileWarehouse::new(dir.path());

        warehouse
            .load(&games_table(WriteDisposition::Merge), vec![game(1, 10), game(2, 20)])
            .unwrap();
        let info = warehouse
            .load(&games_table(WriteDisposition::Replace), vec![game(5, 50)])
            .unwrap();

        assert_eq!(info.rows_after, 1);
        assert_eq!(info.disposition, WriteDisposition::Replace);
    }

    #[test]
    fn test_append_keeps_duplicates() {
        let dir = TempDir::new().unwrap();
        let mut warehouse = FileWarehouse::new(dir.path());
        let table = games_table(WriteDisposition::Append);

        warehouse.load(&table, vec![game(1, 10)]).unwrap();
        let info = warehouse.load(&table, vec![game(1, 10)]).unwrap();
        assert_eq!(info.rows_after, 2);
    }

    #[test]
    fn test_table_path_layout() {
        let warehouse = FileWarehouse::new("/data/wh");
        assert_eq!(
            warehouse.table_path(&games_table(WriteDisposition::Merge)),
            PathBuf::from("/data/wh/core/games.json")
        );
    }

    #[test]
    fn test_corrupt_table_file() {
        let dir = TempDir::new().unwrap();
        let warehouse = FileWarehouse::new(dir.path());
        let table = games_table(WriteDisposition::Merge);
        fs::create_dir_all(dir.path().join("core")).unwrap();
        fs::write(warehouse.table_path(&table), "{not json").unwrap();

        assert!(matches!(
            warehouse.read_rows(&table),
            Err(AppError::Warehouse(_))
        ));
    }
}
