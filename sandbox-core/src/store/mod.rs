//! SQLite persistence.
//!
//! The store opens (or creates) a database file, reconciles it to the
//! canonical layout, and then serves typed reads and writes. Databases
//! written by older versions of the game are accepted as they are: readers
//! tolerate missing, renamed and loosely-typed columns, and writers only
//! touch columns that exist.
//!
//! # Example
//!
//! ```no_run
//! use sandbox_core::store::Store;
//!
//! let store = Store::open("startup.db")?;
//! for warning in &store.reconcile_report().warnings {
//!     eprintln!("schema: {warning}");
//! }
//! # Ok::<(), sandbox_core::store::StoreError>(())
//! ```

mod columns;
mod events;
mod reconcile;
mod rows;
mod runs;
pub mod schema;
mod turns;

pub use columns::{ColumnInfo, ColumnSet};
pub use reconcile::{reconcile, ReconcileReport};
pub use turns::TurnEntry;

use crate::world::RunId;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("column {table}.{column} is not available")]
    MissingColumn { table: String, column: String },

    #[error("run {0} changed while a turn was being applied")]
    StaleRun(RunId),

    #[error("stored {0} row could not be decoded")]
    Malformed(&'static str),
}

/// Handle to the game database.
pub struct Store {
    conn: Mutex<Connection>,
    columns: ColumnSet,
    report: ReconcileReport,
}

impl Store {
    /// Open or create the database at `path` and reconcile its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening store");
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Reconcile an already-open connection and wrap it.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let report = reconcile(&conn);
        let names: Vec<&str> = schema::TABLES.iter().map(|t| t.name).collect();
        let columns = ColumnSet::load(&conn, &names);
        Ok(Self {
            conn: Mutex::new(conn),
            columns,
            report,
        })
    }

    /// What reconciliation did when the store was opened.
    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.report
    }

    /// Columns found after reconciliation.
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves the connection itself intact.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// Column-aware statements
// ============================================================================

enum Assignment {
    Param(Value),
    Expr(&'static str),
    Add(Value),
}

/// Builds an INSERT or UPDATE that only names columns the table has.
struct RowWriter<'a> {
    table: &'static str,
    columns: &'a ColumnSet,
    assignments: Vec<(&'static str, Assignment)>,
}

impl<'a> RowWriter<'a> {
    fn new(table: &'static str, columns: &'a ColumnSet) -> Self {
        Self {
            table,
            columns,
            assignments: Vec::new(),
        }
    }

    /// Set `column` if the table has it.
    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        if self.columns.has(self.table, column) {
            self.assignments.push((column, Assignment::Param(value.into())));
        }
        self
    }

    /// Set `column`, failing if the table does not have it.
    fn require(mut self, column: &'static str, value: impl Into<Value>) -> Result<Self, StoreError> {
        if !self.columns.has(self.table, column) {
            return Err(StoreError::MissingColumn {
                table: self.table.to_string(),
                column: column.to_string(),
            });
        }
        self.assignments.push((column, Assignment::Param(value.into())));
        Ok(self)
    }

    /// Set `column` to a SQL expression if the table has it.
    fn set_expr(mut self, column: &'static str, expr: &'static str) -> Self {
        if self.columns.has(self.table, column) {
            self.assignments.push((column, Assignment::Expr(expr)));
        }
        self
    }

    /// Increment `column` by `amount` if the table has it.
    fn add(mut self, column: &'static str, amount: i64) -> Self {
        if self.columns.has(self.table, column) {
            self.assignments
                .push((column, Assignment::Add(Value::Integer(amount))));
        }
        self
    }

    /// Set `column` to the current time if the table has it.
    fn stamp(self, column: &'static str) -> Self {
        self.set_expr(column, "CURRENT_TIMESTAMP")
    }

    /// Column names paired with their SQL value text, plus bound params.
    fn split(self) -> (Vec<(&'static str, String)>, Vec<Value>) {
        let mut params = Vec::new();
        let mut parts = Vec::new();
        for (column, assignment) in self.assignments {
            match assignment {
                Assignment::Param(value) => {
                    params.push(value);
                    parts.push((column, format!("?{}", params.len())));
                }
                Assignment::Expr(expr) => parts.push((column, expr.to_string())),
                Assignment::Add(value) => {
                    params.push(value);
                    parts.push((column, format!("COALESCE({column}, 0) + ?{}", params.len())));
                }
            }
        }
        (parts, params)
    }

    /// Insert the row and return its rowid.
    fn insert(self, conn: &Connection) -> Result<i64, StoreError> {
        let table = self.table;
        let (parts, params) = self.split();
        if parts.is_empty() {
            conn.execute(&format!("INSERT INTO {table} DEFAULT VALUES"), [])?;
            return Ok(conn.last_insert_rowid());
        }
        let (names, values): (Vec<&str>, Vec<&str>) = parts
            .iter()
            .map(|(column, value)| (*column, value.as_str()))
            .unzip();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(", "),
            values.join(", ")
        );
        conn.execute(&sql, params_from_iter(params.iter()))?;
        Ok(conn.last_insert_rowid())
    }

    /// Update rows matching `filter`, whose placeholders follow the
    /// assignment parameters. Returns the number of rows changed.
    fn update(
        self,
        conn: &Connection,
        filter: &str,
        filter_params: Vec<Value>,
    ) -> Result<usize, StoreError> {
        let table = self.table;
        let (parts, mut params) = self.split();
        if parts.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> = parts
            .iter()
            .map(|(column, value)| format!("{column} = {value}"))
            .collect();
        let offset = params.len();
        let filter = renumber(filter, offset);
        params.extend(filter_params);
        let sql = format!(
            "UPDATE {table} SET {} WHERE {filter}",
            assignments.join(", ")
        );
        Ok(conn.execute(&sql, params_from_iter(params.iter()))?)
    }
}

/// Shift `?N` placeholders in `sql` by `offset`.
fn renumber(sql: &str, offset: usize) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c != '?' {
            continue;
        }
        let mut digits = String::new();
        while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(d);
            chars.next();
        }
        match digits.parse::<usize>() {
            Ok(n) => out.push_str(&(n + offset).to_string()),
            Err(_) => out.push_str(&digits),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renumber_placeholders() {
        assert_eq!(renumber("id = ?1 AND turn = ?2", 3), "id = ?4 AND turn = ?5");
        assert_eq!(renumber("id = ?1", 0), "id = ?1");
    }

    #[test]
    fn test_writer_skips_absent_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT);")
            .unwrap();
        let columns = ColumnSet::load(&conn, &["users"]);

        let id = RowWriter::new("users", &columns)
            .set("username", "ali".to_string())
            .set("idea", "ignored".to_string())
            .stamp("created_at")
            .insert(&conn)
            .unwrap();
        assert_eq!(id, 1);

        let missing = RowWriter::new("users", &columns).require("name", "x".to_string());
        assert!(matches!(missing, Err(StoreError::MissingColumn { .. })));
    }

    #[test]
    fn test_writer_update_with_filter() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE games (id INTEGER PRIMARY KEY, turn INTEGER, mode TEXT);
             INSERT INTO games (turn, mode) VALUES (2, 'classic');",
        )
        .unwrap();
        let columns = ColumnSet::load(&conn, &["games"]);

        let changed = RowWriter::new("games", &columns)
            .set("mode", "hard".to_string())
            .set_expr("turn", "turn + 1")
            .update(&conn, "id = ?1 AND turn = ?2", vec![Value::Integer(1), Value::Integer(2)])
            .unwrap();
        assert_eq!(changed, 1);

        let (turn, mode): (i64, String) = conn
            .query_row("SELECT turn, mode FROM games WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!((turn, mode.as_str()), (3, "hard"));
    }

    #[test]
    fn test_open_reports_fresh_schema() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.reconcile_report().created_tables.len(), schema::TABLES.len());
        assert!(store.columns().has("choices", "risk_level"));
    }
}
