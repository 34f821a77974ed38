//! Snapshot of the columns each table actually has.
//!
//! Readers and writers consult this instead of assuming the canonical
//! layout, so a database that could only be partially reconciled keeps
//! working with whatever it has.

use rusqlite::Connection;
use std::collections::HashMap;

/// A column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
}

impl ColumnInfo {
    /// Whether SQLite gives this column integer affinity.
    pub fn is_integer(&self) -> bool {
        self.declared_type.to_ascii_uppercase().contains("INT")
    }
}

/// Columns per table.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    tables: HashMap<String, Vec<ColumnInfo>>,
}

impl ColumnSet {
    /// Read column info for `tables`. Tables that cannot be read are left out.
    pub fn load(conn: &Connection, tables: &[&str]) -> Self {
        let mut set = Self::default();
        for table in tables {
            match table_columns(conn, table) {
                Ok(columns) if !columns.is_empty() => {
                    set.tables.insert(table.to_ascii_lowercase(), columns);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(table, error = %e, "could not read table columns"),
            }
        }
        set
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_ascii_lowercase())
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnInfo> {
        self.tables
            .get(&table.to_ascii_lowercase())?
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
    }

    pub fn has(&self, table: &str, column: &str) -> bool {
        self.column(table, column).is_some()
    }

    /// Whether `column` exists with integer affinity.
    pub fn is_integer(&self, table: &str, column: &str) -> bool {
        self.column(table, column).is_some_and(ColumnInfo::is_integer)
    }
}

/// Read `PRAGMA table_info` for one table.
///
/// A table that does not exist yields an empty list.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get::<_, String>(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                not_null: row.get::<_, i64>(3)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}
