//! Bring an existing database up to the canonical layout.
//!
//! Reconciliation is additive only. Missing tables are created and missing
//! columns are added; nothing is renamed, retyped, or dropped, and rows are
//! never rewritten. Each table is handled on its own so one broken table
//! does not stop the rest.

use super::columns::table_columns;
use super::schema::{self, TableSpec};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created_tables: Vec<String>,
    /// `(table, column)` pairs that were added.
    pub added_columns: Vec<(String, String)>,
    pub warnings: Vec<String>,
}

impl ReconcileReport {
    /// True when the database already matched the canonical layout.
    pub fn is_noop(&self) -> bool {
        self.created_tables.is_empty() && self.added_columns.is_empty()
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Reconcile every canonical table, then create indexes.
///
/// Never fails; problems are logged and listed in the report.
pub fn reconcile(conn: &Connection) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for table in schema::TABLES.iter() {
        if let Err(e) = reconcile_table(conn, table, &mut report) {
            report.warn(format!("could not reconcile table {}: {e}", table.name));
        }
    }

    for index in schema::INDEXES.iter() {
        if let Err(e) = conn.execute(&index.create_sql(), []) {
            debug!(index = index.name, error = %e, "skipped index");
        }
    }

    if !report.is_noop() {
        info!(
            created = report.created_tables.len(),
            added = report.added_columns.len(),
            "reconciled database schema"
        );
    }

    report
}

fn reconcile_table(
    conn: &Connection,
    spec: &TableSpec,
    report: &mut ReconcileReport,
) -> rusqlite::Result<()> {
    match object_kind(conn, spec.name)? {
        None => {
            conn.execute(&spec.create_sql(), [])?;
            report.created_tables.push(spec.name.to_string());
            return Ok(());
        }
        Some(kind) if kind != "table" => {
            report.warn(format!(
                "{} exists as a {kind}, not a table; leaving it alone",
                spec.name
            ));
            return Ok(());
        }
        Some(_) => {}
    }

    let existing: HashSet<String> = table_columns(conn, spec.name)?
        .into_iter()
        .map(|c| c.name.to_ascii_lowercase())
        .collect();

    for column in spec.columns {
        if existing.contains(&column.name.to_ascii_lowercase()) {
            continue;
        }
        let Some(definition) = column.add_definition() else {
            report.warn(format!(
                "{}.{} is missing and cannot be added",
                spec.name, column.name
            ));
            continue;
        };
        let sql = format!("ALTER TABLE {} ADD COLUMN {definition}", spec.name);
        match conn.execute(&sql, []) {
            Ok(_) => {
                debug!(table = spec.name, column = column.name, "added column");
                report
                    .added_columns
                    .push((spec.name.to_string(), column.name.to_string()));
            }
            // Another writer got there first.
            Err(e) if e.to_string().contains("duplicate column") => {}
            Err(e) => report.warn(format!(
                "could not add {}.{}: {e}",
                spec.name, column.name
            )),
        }
    }

    Ok(())
}

/// The `sqlite_master` type of `name`, if any object has that name.
fn object_kind(conn: &Connection, name: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT type FROM sqlite_master WHERE lower(name) = lower(?1) AND type IN ('table', 'view')",
        [name],
        |row| row.get(0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::columns::ColumnSet;

    #[test]
    fn test_fresh_database_gets_every_table() {
        let conn = Connection::open_in_memory().unwrap();
        let report = reconcile(&conn);

        assert_eq!(report.created_tables.len(), schema::TABLES.len());
        assert!(report.added_columns.is_empty());
        assert!(report.warnings.is_empty());

        let set = ColumnSet::load(&conn, &["games", "logs"]);
        assert!(set.has("games", "mode"));
        assert!(set.has("logs", "cost_impact"));
    }

    #[test]
    fn test_second_pass_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        reconcile(&conn);
        let second = reconcile(&conn);
        assert!(second.is_noop());
        assert!(second.warnings.is_empty());
    }

    #[test]
    fn test_missing_columns_added_without_touching_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE games (id INTEGER PRIMARY KEY AUTOINCREMENT, user_id INTEGER, budget INTEGER, reputation INTEGER, morale INTEGER, turn INTEGER);
             INSERT INTO games (user_id, budget, reputation, morale, turn) VALUES (1, 420, 33, 61, 4);",
        )
        .unwrap();

        let report = reconcile(&conn);

        assert!(report
            .added_columns
            .contains(&("games".to_string(), "mode".to_string())));
        assert!(report
            .added_columns
            .contains(&("games".to_string(), "updated_at".to_string())));

        let (budget, turn, mode): (i64, i64, String) = conn
            .query_row("SELECT budget, turn, mode FROM games WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!((budget, turn, mode.as_str()), (420, 4, "classic"));
    }

    #[test]
    fn test_view_named_like_table_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE VIEW logs AS SELECT 1 AS id;").unwrap();

        let report = reconcile(&conn);

        assert!(!report.created_tables.contains(&"logs".to_string()));
        assert!(report.warnings.iter().any(|w| w.contains("logs")));
        // Everything else still reconciled.
        assert!(report.created_tables.contains(&"games".to_string()));
    }
}
