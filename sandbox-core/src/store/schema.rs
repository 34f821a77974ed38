//! Canonical table definitions.
//!
//! Each column has two renderings: the full definition used when a table is
//! created from scratch, and a reduced one that `ALTER TABLE ... ADD COLUMN`
//! accepts on an existing table (no `UNIQUE`, no `NOT NULL`, no
//! non-constant defaults).

/// Default value of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    None,
    /// A literal SQL expression such as `0` or `'classic'`.
    Literal(&'static str),
    /// `CURRENT_TIMESTAMP`; only usable on create.
    CurrentTimestamp,
}

/// One canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub default: ColumnDefault,
    /// Extra constraints applied on create only.
    pub create_constraint: Option<&'static str>,
    pub primary_key: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            default: ColumnDefault::None,
            create_constraint: None,
            primary_key: false,
        }
    }

    const fn id() -> Self {
        Self {
            name: "id",
            sql_type: "INTEGER",
            default: ColumnDefault::None,
            create_constraint: Some("PRIMARY KEY AUTOINCREMENT"),
            primary_key: true,
        }
    }

    const fn default_to(self, literal: &'static str) -> Self {
        Self {
            default: ColumnDefault::Literal(literal),
            ..self
        }
    }

    const fn stamped(self) -> Self {
        Self {
            default: ColumnDefault::CurrentTimestamp,
            ..self
        }
    }

    const fn constrained(self, constraint: &'static str) -> Self {
        Self {
            create_constraint: Some(constraint),
            ..self
        }
    }

    /// Column definition used inside `CREATE TABLE`.
    pub fn create_definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.sql_type);
        if let Some(constraint) = self.create_constraint {
            def.push(' ');
            def.push_str(constraint);
        }
        match self.default {
            ColumnDefault::None => {}
            ColumnDefault::Literal(value) => {
                def.push_str(" DEFAULT ");
                def.push_str(value);
            }
            ColumnDefault::CurrentTimestamp => def.push_str(" DEFAULT CURRENT_TIMESTAMP"),
        }
        def
    }

    /// Column definition accepted by `ALTER TABLE ADD COLUMN`.
    ///
    /// Returns `None` for a primary key, which cannot be added afterwards.
    pub fn add_definition(&self) -> Option<String> {
        if self.primary_key {
            return None;
        }
        let mut def = format!("{} {}", self.name, self.sql_type);
        if let ColumnDefault::Literal(value) = self.default {
            def.push_str(" DEFAULT ");
            def.push_str(value);
        }
        Some(def)
    }
}

/// One canonical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl TableSpec {
    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| c.create_definition())
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, columns)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// An index created on a best-effort basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

impl IndexSpec {
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            self.name, self.table, self.column
        )
    }
}

pub const USERS: TableSpec = TableSpec {
    name: "users",
    columns: &[
        ColumnSpec::id(),
        ColumnSpec::new("username", "TEXT").constrained("UNIQUE"),
        ColumnSpec::new("name", "TEXT"),
        ColumnSpec::new("idea", "TEXT"),
        ColumnSpec::new("created_at", "TIMESTAMP").stamped(),
    ],
};

pub const GAMES: TableSpec = TableSpec {
    name: "games",
    columns: &[
        ColumnSpec::id(),
        ColumnSpec::new("user_id", "INTEGER"),
        ColumnSpec::new("startup_name", "TEXT"),
        ColumnSpec::new("budget", "INTEGER").default_to("1000"),
        ColumnSpec::new("reputation", "INTEGER").default_to("50"),
        ColumnSpec::new("morale", "INTEGER").default_to("80"),
        ColumnSpec::new("turn", "INTEGER").default_to("1"),
        ColumnSpec::new("score", "INTEGER").default_to("0"),
        ColumnSpec::new("mode", "TEXT").default_to("'classic'"),
        ColumnSpec::new("is_game_over", "INTEGER").default_to("0"),
        ColumnSpec::new("game_over_reason", "TEXT"),
        ColumnSpec::new("created_at", "TIMESTAMP").stamped(),
        ColumnSpec::new("updated_at", "TIMESTAMP").stamped(),
    ],
};

pub const SCENARIOS: TableSpec = TableSpec {
    name: "scenarios",
    columns: &[
        ColumnSpec::id(),
        ColumnSpec::new("game_id", "INTEGER"),
        ColumnSpec::new("scenario_type", "TEXT").default_to("'NORMAL'"),
        ColumnSpec::new("title", "TEXT").constrained("NOT NULL"),
        ColumnSpec::new("description", "TEXT").constrained("NOT NULL"),
        ColumnSpec::new("difficulty_level", "TEXT").default_to("'medium'"),
        ColumnSpec::new("turn_number", "INTEGER").default_to("1"),
        ColumnSpec::new("created_at", "TIMESTAMP").stamped(),
    ],
};

pub const CHOICES: TableSpec = TableSpec {
    name: "choices",
    columns: &[
        ColumnSpec::id(),
        ColumnSpec::new("scenario_id", "INTEGER"),
        ColumnSpec::new("text", "TEXT").constrained("NOT NULL"),
        ColumnSpec::new("cost_impact", "INTEGER").default_to("0"),
        ColumnSpec::new("reputation_impact", "INTEGER").default_to("0"),
        ColumnSpec::new("morale_impact", "INTEGER").default_to("0"),
        ColumnSpec::new("risk_level", "INTEGER").default_to("3"),
        ColumnSpec::new("created_at", "TIMESTAMP").stamped(),
    ],
};

pub const LOGS: TableSpec = TableSpec {
    name: "logs",
    columns: &[
        ColumnSpec::id(),
        ColumnSpec::new("game_id", "INTEGER"),
        ColumnSpec::new("turn", "INTEGER"),
        ColumnSpec::new("scenario_id", "INTEGER"),
        ColumnSpec::new("scenario_title", "TEXT"),
        ColumnSpec::new("choice_id", "INTEGER"),
        ColumnSpec::new("choice_text", "TEXT"),
        ColumnSpec::new("cost_impact", "INTEGER").default_to("0"),
        ColumnSpec::new("reputation_impact", "INTEGER").default_to("0"),
        ColumnSpec::new("morale_impact", "INTEGER").default_to("0"),
        ColumnSpec::new("created_at", "TIMESTAMP").stamped(),
    ],
};

pub const GAME_STATISTICS: TableSpec = TableSpec {
    name: "game_statistics",
    columns: &[
        ColumnSpec::id(),
        ColumnSpec::new("game_id", "INTEGER"),
        ColumnSpec::new("total_turns", "INTEGER").default_to("0"),
        ColumnSpec::new("total_crises", "INTEGER").default_to("0"),
        ColumnSpec::new("total_opportunities", "INTEGER").default_to("0"),
        ColumnSpec::new("avg_budget", "REAL").default_to("0"),
        ColumnSpec::new("avg_reputation", "REAL").default_to("0"),
        ColumnSpec::new("avg_morale", "REAL").default_to("0"),
    ],
};

/// Every canonical table, in creation order.
pub const TABLES: [TableSpec; 6] = [USERS, GAMES, SCENARIOS, CHOICES, LOGS, GAME_STATISTICS];

pub const INDEXES: [IndexSpec; 3] = [
    IndexSpec {
        name: "idx_scenarios_game_id",
        table: "scenarios",
        column: "game_id",
    },
    IndexSpec {
        name: "idx_choices_scenario_id",
        table: "choices",
        column: "scenario_id",
    },
    IndexSpec {
        name: "idx_logs_game_id",
        table: "logs",
        column: "game_id",
    },
];
