//! Row decoding for databases of uncertain shape.
//!
//! Rows are first read into a [`RawRow`] keyed by column name, then into a
//! partial record whose fields are all optional. Defaults are filled in
//! only when the partial record is turned into a domain type, so a missing
//! or mistyped column degrades a single field instead of failing the read.

use crate::rules::parse_reasons;
use crate::world::{
    clamp_risk, parse_risk, Category, Difficulty, Event, EventId, EventOption, GameMode, Impacts,
    Meters, OptionId, Player, PlayerId, Run, RunId, TurnRecord, TurnRecordId, RISK_DEFAULT,
};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Params, Row};
use std::collections::HashMap;

/// One row, by lower-cased column name.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    values: HashMap<String, Value>,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stmt = row.as_ref();
        let mut values = HashMap::with_capacity(stmt.column_count());
        for i in 0..stmt.column_count() {
            let name = stmt.column_name(i)?.to_ascii_lowercase();
            let value = match row.get_ref(i)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::Integer(v),
                ValueRef::Real(v) => Value::Real(v),
                ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
                ValueRef::Blob(v) => Value::Blob(v.to_vec()),
            };
            values.insert(name, value);
        }
        Ok(Self { values })
    }

    /// Integer value of `column`, coercing reals and numeric text.
    pub fn int(&self, column: &str) -> Option<i64> {
        match self.values.get(column)? {
            Value::Integer(v) => Some(*v),
            Value::Real(v) if v.is_finite() => Some(v.round() as i64),
            Value::Text(s) => parse_int(s),
            _ => None,
        }
    }

    /// Text value of `column`; numbers are rendered as text.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.values.get(column)? {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(v) => Some(v.to_string()),
            Value::Real(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Non-blank text value of `column`.
    pub fn non_empty(&self, column: &str) -> Option<String> {
        self.text(column)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// First column in `columns` holding a non-zero integer, else the first
    /// one holding any integer.
    fn int_alias(&self, columns: &[&str]) -> Option<i64> {
        columns
            .iter()
            .filter_map(|c| self.int(c))
            .find(|v| *v != 0)
            .or_else(|| columns.iter().find_map(|c| self.int(c)))
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim().trim_start_matches('+');
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64)
    })
}

/// Run `sql` and decode every row.
pub fn query_raw<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<Vec<RawRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, RawRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============================================================================
// Partial records
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PlayerRow {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub idea: Option<String>,
}

impl PlayerRow {
    pub fn from_raw(raw: &RawRow) -> Self {
        Self {
            id: raw.int("id"),
            username: raw.non_empty("username"),
            name: raw.non_empty("name"),
            idea: raw.text("idea"),
        }
    }

    pub fn into_player(self) -> Option<Player> {
        let handle = self.username.or_else(|| self.name.clone())?;
        Some(Player {
            id: PlayerId(self.id?),
            name: self.name.unwrap_or_else(|| handle.clone()),
            handle,
            idea: self.idea.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunRow {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub startup_name: Option<String>,
    pub budget: Option<i64>,
    pub reputation: Option<i64>,
    pub morale: Option<i64>,
    pub turn: Option<i64>,
    pub score: Option<i64>,
    pub mode: Option<String>,
    pub is_game_over: Option<i64>,
    pub game_over_reason: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl RunRow {
    pub fn from_raw(raw: &RawRow) -> Self {
        Self {
            id: raw.int("id"),
            user_id: raw.int("user_id"),
            startup_name: raw.non_empty("startup_name"),
            budget: raw.int("budget"),
            reputation: raw.int("reputation"),
            morale: raw.int("morale"),
            turn: raw.int("turn"),
            score: raw.int("score"),
            mode: raw.non_empty("mode"),
            is_game_over: raw.int("is_game_over"),
            game_over_reason: raw.non_empty("game_over_reason"),
            created_at: raw.text("created_at"),
            updated_at: raw.text("updated_at"),
        }
    }

    pub fn into_run(self) -> Option<Run> {
        let defaults = Meters::initial();
        let meters = Meters {
            capital: self.budget.unwrap_or(defaults.capital),
            reputation: self.reputation.unwrap_or(defaults.reputation),
            morale: self.morale.unwrap_or(defaults.morale),
        }
        .clamped();

        Some(Run {
            id: RunId(self.id?),
            player_id: self.user_id.map(PlayerId),
            venture: self.startup_name.unwrap_or_else(|| "Startup".to_string()),
            meters,
            turn: self.turn.unwrap_or(1).max(1),
            score: self.score.unwrap_or(0).max(0),
            mode: self
                .mode
                .as_deref()
                .map(GameMode::from_stored)
                .unwrap_or_default(),
            game_over: self.is_game_over.unwrap_or(0) != 0,
            game_over_reasons: self
                .game_over_reason
                .as_deref()
                .map(parse_reasons)
                .unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventRow {
    pub id: Option<i64>,
    pub game_id: Option<i64>,
    pub scenario_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub turn_number: Option<i64>,
}

impl EventRow {
    pub fn from_raw(raw: &RawRow) -> Self {
        Self {
            id: raw.int("id"),
            game_id: raw.int("game_id"),
            scenario_type: raw.non_empty("scenario_type"),
            title: raw.non_empty("title"),
            description: raw.non_empty("description"),
            difficulty: raw
                .text("difficulty_level")
                .as_deref()
                .and_then(Difficulty::parse),
            turn_number: raw.int("turn_number"),
        }
    }

    /// Build an event, attaching `options`. `run_id` fills in a missing
    /// owner and `turn` a missing turn number.
    pub fn into_event(self, run_id: RunId, turn: i64, options: Vec<EventOption>) -> Option<Event> {
        let category = self
            .scenario_type
            .as_deref()
            .and_then(Category::parse)
            .unwrap_or(Category::Normal);
        Some(Event {
            id: EventId(self.id?),
            run_id: self.game_id.map(RunId).unwrap_or(run_id),
            category,
            title: self.title.unwrap_or_else(|| "Untitled".to_string()),
            description: self.description.unwrap_or_default(),
            difficulty: self.difficulty.unwrap_or_else(|| category.difficulty()),
            turn: self.turn_number.unwrap_or(turn),
            options,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptionRow {
    pub id: Option<i64>,
    pub scenario_id: Option<i64>,
    pub text: Option<String>,
    pub capital: Option<i64>,
    pub reputation: Option<i64>,
    pub morale: Option<i64>,
    pub risk: Option<u8>,
}

impl OptionRow {
    pub fn from_raw(raw: &RawRow) -> Self {
        Self {
            id: raw.int("id"),
            scenario_id: raw.int("scenario_id"),
            text: raw.non_empty("text"),
            capital: raw.int_alias(&["cost_impact", "budget_impact"]),
            reputation: raw.int("reputation_impact"),
            morale: raw.int("morale_impact"),
            risk: raw.text("risk_level").as_deref().and_then(parse_risk),
        }
    }

    pub fn into_option(self, event_id: EventId) -> Option<EventOption> {
        Some(EventOption {
            id: OptionId(self.id?),
            event_id: self.scenario_id.map(EventId).unwrap_or(event_id),
            text: self.text?,
            impacts: Impacts {
                capital: self.capital.unwrap_or(0),
                reputation: self.reputation.unwrap_or(0),
                morale: self.morale.unwrap_or(0),
            },
            risk: self.risk.map(|r| clamp_risk(i64::from(r))).unwrap_or(RISK_DEFAULT),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TurnRow {
    pub id: Option<i64>,
    pub game_id: Option<i64>,
    pub turn: Option<i64>,
    pub scenario_id: Option<i64>,
    pub scenario_title: Option<String>,
    pub choice_id: Option<i64>,
    pub choice_text: Option<String>,
    pub capital: Option<i64>,
    pub reputation: Option<i64>,
    pub morale: Option<i64>,
    pub created_at: Option<String>,
}

impl TurnRow {
    pub fn from_raw(raw: &RawRow) -> Self {
        Self {
            id: raw.int("id"),
            game_id: raw.int("game_id"),
            turn: raw.int("turn").or_else(|| raw.int("turn_number")),
            scenario_id: raw.int("scenario_id"),
            scenario_title: raw.non_empty("scenario_title"),
            choice_id: raw.int("choice_id"),
            choice_text: raw
                .non_empty("choice_text")
                .or_else(|| raw.non_empty("user_choice")),
            capital: raw.int_alias(&["cost_impact", "budget_impact"]),
            reputation: raw.int("reputation_impact"),
            morale: raw.int("morale_impact"),
            created_at: raw.text("created_at"),
        }
    }

    /// `position` is the 1-based index of the row, used when no turn
    /// number was recorded.
    pub fn into_record(self, run_id: RunId, position: i64) -> Option<TurnRecord> {
        Some(TurnRecord {
            id: TurnRecordId(self.id?),
            run_id: self.game_id.map(RunId).unwrap_or(run_id),
            turn: self.turn.unwrap_or(position),
            event_id: self.scenario_id.map(EventId),
            option_id: self.choice_id.map(OptionId),
            event_title: self.scenario_title.unwrap_or_default(),
            option_text: self.choice_text.unwrap_or_default(),
            applied: Impacts {
                capital: self.capital.unwrap_or(0),
                reputation: self.reputation.unwrap_or(0),
                morale: self.morale.unwrap_or(0),
            },
            created_at: self.created_at,
        })
    }
}
