//! Generated events and their options.

use super::rows::{query_raw, EventRow, OptionRow};
use super::{RowWriter, Store, StoreError};
use crate::world::{Event, EventDraft, EventId, EventOption, OptionId, RunId};
use rusqlite::Connection;

/// Number of recent titles handed to the generator.
pub const RECENT_TITLE_LIMIT: usize = 5;

impl Store {
    /// Store an event and its options atomically.
    pub fn insert_event(
        &self,
        run: RunId,
        turn: i64,
        draft: &EventDraft,
    ) -> Result<Event, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // Integer-typed legacy columns only accept numeric tiers.
        let difficulty = if self.columns.is_integer("scenarios", "difficulty_level") {
            rusqlite::types::Value::Integer(draft.difficulty.tier())
        } else {
            rusqlite::types::Value::Text(draft.difficulty.as_str().to_string())
        };

        let event_id = RowWriter::new("scenarios", &self.columns)
            .require("game_id", run.0)?
            .set("scenario_type", draft.category.as_str().to_string())
            .require("title", draft.title.clone())?
            .set("description", draft.description.clone())
            .set("difficulty_level", difficulty)
            .set("turn_number", turn)
            .stamp("created_at")
            .insert(&tx)?;

        let mut options = Vec::with_capacity(draft.options.len());
        for option in &draft.options {
            let id = RowWriter::new("choices", &self.columns)
                .require("scenario_id", event_id)?
                .require("text", option.text.clone())?
                .set("cost_impact", option.impacts.capital)
                .set("budget_impact", option.impacts.capital)
                .set("reputation_impact", option.impacts.reputation)
                .set("morale_impact", option.impacts.morale)
                .set("risk_level", i64::from(option.risk))
                .stamp("created_at")
                .insert(&tx)?;
            options.push(EventOption {
                id: OptionId(id),
                event_id: EventId(event_id),
                text: option.text.clone(),
                impacts: option.impacts,
                risk: option.risk,
            });
        }

        tx.commit()?;
        tracing::debug!(
            run_id = %run,
            event_id,
            turn,
            category = %draft.category,
            "stored event"
        );

        Ok(Event {
            id: EventId(event_id),
            run_id: run,
            category: draft.category,
            title: draft.title.clone(),
            description: draft.description.clone(),
            difficulty: draft.difficulty,
            turn,
            options,
        })
    }

    /// The newest event generated for `run` at `turn`, with its options.
    pub fn pending_event(&self, run: RunId, turn: i64) -> Result<Option<Event>, StoreError> {
        if !self.columns.has("scenarios", "game_id") {
            return Ok(None);
        }
        let conn = self.conn();
        let rows = if self.columns.has("scenarios", "turn_number") {
            query_raw(
                &conn,
                "SELECT * FROM scenarios WHERE game_id = ?1 AND turn_number = ?2 ORDER BY id DESC LIMIT 1",
                [run.0, turn],
            )?
        } else {
            query_raw(
                &conn,
                "SELECT * FROM scenarios WHERE game_id = ?1 ORDER BY id DESC LIMIT 1",
                [run.0],
            )?
        };
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let event_row = EventRow::from_raw(row);
        let event_id = event_row.id.ok_or(StoreError::Malformed("scenarios"))?;
        let options = self.load_options(&conn, EventId(event_id))?;
        Ok(event_row.into_event(run, turn, options))
    }

    /// Titles of the most recently resolved events, newest first.
    pub fn recent_titles(&self, run: RunId) -> Result<Vec<String>, StoreError> {
        if !self.columns.has("logs", "scenario_title") || !self.columns.has("logs", "game_id") {
            return Ok(Vec::new());
        }
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT scenario_title FROM logs WHERE game_id = ?1 AND scenario_title IS NOT NULL ORDER BY id DESC LIMIT ?2",
        )?;
        let titles = stmt
            .query_map(
                rusqlite::params![run.0, RECENT_TITLE_LIMIT as i64],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(titles
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect())
    }

    fn load_options(&self, conn: &Connection, event: EventId) -> Result<Vec<EventOption>, StoreError> {
        if !self.columns.has("choices", "scenario_id") {
            return Ok(Vec::new());
        }
        let rows = query_raw(
            conn,
            "SELECT * FROM choices WHERE scenario_id = ?1 ORDER BY id",
            [event.0],
        )?;
        Ok(rows
            .iter()
            .filter_map(|row| OptionRow::from_raw(row).into_option(event))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Category, Difficulty, GameMode, Impacts, OptionDraft};

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            category: Category::Crisis,
            difficulty: Difficulty::Hard,
            title: title.to_string(),
            description: "Servers are down.".to_string(),
            options: vec![
                OptionDraft {
                    text: "Roll back".to_string(),
                    impacts: Impacts::new(-100, 5, -2),
                    risk: 2,
                },
                OptionDraft {
                    text: "Hotfix".to_string(),
                    impacts: Impacts::new(-50, -5, -5),
                    risk: 4,
                },
                OptionDraft::neutral(),
            ],
        }
    }

    fn store_with_run() -> (Store, RunId) {
        let store = Store::open_in_memory().unwrap();
        let player = store.find_or_create_player("ali", "", "").unwrap();
        let run = store.insert_run(player.id, "TestCo", GameMode::Classic).unwrap();
        (store, run)
    }

    #[test]
    fn test_insert_then_pending() {
        let (store, run) = store_with_run();
        let stored = store.insert_event(run, 1, &draft("Outage")).unwrap();
        assert_eq!(stored.options.len(), 3);

        let pending = store.pending_event(run, 1).unwrap().unwrap();
        assert_eq!(pending, stored);
        assert!(store.pending_event(run, 2).unwrap().is_none());
    }

    #[test]
    fn test_pending_prefers_newest() {
        let (store, run) = store_with_run();
        store.insert_event(run, 1, &draft("First")).unwrap();
        let newer = store.insert_event(run, 1, &draft("Second")).unwrap();

        let pending = store.pending_event(run, 1).unwrap().unwrap();
        assert_eq!(pending.id, newer.id);
        assert_eq!(pending.title, "Second");
    }

    #[test]
    fn test_recent_titles_empty_for_new_run() {
        let (store, run) = store_with_run();
        assert!(store.recent_titles(run).unwrap().is_empty());
    }
}
