//! Turn application and the per-run timeline.

use super::rows::{query_raw, TurnRow};
use super::{RowWriter, Store, StoreError};
use crate::rules::join_reasons;
use crate::world::{EventId, Impacts, Meter, Meters, OptionId, RunId, TurnRecord, TurnRecordId};
use rusqlite::types::Value;

/// Everything needed to commit one resolved turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnEntry {
    pub run: RunId,
    /// Turn the decision was made on; the run must still be on it.
    pub turn: i64,
    pub event: EventId,
    pub event_title: String,
    pub option: OptionId,
    pub option_text: String,
    pub applied: Impacts,
    pub meters: Meters,
    pub score_gain: i64,
    /// Non-empty when the new meters end the run.
    pub game_over: Vec<Meter>,
}

impl Store {
    /// Apply a resolved turn: update the run and append its record.
    ///
    /// Both writes happen in one transaction. If the run has moved past
    /// `entry.turn` in the meantime nothing is written and
    /// [`StoreError::StaleRun`] is returned.
    pub fn append_turn(&self, entry: &TurnEntry) -> Result<TurnRecord, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut run_update = RowWriter::new("games", &self.columns)
            .require("budget", entry.meters.capital)?
            .require("reputation", entry.meters.reputation)?
            .require("morale", entry.meters.morale)?
            .set_expr("turn", "COALESCE(turn, 1) + 1")
            .add("score", entry.score_gain)
            .stamp("updated_at");
        if !entry.game_over.is_empty() {
            run_update = run_update
                .set("is_game_over", 1i64)
                .set("game_over_reason", join_reasons(&entry.game_over));
        }
        let changed = run_update.update(
            &tx,
            "id = ?1 AND COALESCE(turn, 1) = ?2",
            vec![Value::Integer(entry.run.0), Value::Integer(entry.turn)],
        )?;
        if changed == 0 {
            return Err(StoreError::StaleRun(entry.run));
        }

        let record_id = RowWriter::new("logs", &self.columns)
            .require("game_id", entry.run.0)?
            .set("turn", entry.turn)
            .set("scenario_id", entry.event.0)
            .set("scenario_title", entry.event_title.clone())
            .set("choice_id", entry.option.0)
            .set("choice_text", entry.option_text.clone())
            .set("cost_impact", entry.applied.capital)
            .set("budget_impact", entry.applied.capital)
            .set("reputation_impact", entry.applied.reputation)
            .set("morale_impact", entry.applied.morale)
            .stamp("created_at")
            .insert(&tx)?;

        tx.commit()?;

        Ok(TurnRecord {
            id: TurnRecordId(record_id),
            run_id: entry.run,
            turn: entry.turn,
            event_id: Some(entry.event),
            option_id: Some(entry.option),
            event_title: entry.event_title.clone(),
            option_text: entry.option_text.clone(),
            applied: entry.applied,
            created_at: None,
        })
    }

    /// Every turn record of a run, oldest first.
    pub fn timeline(&self, run: RunId) -> Result<Vec<TurnRecord>, StoreError> {
        if !self.columns.has("logs", "game_id") {
            return Ok(Vec::new());
        }
        let conn = self.conn();
        let rows = query_raw(
            &conn,
            "SELECT * FROM logs WHERE game_id = ?1 ORDER BY id",
            [run.0],
        )?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| TurnRow::from_raw(row).into_record(run, i as i64 + 1))
            .collect())
    }
}
