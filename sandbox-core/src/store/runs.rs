//! Players and runs.

use super::rows::{query_raw, PlayerRow, RunRow};
use super::{RowWriter, Store, StoreError};
use crate::rules::join_reasons;
use crate::world::{GameMode, Meter, Meters, Player, PlayerId, Run, RunId};
use rusqlite::types::Value;

impl Store {
    /// Look up a player by handle, creating one if none exists.
    ///
    /// An existing player keeps their stored name and idea.
    pub fn find_or_create_player(
        &self,
        handle: &str,
        name: &str,
        idea: &str,
    ) -> Result<Player, StoreError> {
        let has_username = self.columns.has("users", "username");
        let has_name = self.columns.has("users", "name");
        // Rows written before `username` existed are keyed by `name` alone.
        let filter = match (has_username, has_name) {
            (true, true) => "username = ?1 OR (username IS NULL AND name = ?1)",
            (true, false) => "username = ?1",
            (false, true) => "name = ?1",
            (false, false) => {
                return Err(StoreError::MissingColumn {
                    table: "users".to_string(),
                    column: "username".to_string(),
                })
            }
        };

        let conn = self.conn();
        let sql = format!("SELECT * FROM users WHERE {filter} ORDER BY id LIMIT 1");
        if let Some(row) = query_raw(&conn, &sql, [handle])?.first() {
            let player = PlayerRow::from_raw(row)
                .into_player()
                .ok_or(StoreError::Malformed("users"))?;
            if has_username && row.non_empty("username").is_none() {
                RowWriter::new("users", &self.columns)
                    .set("username", handle.to_string())
                    .update(&conn, "id = ?1", vec![Value::Integer(player.id.0)])?;
                tracing::debug!(player_id = player.id.0, handle, "backfilled player handle");
            }
            return Ok(player);
        }

        let name = if name.trim().is_empty() { handle } else { name };
        let id = RowWriter::new("users", &self.columns)
            .set("username", handle.to_string())
            .set("name", name.to_string())
            .set("idea", idea.to_string())
            .stamp("created_at")
            .insert(&conn)?;

        tracing::info!(player_id = id, handle, "created player");
        Ok(Player {
            id: PlayerId(id),
            handle: handle.to_string(),
            name: name.to_string(),
            idea: idea.to_string(),
        })
    }

    /// Load a player by id.
    pub fn load_player(&self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        let conn = self.conn();
        let rows = query_raw(&conn, "SELECT * FROM users WHERE id = ?1", [id.0])?;
        Ok(rows
            .first()
            .and_then(|row| PlayerRow::from_raw(row).into_player()))
    }

    /// Insert a new run with initial meters and return its id.
    pub fn insert_run(
        &self,
        player: PlayerId,
        venture: &str,
        mode: GameMode,
    ) -> Result<RunId, StoreError> {
        let meters = Meters::initial();
        let conn = self.conn();
        let id = RowWriter::new("games", &self.columns)
            .set("user_id", player.0)
            .require("startup_name", venture.to_string())?
            .require("budget", meters.capital)?
            .require("reputation", meters.reputation)?
            .require("morale", meters.morale)?
            .require("turn", 1i64)?
            .set("score", 0i64)
            .set("mode", mode.as_str().to_string())
            .set("is_game_over", 0i64)
            .stamp("created_at")
            .stamp("updated_at")
            .insert(&conn)?;

        tracing::info!(run_id = id, player_id = %player, venture, %mode, "started run");
        Ok(RunId(id))
    }

    /// Load a run, or `None` if no such run exists.
    pub fn load_run(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        let conn = self.conn();
        let rows = query_raw(&conn, "SELECT * FROM games WHERE id = ?1", [id.0])?;
        match rows.first() {
            Some(row) => RunRow::from_raw(row)
                .into_run()
                .map(Some)
                .ok_or(StoreError::Malformed("games")),
            None => Ok(None),
        }
    }

    /// Change a run's mode. Returns false if the run does not exist.
    pub fn set_mode(&self, id: RunId, mode: GameMode) -> Result<bool, StoreError> {
        let conn = self.conn();
        let changed = RowWriter::new("games", &self.columns)
            .require("mode", mode.as_str().to_string())?
            .stamp("updated_at")
            .update(&conn, "id = ?1", vec![Value::Integer(id.0)])?;
        Ok(changed > 0)
    }

    /// Flag a run as over with the given reasons.
    pub fn mark_game_over(&self, id: RunId, reasons: &[Meter]) -> Result<(), StoreError> {
        let conn = self.conn();
        RowWriter::new("games", &self.columns)
            .set("is_game_over", 1i64)
            .set("game_over_reason", join_reasons(reasons))
            .stamp("updated_at")
            .update(&conn, "id = ?1", vec![Value::Integer(id.0)])?;
        Ok(())
    }
}
