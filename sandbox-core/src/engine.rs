//! Engine - the primary public API for playing a run.
//!
//! The engine wraps the store, the content generator and the rules into
//! turn-level operations: start a run, show the current event, resolve a
//! choice, move on, and read back the timeline.

use crate::config::EngineConfig;
use crate::generator::parse::OPTION_COUNT;
use crate::generator::{ContentGenerator, NarrationContext, TextService};
use crate::rules::{self, join_reasons};
use crate::selector;
use crate::store::{Store, StoreError, TurnEntry};
use crate::world::{
    Event, GameMode, Impacts, Meter, OptionId, Run, RunId, TurnRecord,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("game over ({})", join_reasons(.reasons))]
    GameOver { reasons: Vec<Meter> },

    #[error("turn was not applied: {0}")]
    TurnNotApplied(#[source] StoreError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Parameters for a new run.
#[derive(Debug, Clone)]
pub struct RunSetup {
    pub handle: String,
    pub venture: String,
    pub name: Option<String>,
    pub idea: String,
    pub mode: GameMode,
}

impl RunSetup {
    pub fn new(handle: impl Into<String>, venture: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            venture: venture.into(),
            name: None,
            idea: String::new(),
            mode: GameMode::Classic,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_idea(mut self, idea: impl Into<String>) -> Self {
        self.idea = idea.into();
        self
    }

    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }
}

/// What the player sees at the start of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnView {
    Active { run: Run, event: Event },
    /// `reasons` is empty when the run was ended without a recorded reason
    /// and none of its meters has failed.
    GameOver { run: Run, reasons: Vec<Meter> },
}

impl TurnView {
    pub fn run(&self) -> &Run {
        match self {
            TurnView::Active { run, .. } | TurnView::GameOver { run, .. } => run,
        }
    }

    pub fn event(&self) -> Option<&Event> {
        match self {
            TurnView::Active { event, .. } => Some(event),
            TurnView::GameOver { .. } => None,
        }
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self, TurnView::GameOver { .. })
    }
}

/// Result of resolving a choice.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOutcome {
    /// Prose describing what happened.
    pub narrative: String,
    /// The run after the turn was applied.
    pub run: Run,
    /// Mode-adjusted deltas that were applied.
    pub applied: Impacts,
    pub record: TurnRecord,
    /// Meters that ended the run on this turn, if any.
    pub game_over: Vec<Meter>,
}

/// The simulation engine.
pub struct Engine {
    store: Store,
    generator: ContentGenerator,
    config: EngineConfig,
    rng: Mutex<StdRng>,
}

impl Engine {
    /// Open the configured database and use `service` for content.
    pub fn open(
        config: EngineConfig,
        service: Option<Arc<dyn TextService>>,
    ) -> Result<Self, EngineError> {
        let store = Store::open(&config.db_path)?;
        Ok(Self::with_store(store, service, config))
    }

    /// Configure from the environment.
    ///
    /// Uses `ANTHROPIC_API_KEY` for generated content when it is set and
    /// built-in content otherwise.
    pub fn from_env() -> Result<Self, EngineError> {
        let config = EngineConfig::from_env();
        let service: Option<Arc<dyn TextService>> = match textgen::Client::from_env() {
            Ok(client) => Some(Arc::new(
                client.with_timeout(config.generator.request_timeout),
            )),
            Err(e) => {
                info!(reason = %e, "text service not configured; using built-in events");
                None
            }
        };
        Self::open(config, service)
    }

    /// Build an engine around an already-open store.
    pub fn with_store(
        store: Store,
        service: Option<Arc<dyn TextService>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            generator: ContentGenerator::new(service, config.generator.clone()),
            store,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use a fixed seed for category selection.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn generator(&self) -> &ContentGenerator {
        &self.generator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a classic-mode run for `handle`.
    pub async fn start_run(&self, handle: &str, venture: &str) -> Result<RunId, EngineError> {
        self.start_run_with(RunSetup::new(handle, venture)).await
    }

    /// Start a run with full setup.
    pub async fn start_run_with(&self, setup: RunSetup) -> Result<RunId, EngineError> {
        let handle = setup.handle.trim();
        let venture = setup.venture.trim();
        if handle.is_empty() {
            return Err(EngineError::InvalidInput("handle is empty".to_string()));
        }
        if venture.is_empty() {
            return Err(EngineError::InvalidInput("venture name is empty".to_string()));
        }

        let name = setup.name.as_deref().unwrap_or("").trim();
        let player = self
            .store
            .find_or_create_player(handle, name, setup.idea.trim())?;
        Ok(self.store.insert_run(player.id, venture, setup.mode)?)
    }

    /// Load a run.
    pub fn run(&self, id: RunId) -> Result<Run, EngineError> {
        self.store
            .load_run(id)?
            .ok_or_else(|| EngineError::NotFound(format!("run {id}")))
    }

    /// Change the mode of a run. Applies from the next resolution on.
    pub fn set_mode(&self, id: RunId, mode: GameMode) -> Result<Run, EngineError> {
        if !self.store.set_mode(id, mode)? {
            return Err(EngineError::NotFound(format!("run {id}")));
        }
        info!(run_id = %id, %mode, "changed mode");
        self.run(id)
    }

    /// Meters that have ended the run, flagging it if not yet flagged.
    ///
    /// Empty while the run is still going, and also for a run that was
    /// ended without a recorded reason while its meters are healthy.
    pub fn check_game_over(&self, id: RunId) -> Result<Vec<Meter>, EngineError> {
        let mut run = self.run(id)?;
        Ok(self.game_over_reasons(&mut run)?.unwrap_or_default())
    }

    /// The event awaiting a decision, generating one if needed.
    pub async fn current_event(&self, id: RunId) -> Result<TurnView, EngineError> {
        let mut run = self.run(id)?;
        if let Some(reasons) = self.game_over_reasons(&mut run)? {
            return Ok(TurnView::GameOver { run, reasons });
        }

        if let Some(event) = self.store.pending_event(run.id, run.turn)? {
            if event.options.len() >= OPTION_COUNT {
                return Ok(TurnView::Active { run, event });
            }
            warn!(
                run_id = %run.id,
                event_id = %event.id,
                options = event.options.len(),
                "pending event is incomplete; generating a new one"
            );
        }

        let event = self.generate_event(&run).await?;
        Ok(TurnView::Active { run, event })
    }

    /// Generate a fresh event for the run's current turn.
    ///
    /// The new event replaces any earlier one as the pending event.
    pub async fn advance_turn(&self, id: RunId) -> Result<TurnView, EngineError> {
        let mut run = self.run(id)?;
        if let Some(reasons) = self.game_over_reasons(&mut run)? {
            return Ok(TurnView::GameOver { run, reasons });
        }
        let event = self.generate_event(&run).await?;
        Ok(TurnView::Active { run, event })
    }

    /// Apply the chosen option of the pending event.
    pub async fn resolve_choice(
        &self,
        id: RunId,
        option: OptionId,
    ) -> Result<ChoiceOutcome, EngineError> {
        let mut run = self.run(id)?;
        if let Some(reasons) = self.game_over_reasons(&mut run)? {
            return Err(EngineError::GameOver { reasons });
        }

        let event = self
            .store
            .pending_event(run.id, run.turn)?
            .ok_or_else(|| EngineError::NotFound(format!("pending event for run {id}")))?;
        let chosen = event
            .option(option)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("option {option} of event {}", event.id)))?;

        let resolution = rules::resolve(&chosen.impacts, &run.mode.multipliers(), &run.meters);
        let failed = rules::failed_meters(&resolution.meters);
        let entry = TurnEntry {
            run: run.id,
            turn: run.turn,
            event: event.id,
            event_title: event.title.clone(),
            option: chosen.id,
            option_text: chosen.text.clone(),
            applied: resolution.applied,
            meters: resolution.meters,
            score_gain: rules::turn_score(&resolution.applied),
            game_over: failed.clone(),
        };

        let record = self.store.append_turn(&entry).map_err(|e| {
            warn!(run_id = %id, error = %e, "turn not applied");
            EngineError::TurnNotApplied(e)
        })?;

        info!(
            run_id = %id,
            turn = run.turn,
            option_id = %chosen.id,
            capital = resolution.meters.capital,
            reputation = resolution.meters.reputation,
            morale = resolution.meters.morale,
            "resolved turn"
        );
        if !failed.is_empty() {
            info!(run_id = %id, reasons = %join_reasons(&failed), "run ended");
        }

        let updated = self.run(id)?;
        let narrative = self
            .generator
            .narrate(&NarrationContext {
                venture: &run.venture,
                event_title: &event.title,
                event_description: &event.description,
                option_text: &chosen.text,
                applied: resolution.applied,
                before: run.meters,
                after: resolution.meters,
            })
            .await;

        Ok(ChoiceOutcome {
            narrative,
            run: updated,
            applied: resolution.applied,
            record,
            game_over: failed,
        })
    }

    /// Every resolved turn of a run, oldest first.
    pub fn timeline(&self, id: RunId) -> Result<Vec<TurnRecord>, EngineError> {
        self.run(id)?;
        Ok(self.store.timeline(id)?)
    }

    /// Game-over reasons for `run`, or `None` if it is still going.
    ///
    /// A run whose meters have failed but is not yet flagged gets flagged
    /// here, and `run` is updated to match. Failed meters win over stored
    /// reasons; a flagged run with neither yields an empty list.
    fn game_over_reasons(&self, run: &mut Run) -> Result<Option<Vec<Meter>>, StoreError> {
        let failed = rules::failed_meters(&run.meters);
        if failed.is_empty() && !run.game_over {
            return Ok(None);
        }

        if !run.game_over {
            self.store.mark_game_over(run.id, &failed)?;
            info!(run_id = %run.id, reasons = %join_reasons(&failed), "run ended");
            run.game_over = true;
            run.game_over_reasons = failed.clone();
        } else if run.game_over_reasons.is_empty() && !failed.is_empty() {
            self.store.mark_game_over(run.id, &failed)?;
            debug!(run_id = %run.id, reasons = %join_reasons(&failed), "recorded missing game-over reason");
            run.game_over_reasons = failed.clone();
        }

        let reasons = if failed.is_empty() {
            run.game_over_reasons.clone()
        } else {
            failed
        };
        Ok(Some(reasons))
    }

    async fn generate_event(&self, run: &Run) -> Result<Event, EngineError> {
        let category = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            selector::select_category(&mut *rng, &self.config.selector, run.turn, &run.meters)
        };
        let recent = self.store.recent_titles(run.id)?;
        let idea = match run.player_id {
            Some(player) => self
                .store
                .load_player(player)?
                .map(|p| p.idea)
                .unwrap_or_default(),
            None => String::new(),
        };

        Ok(self
            .generator
            .generate_event(&self.store, run, &idea, category, &recent)
            .await?)
    }
}
