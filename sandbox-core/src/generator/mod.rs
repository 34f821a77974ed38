//! Event and narration generation.
//!
//! The generator asks a [`TextService`] for a scenario, parses and
//! validates the reply, and falls back to built-in content whenever
//! anything goes wrong. Generation never fails: the worst case is a canned
//! event.
//!
//! ```text
//!   context ──► prompt ──► ModelLadder ──► parse ──► validate ──► EventDraft
//!                              │              │          │
//!                              └──────────────┴──────────┴──► fallback
//! ```

pub mod fallback;
pub mod models;
pub mod parse;
pub mod prompt;
pub mod service;

pub use models::{LadderFailure, ModelLadder};
pub use prompt::{NarrationContext, ScenarioContext};
pub use service::{ServiceError, TextService};

use crate::config::GeneratorConfig;
use crate::store::{Store, StoreError};
use crate::world::{Category, Event, EventDraft, Run};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where an event's content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Service { model: String },
    Fallback { reason: String },
}

/// A draft plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub draft: EventDraft,
    pub source: ContentSource,
}

/// Produces events and narration, with or without a text service.
pub struct ContentGenerator {
    service: Option<Arc<dyn TextService>>,
    ladder: ModelLadder,
    config: GeneratorConfig,
}

impl ContentGenerator {
    pub fn new(service: Option<Arc<dyn TextService>>, config: GeneratorConfig) -> Self {
        Self {
            service,
            ladder: ModelLadder::new(config.models.clone()),
            config,
        }
    }

    /// A generator that only uses built-in content.
    pub fn offline(config: GeneratorConfig) -> Self {
        Self::new(None, config)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn ladder(&self) -> &ModelLadder {
        &self.ladder
    }

    /// Whether generated content can currently be requested.
    pub fn service_available(&self) -> bool {
        self.service.is_some() && !self.ladder.is_disabled()
    }

    /// Produce an event draft for the given context.
    pub async fn draft(&self, ctx: &ScenarioContext<'_>) -> Generated {
        match self.try_service(ctx).await {
            Ok(generated) => generated,
            Err(reason) => {
                debug!(category = %ctx.category, turn = ctx.turn, %reason, "using built-in event");
                Generated {
                    draft: self.canned(ctx.category, ctx.turn),
                    source: ContentSource::Fallback { reason },
                }
            }
        }
    }

    /// Generate an event for `run` and store it as the run's pending event.
    pub async fn generate_event(
        &self,
        store: &Store,
        run: &Run,
        idea: &str,
        category: Category,
        recent_titles: &[String],
    ) -> Result<Event, StoreError> {
        let ctx = ScenarioContext {
            venture: &run.venture,
            idea,
            turn: run.turn,
            meters: run.meters,
            category,
            difficulty: category.difficulty(),
            recent_titles,
        };
        let generated = self.draft(&ctx).await;
        let event = store.insert_event(run.id, run.turn, &generated.draft)?;

        match &generated.source {
            ContentSource::Service { model } => {
                info!(run_id = %run.id, event_id = %event.id, %category, model = %model, "generated event")
            }
            ContentSource::Fallback { .. } => {
                info!(run_id = %run.id, event_id = %event.id, %category, "served built-in event")
            }
        }
        Ok(event)
    }

    /// Describe the outcome of a decision. Falls back to a plain summary.
    pub async fn narrate(&self, ctx: &NarrationContext<'_>) -> String {
        let Some(service) = self.service.as_deref() else {
            return prompt::fallback_narration(&ctx.after);
        };
        let prompt = prompt::narration_prompt(ctx);
        match self
            .ladder
            .call(
                service,
                &prompt,
                self.config.narrative_temperature,
                self.config.request_timeout,
            )
            .await
        {
            Ok((_, text)) => text.trim().to_string(),
            Err(failure) => {
                debug!(%failure, "narration unavailable");
                prompt::fallback_narration(&ctx.after)
            }
        }
    }

    async fn try_service(&self, ctx: &ScenarioContext<'_>) -> Result<Generated, String> {
        let service = self
            .service
            .as_deref()
            .ok_or_else(|| "no text service configured".to_string())?;

        let prompt = prompt::scenario_prompt(ctx, &self.config.impact_bounds);
        let (model, text) = self
            .ladder
            .call(
                service,
                &prompt,
                self.config.scenario_temperature,
                self.config.request_timeout,
            )
            .await
            .map_err(|failure| {
                match &failure {
                    LadderFailure::Disabled => debug!(error = %failure, "text service off"),
                    _ => warn!(error = %failure, "text service unavailable; using built-in event"),
                }
                failure.to_string()
            })?;

        let (raw, stage) = parse::parse_reply(&text).map_err(|e| {
            warn!(model = %model, error = %e, "could not parse generated scenario");
            e.to_string()
        })?;
        let content = parse::validate(raw, &self.config.impact_bounds).map_err(|e| {
            warn!(model = %model, reason = %e, "generated scenario rejected");
            e.to_string()
        })?;
        debug!(model = %model, ?stage, "parsed generated scenario");

        Ok(Generated {
            draft: EventDraft {
                category: ctx.category,
                difficulty: ctx.difficulty,
                title: content.title,
                description: content.description,
                options: content.options,
            },
            source: ContentSource::Service { model },
        })
    }

    fn canned(&self, category: Category, turn: i64) -> EventDraft {
        let event = fallback::pick(category, turn);
        let options = event.options.iter().map(|o| o.to_draft()).collect();
        EventDraft {
            category,
            difficulty: category.difficulty(),
            title: event.title.to_string(),
            description: event.description.to_string(),
            options: parse::finish_options(options, &self.config.impact_bounds),
        }
    }
}
