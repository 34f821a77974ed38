//! Model fallback.
//!
//! Candidates are tried in order until one returns text. A model that
//! worked is remembered and tried first next time. An authorization
//! failure switches the service off for the rest of the process.

use super::service::{ServiceError, TextService};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why no text came back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LadderFailure {
    /// The service was switched off by an earlier authorization failure.
    #[error("text service disabled")]
    Disabled,
    /// This call hit an authorization failure and switched the service off.
    #[error("text service rejected credentials: {0}")]
    Unauthorized(String),
    /// Every candidate was missing or returned nothing.
    #[error("no candidate model returned text")]
    Exhausted,
    /// A candidate failed in a way another model would not fix.
    #[error("text service call failed: {0}")]
    Aborted(ServiceError),
}

#[derive(Debug, Default)]
struct LadderState {
    working: Option<String>,
    disabled: bool,
}

/// Ordered model candidates plus what has been learned about them.
#[derive(Debug)]
pub struct ModelLadder {
    candidates: Vec<String>,
    state: Mutex<LadderState>,
}

impl ModelLadder {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            state: Mutex::new(LadderState::default()),
        }
    }

    /// Model that answered most recently, if any.
    pub fn working_model(&self) -> Option<String> {
        self.state().working.clone()
    }

    pub fn is_disabled(&self) -> bool {
        self.state().disabled
    }

    /// Candidates in the order they will be tried.
    pub fn ordered(&self) -> Vec<String> {
        let working = self.working_model();
        let mut order: Vec<String> = working.iter().cloned().collect();
        order.extend(
            self.candidates
                .iter()
                .filter(|m| Some(*m) != working.as_ref())
                .cloned(),
        );
        order
    }

    /// Try each candidate until one returns non-empty text.
    ///
    /// Each call is bounded by `timeout`; a timeout ends the attempt.
    /// Returns the model that answered and its text.
    pub async fn call(
        &self,
        service: &dyn TextService,
        prompt: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<(String, String), LadderFailure> {
        if self.is_disabled() {
            return Err(LadderFailure::Disabled);
        }

        for model in self.ordered() {
            let outcome = tokio::time::timeout(
                timeout,
                service.generate_text(&model, prompt, temperature),
            )
            .await
            .unwrap_or(Err(ServiceError::Timeout));

            match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    self.remember(&model);
                    return Ok((model, text));
                }
                Ok(_) => debug!(model = %model, "empty reply, trying next model"),
                Err(ServiceError::ModelNotFound(message)) => {
                    debug!(model = %model, %message, "model not available, trying next model");
                }
                Err(ServiceError::Auth(message)) => {
                    warn!(model = %model, %message, "text service rejected credentials; disabling it");
                    self.state().disabled = true;
                    return Err(LadderFailure::Unauthorized(message));
                }
                Err(err) => {
                    warn!(model = %model, error = %err, "text service call failed");
                    return Err(LadderFailure::Aborted(err));
                }
            }
        }

        Err(LadderFailure::Exhausted)
    }

    fn remember(&self, model: &str) {
        let mut state = self.state();
        if state.working.as_deref() != Some(model) {
            info!(model, "using text model");
            state.working = Some(model.to_string());
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LadderState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedTextService};

    fn ladder() -> ModelLadder {
        ModelLadder::new(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_skips_missing_models() {
        let service = ScriptedTextService::new()
            .with_model_reply("a", Reply::Fail(ServiceError::ModelNotFound("a".into())))
            .with_model_reply("b", Reply::text("hello"));
        let ladder = ladder();

        let (model, text) = ladder.call(&service, "p", 0.5, TIMEOUT).await.unwrap();

        assert_eq!((model.as_str(), text.as_str()), ("b", "hello"));
        assert_eq!(ladder.working_model().as_deref(), Some("b"));
        assert_eq!(service.models_called(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_working_model_tried_first() {
        let service = ScriptedTextService::new()
            .with_model_reply("a", Reply::Fail(ServiceError::ModelNotFound("a".into())))
            .with_model_reply("b", Reply::text("hi"));
        let ladder = ladder();

        ladder.call(&service, "p", 0.5, TIMEOUT).await.unwrap();
        ladder.call(&service, "p", 0.5, TIMEOUT).await.unwrap();

        assert_eq!(service.models_called(), vec!["a", "b", "b"]);
        assert_eq!(ladder.ordered(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_empty_reply_moves_on() {
        let service = ScriptedTextService::new()
            .with_model_reply("a", Reply::text("   "))
            .with_model_reply("b", Reply::text("ok"));

        let (model, _) = ladder().call(&service, "p", 0.5, TIMEOUT).await.unwrap();
        assert_eq!(model, "b");
    }

    #[tokio::test]
    async fn test_auth_failure_disables_service() {
        let service = ScriptedTextService::new().with_default(Reply::Fail(ServiceError::Auth(
            "invalid x-api-key".into(),
        )));
        let ladder = ladder();

        let first = ladder.call(&service, "p", 0.5, TIMEOUT).await;
        assert!(matches!(first, Err(LadderFailure::Unauthorized(_))));
        assert!(ladder.is_disabled());

        let second = ladder.call(&service, "p", 0.5, TIMEOUT).await;
        assert_eq!(second, Err(LadderFailure::Disabled));
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_other_error_aborts_without_trying_more() {
        let service = ScriptedTextService::unreachable();

        let result = ladder().call(&service, "p", 0.5, TIMEOUT).await;

        assert!(matches!(result, Err(LadderFailure::Aborted(ServiceError::Other(_)))));
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_all_missing_is_exhausted() {
        let service = ScriptedTextService::new()
            .with_default(Reply::Fail(ServiceError::ModelNotFound("gone".into())));

        let result = ladder().call(&service, "p", 0.5, TIMEOUT).await;

        assert_eq!(result, Err(LadderFailure::Exhausted));
        assert_eq!(service.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_stalled_call_times_out() {
        let service = ScriptedTextService::new().with_default(Reply::Stall);

        let result = ladder()
            .call(&service, "p", 0.5, Duration::from_millis(50))
            .await;

        assert_eq!(result, Err(LadderFailure::Aborted(ServiceError::Timeout)));
    }
}
