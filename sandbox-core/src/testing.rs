//! Testing utilities.
//!
//! - [`ScriptedTextService`]: a deterministic [`TextService`] that returns
//!   scripted replies and records every call
//! - [`offline_engine`] / [`scripted_engine`]: engines on an in-memory store

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineError};
use crate::generator::{ServiceError, TextService};
use crate::store::Store;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(ServiceError),
    /// Never answer; use with a short timeout.
    Stall,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCall {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
}

/// A text service with scripted behaviour.
///
/// Replies are chosen in this order: a per-model reply if one is set, then
/// the next queued reply, then the default reply.
#[derive(Debug)]
pub struct ScriptedTextService {
    queue: Mutex<VecDeque<Reply>>,
    per_model: HashMap<String, Reply>,
    default: Reply,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl Default for ScriptedTextService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTextService {
    /// A service that fails every call unless told otherwise.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            per_model: HashMap::new(),
            default: Reply::Fail(ServiceError::Other("no scripted reply".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A service whose every call fails with a network error.
    pub fn unreachable() -> Self {
        Self::new().with_default(Reply::Fail(ServiceError::Other(
            "connection refused".to_string(),
        )))
    }

    /// A service that answers every call with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new().with_default(Reply::text(text))
    }

    pub fn with_default(mut self, reply: Reply) -> Self {
        self.default = reply;
        self
    }

    /// Always answer calls for `model` with `reply`.
    pub fn with_model_reply(mut self, model: impl Into<String>, reply: Reply) -> Self {
        self.per_model.insert(model.into(), reply);
        self
    }

    /// Queue replies to be used once each, in order.
    pub fn with_replies(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.lock_queue().extend(replies);
        self
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Models called so far, in order.
    pub fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Reply>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_reply(&self, model: &str) -> Reply {
        if let Some(reply) = self.per_model.get(model) {
            return reply.clone();
        }
        self.lock_queue()
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl TextService for ScriptedTextService {
    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, ServiceError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ScriptedCall {
                model: model.to_string(),
                prompt: prompt.to_string(),
                temperature,
            });

        match self.next_reply(model) {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
            Reply::Stall => {
                std::future::pending::<()>().await;
                Err(ServiceError::Timeout)
            }
        }
    }
}

/// An engine with no text service on a fresh in-memory database.
pub fn offline_engine() -> Result<Engine, EngineError> {
    let store = Store::open_in_memory()?;
    Ok(Engine::with_store(store, None, EngineConfig::default()))
}

/// An engine backed by `service` on a fresh in-memory database.
pub fn scripted_engine(service: Arc<ScriptedTextService>) -> Result<Engine, EngineError> {
    let store = Store::open_in_memory()?;
    Ok(Engine::with_store(store, Some(service), EngineConfig::default()))
}

/// Canned scenario JSON with three options.
pub fn scenario_json(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "description": format!("{title} lands on the founder's desk."),
        "options": [
            {"text": "Spend to fix it", "capital_impact": -200, "reputation_impact": 5, "morale_impact": 2, "risk_level": 2},
            {"text": "Ignore it", "capital_impact": 0, "reputation_impact": -10, "morale_impact": -5, "risk_level": 4},
            {"text": "Sell the idea to a partner", "capital_impact": 300, "reputation_impact": -2, "morale_impact": -3, "risk_level": 3}
        ]
    })
    .to_string()
}
