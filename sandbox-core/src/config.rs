//! Engine configuration.

use crate::world::{Category, RISK_MAX, RISK_MIN};
use std::path::PathBuf;
use std::time::Duration;

/// Default database file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "startup.db";

/// Models tried, in order, until one answers.
pub const DEFAULT_MODELS: [&str; 3] = [
    "claude-sonnet-4-20250514",
    "claude-3-5-haiku-20241022",
    "claude-3-haiku-20240307",
];

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Closed integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn clamp(self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

/// Limits on raw option impacts accepted from generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpactBounds {
    pub capital: Bounds,
    pub reputation: Bounds,
    pub morale: Bounds,
    pub risk: Bounds,
}

impl Default for ImpactBounds {
    fn default() -> Self {
        Self {
            capital: Bounds::new(-1000, 2000),
            reputation: Bounds::new(-50, 50),
            morale: Bounds::new(-50, 50),
            risk: Bounds::new(i64::from(RISK_MIN), i64::from(RISK_MAX)),
        }
    }
}

/// Relative draw weight of each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryWeights {
    pub crisis: i32,
    pub opportunity: i32,
    pub normal: i32,
    pub dilemma: i32,
    pub extreme_crisis: i32,
}

impl CategoryWeights {
    pub fn get(&self, category: Category) -> i32 {
        match category {
            Category::Crisis => self.crisis,
            Category::Opportunity => self.opportunity,
            Category::Normal => self.normal,
            Category::Dilemma => self.dilemma,
            Category::ExtremeCrisis => self.extreme_crisis,
        }
    }

    pub fn bump(&mut self, category: Category, amount: i32) {
        let slot = match category {
            Category::Crisis => &mut self.crisis,
            Category::Opportunity => &mut self.opportunity,
            Category::Normal => &mut self.normal,
            Category::Dilemma => &mut self.dilemma,
            Category::ExtremeCrisis => &mut self.extreme_crisis,
        };
        *slot = slot.saturating_add(amount);
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            crisis: 3,
            opportunity: 2,
            normal: 3,
            dilemma: 2,
            extreme_crisis: 1,
        }
    }
}

/// Base weights plus the state thresholds that shift them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorConfig {
    pub base: CategoryWeights,
    /// Capital strictly below this adds crisis weight.
    pub low_capital: i64,
    /// Reputation strictly above this adds opportunity weight.
    pub high_reputation: i64,
    /// Morale strictly below this adds crisis weight.
    pub low_morale: i64,
    /// Turns strictly after this add extreme-crisis weight.
    pub late_turn: i64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            base: CategoryWeights::default(),
            low_capital: 300,
            high_reputation: 75,
            low_morale: 40,
            late_turn: 10,
        }
    }
}

/// Settings for content generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Candidate models, most preferred first.
    pub models: Vec<String>,
    /// Upper bound on a single service call.
    pub request_timeout: Duration,
    pub scenario_temperature: f32,
    pub narrative_temperature: f32,
    pub impact_bounds: ImpactBounds,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            scenario_temperature: 0.7,
            narrative_temperature: 0.9,
            impact_bounds: ImpactBounds::default(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    pub generator: GeneratorConfig,
    pub selector: SelectorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            generator: GeneratorConfig::default(),
            selector: SelectorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Build a config from defaults overridden by environment variables.
    ///
    /// - `STARTUP_DB_PATH`: database file
    /// - `SANDBOX_MODEL`: preferred model, tried before the defaults
    /// - `SANDBOX_TIMEOUT_SECS`: per-call timeout in seconds
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = env_value("STARTUP_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(model) = env_value("SANDBOX_MODEL") {
            config = config.with_preferred_model(model);
        }
        if let Some(secs) = env_value("SANDBOX_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    config.generator.request_timeout = Duration::from_secs(secs);
                }
                _ => tracing::warn!(value = %secs, "ignoring invalid SANDBOX_TIMEOUT_SECS"),
            }
        }

        config
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Put a model at the front of the candidate list.
    pub fn with_preferred_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.generator.models.retain(|m| *m != model);
        self.generator.models.insert(0, model);
        self
    }

    /// Replace the candidate list entirely.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.generator.models = models;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.generator.request_timeout = timeout;
        self
    }

    pub fn with_selector(mut self, selector: SelectorConfig) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_impact_bounds(mut self, bounds: ImpactBounds) -> Self {
        self.generator.impact_bounds = bounds;
        self
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
