//! Core simulation types.
//!
//! Players own runs; each run advances through turns, and every turn
//! presents an [`Event`] with exactly three [`EventOption`]s. Choosing an
//! option moves the three bounded [`Meters`] and appends a [`TurnRecord`].

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Row id of a player.
    PlayerId
);
row_id!(
    /// Row id of a run.
    RunId
);
row_id!(
    /// Row id of a generated event.
    EventId
);
row_id!(
    /// Row id of an event option.
    OptionId
);
row_id!(
    /// Row id of a turn record.
    TurnRecordId
);

// ============================================================================
// Meters
// ============================================================================

/// Starting capital for a new run.
pub const INITIAL_CAPITAL: i64 = 1000;
/// Starting reputation for a new run.
pub const INITIAL_REPUTATION: i64 = 50;
/// Starting morale for a new run.
pub const INITIAL_MORALE: i64 = 80;

/// Highest capital a run can hold.
pub const CAPITAL_MAX: i64 = 5000;

/// One of the three bounded resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Meter {
    Capital,
    Reputation,
    Morale,
}

impl Meter {
    /// All meters, in reporting order.
    pub const ALL: [Meter; 3] = [Meter::Capital, Meter::Reputation, Meter::Morale];

    /// Closed range this meter is kept in.
    pub fn range(self) -> MeterRange {
        match self {
            Meter::Capital => MeterRange {
                floor: 0,
                ceiling: CAPITAL_MAX,
            },
            Meter::Reputation | Meter::Morale => MeterRange {
                floor: 0,
                ceiling: 100,
            },
        }
    }

    /// Name used in game-over reasons.
    pub fn reason(self) -> &'static str {
        match self {
            Meter::Capital => "CAPITAL",
            Meter::Reputation => "REPUTATION",
            Meter::Morale => "MORALE",
        }
    }

    /// Parse a game-over reason name (case-insensitive).
    pub fn from_reason(reason: &str) -> Option<Meter> {
        match reason.trim().to_ascii_uppercase().as_str() {
            "CAPITAL" | "BUDGET" => Some(Meter::Capital),
            "REPUTATION" => Some(Meter::Reputation),
            "MORALE" => Some(Meter::Morale),
            _ => None,
        }
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Closed range `[floor, ceiling]` of a meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterRange {
    pub floor: i64,
    pub ceiling: i64,
}

impl MeterRange {
    pub fn clamp(self, value: i64) -> i64 {
        value.clamp(self.floor, self.ceiling)
    }
}

/// Current values of the three meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meters {
    pub capital: i64,
    pub reputation: i64,
    pub morale: i64,
}

impl Meters {
    pub fn new(capital: i64, reputation: i64, morale: i64) -> Self {
        Self {
            capital,
            reputation,
            morale,
        }
    }

    /// Meters of a freshly started run.
    pub fn initial() -> Self {
        Self::new(INITIAL_CAPITAL, INITIAL_REPUTATION, INITIAL_MORALE)
    }

    pub fn get(&self, meter: Meter) -> i64 {
        match meter {
            Meter::Capital => self.capital,
            Meter::Reputation => self.reputation,
            Meter::Morale => self.morale,
        }
    }

    /// Copy with every meter clamped into its range.
    pub fn clamped(self) -> Self {
        Self {
            capital: Meter::Capital.range().clamp(self.capital),
            reputation: Meter::Reputation.range().clamp(self.reputation),
            morale: Meter::Morale.range().clamp(self.morale),
        }
    }
}

impl Default for Meters {
    fn default() -> Self {
        Self::initial()
    }
}

/// Signed per-meter amounts: raw option impacts or applied deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Impacts {
    pub capital: i64,
    pub reputation: i64,
    pub morale: i64,
}

impl Impacts {
    pub fn new(capital: i64, reputation: i64, morale: i64) -> Self {
        Self {
            capital,
            reputation,
            morale,
        }
    }

    pub fn get(&self, meter: Meter) -> i64 {
        match meter {
            Meter::Capital => self.capital,
            Meter::Reputation => self.reputation,
            Meter::Morale => self.morale,
        }
    }
}

// ============================================================================
// Game modes
// ============================================================================

/// Per-meter scaling applied to raw impacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeMultipliers {
    pub capital: f64,
    pub reputation: f64,
    pub morale: f64,
}

impl ModeMultipliers {
    pub fn get(&self, meter: Meter) -> f64 {
        match meter {
            Meter::Capital => self.capital,
            Meter::Reputation => self.reputation,
            Meter::Morale => self.morale,
        }
    }
}

impl Default for ModeMultipliers {
    fn default() -> Self {
        Self {
            capital: 1.0,
            reputation: 1.0,
            morale: 1.0,
        }
    }
}

/// Difficulty preset for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Classic,
    Hard,
    Easy,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::Hard => "hard",
            GameMode::Easy => "easy",
        }
    }

    /// Parse a stored mode; anything unrecognised is `Classic`.
    pub fn from_stored(value: &str) -> GameMode {
        match value.trim().to_ascii_lowercase().as_str() {
            "hard" => GameMode::Hard,
            "easy" => GameMode::Easy,
            _ => GameMode::Classic,
        }
    }

    pub fn multipliers(self) -> ModeMultipliers {
        match self {
            GameMode::Classic => ModeMultipliers::default(),
            GameMode::Hard => ModeMultipliers {
                capital: 1.2,
                reputation: 1.3,
                morale: 1.1,
            },
            GameMode::Easy => ModeMultipliers {
                capital: 0.8,
                reputation: 0.8,
                morale: 0.8,
            },
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event categories
// ============================================================================

/// Narrative and mechanical flavour of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Crisis,
    Opportunity,
    Normal,
    Dilemma,
    ExtremeCrisis,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Crisis,
        Category::Opportunity,
        Category::Normal,
        Category::Dilemma,
        Category::ExtremeCrisis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Crisis => "CRISIS",
            Category::Opportunity => "OPPORTUNITY",
            Category::Normal => "NORMAL",
            Category::Dilemma => "DILEMMA",
            Category::ExtremeCrisis => "EXTREME_CRISIS",
        }
    }

    /// Parse a category name in any case (`crisis`, `EXTREME_CRISIS`, ...).
    pub fn parse(value: &str) -> Option<Category> {
        let normalized = value.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
    }

    /// Difficulty tier implied by the category.
    pub fn difficulty(self) -> Difficulty {
        match self {
            Category::Crisis | Category::ExtremeCrisis => Difficulty::Hard,
            Category::Opportunity => Difficulty::Easy,
            Category::Normal | Category::Dilemma => Difficulty::Medium,
        }
    }

    /// One-line brief used when asking for content of this category.
    pub fn brief(self) -> &'static str {
        match self {
            Category::Crisis => {
                "a crisis that usually costs capital or reputation; the options are choices between bad and worse"
            }
            Category::Opportunity => {
                "a golden opportunity that can grow capital; at least one option must have a positive capital impact"
            }
            Category::Normal => "an everyday operational challenge",
            Category::Dilemma => "a difficult ethical or strategic dilemma with real trade-offs",
            Category::ExtremeCrisis => {
                "a severe, company-threatening crisis where every option hurts"
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Difficulty tier of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Numeric tier on the 1..=5 scale used by integer-typed stores.
    pub fn tier(self) -> i64 {
        match self {
            Difficulty::Easy => 2,
            Difficulty::Medium => 3,
            Difficulty::Hard => 4,
        }
    }

    pub fn from_tier(tier: i64) -> Difficulty {
        match tier {
            i64::MIN..=2 => Difficulty::Easy,
            3 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    /// Parse either a tier name or a numeric tier.
    pub fn parse(value: &str) -> Option<Difficulty> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "normal" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            other => other.parse::<i64>().ok().map(Difficulty::from_tier),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowest and highest risk tier of an option.
pub const RISK_MIN: u8 = 1;
pub const RISK_MAX: u8 = 5;
/// Risk tier used when none is known.
pub const RISK_DEFAULT: u8 = 3;

/// Parse a risk tier from a number or a `low|medium|high` label.
pub fn parse_risk(value: &str) -> Option<u8> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" => Some(2),
        "medium" | "moderate" => Some(3),
        "high" => Some(4),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| clamp_risk(v.round() as i64)),
    }
}

pub fn clamp_risk(value: i64) -> u8 {
    value.clamp(i64::from(RISK_MIN), i64::from(RISK_MAX)) as u8
}

// ============================================================================
// Entities
// ============================================================================

/// A person playing the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Unique handle the player signs in with.
    pub handle: String,
    pub name: String,
    /// Free-text description of the player's startup idea.
    pub idea: String,
}

/// One play-through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub player_id: Option<PlayerId>,
    pub venture: String,
    pub meters: Meters,
    /// Current turn, starting at 1.
    pub turn: i64,
    pub score: i64,
    pub mode: GameMode,
    pub game_over: bool,
    pub game_over_reasons: Vec<Meter>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A generated occurrence awaiting a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub run_id: RunId,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub turn: i64,
    pub options: Vec<EventOption>,
}

impl Event {
    pub fn option(&self, id: OptionId) -> Option<&EventOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// One selectable response to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOption {
    pub id: OptionId,
    pub event_id: EventId,
    pub text: String,
    pub impacts: Impacts,
    pub risk: u8,
}

/// Immutable audit entry for one resolved turn.
///
/// Titles and texts are copied at resolution time so the record stays
/// readable even if the event rows go away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub id: TurnRecordId,
    pub run_id: RunId,
    /// Turn number before resolution.
    pub turn: i64,
    pub event_id: Option<EventId>,
    pub option_id: Option<OptionId>,
    pub event_title: String,
    pub option_text: String,
    /// Mode-adjusted deltas that were applied.
    pub applied: Impacts,
    pub created_at: Option<String>,
}

/// An event that has been generated but not stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub category: Category,
    pub difficulty: Difficulty,
    pub title: String,
    pub description: String,
    pub options: Vec<OptionDraft>,
}

/// An option that has been generated but not stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDraft {
    pub text: String,
    pub impacts: Impacts,
    pub risk: u8,
}

impl OptionDraft {
    /// Filler option with no effect.
    pub fn neutral() -> Self {
        Self {
            text: "Hold steady and reassess".to_string(),
            impacts: Impacts::default(),
            risk: RISK_DEFAULT,
        }
    }
}
