//! Turning model output into a usable event.
//!
//! Models wrap JSON in prose or code fences, misname fields, send numbers
//! as strings and ignore the requested ranges. Parsing is a two-step
//! ladder (strict, then the outermost `{...}` slice) followed by
//! validation that clamps every number and pads the option list.

use crate::config::ImpactBounds;
use crate::world::{clamp_risk, parse_risk, Impacts, OptionDraft, RISK_DEFAULT};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Number of options every event carries.
pub const OPTION_COUNT: usize = 3;

/// Which step of the ladder produced the JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Strict,
    Embedded,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object in reply")]
    NoObject,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why parsed content was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("title is empty")]
    EmptyTitle,

    #[error("description is empty")]
    EmptyDescription,

    #[error("only {0} options present")]
    TooFewOptions(usize),
}

/// Scenario JSON as the model sent it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScenario {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "choices")]
    pub options: Vec<Value>,
}

/// Validated scenario content, not yet tied to a category.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioContent {
    pub title: String,
    pub description: String,
    pub options: Vec<OptionDraft>,
}

/// Parse a reply, first as a whole and then from its outermost braces.
pub fn parse_reply(text: &str) -> Result<(RawScenario, ParseStage), ParseError> {
    if let Ok(raw) = serde_json::from_str::<RawScenario>(text.trim()) {
        return Ok((raw, ParseStage::Strict));
    }

    let start = text.find('{').ok_or(ParseError::NoObject)?;
    let end = text.rfind('}').ok_or(ParseError::NoObject)?;
    if end <= start {
        return Err(ParseError::NoObject);
    }
    let raw = serde_json::from_str::<RawScenario>(&text[start..=end])?;
    Ok((raw, ParseStage::Embedded))
}

/// Validate parsed content, clamping numbers and padding to three options.
pub fn validate(raw: RawScenario, bounds: &ImpactBounds) -> Result<ScenarioContent, Rejection> {
    let title = clean(raw.title).ok_or(Rejection::EmptyTitle)?;
    let description = clean(raw.description).ok_or(Rejection::EmptyDescription)?;
    if raw.options.len() < OPTION_COUNT {
        return Err(Rejection::TooFewOptions(raw.options.len()));
    }

    let options = raw
        .options
        .iter()
        .filter_map(|value| option_from_value(value, bounds))
        .collect();

    Ok(ScenarioContent {
        title,
        description,
        options: finish_options(options, bounds),
    })
}

/// Clamp every option, keep the first three and pad with neutral ones.
pub fn finish_options(options: Vec<OptionDraft>, bounds: &ImpactBounds) -> Vec<OptionDraft> {
    let mut options: Vec<OptionDraft> = options
        .into_iter()
        .filter(|o| !o.text.trim().is_empty())
        .take(OPTION_COUNT)
        .map(|o| clamp_option(o, bounds))
        .collect();
    while options.len() < OPTION_COUNT {
        options.push(OptionDraft::neutral());
    }
    options
}

fn clamp_option(option: OptionDraft, bounds: &ImpactBounds) -> OptionDraft {
    OptionDraft {
        text: option.text.trim().to_string(),
        impacts: Impacts {
            capital: bounds.capital.clamp(option.impacts.capital),
            reputation: bounds.reputation.clamp(option.impacts.reputation),
            morale: bounds.morale.clamp(option.impacts.morale),
        },
        risk: clamp_risk(bounds.risk.clamp(i64::from(option.risk))),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

const TEXT_KEYS: [&str; 4] = ["text", "option", "label", "choice"];
const CAPITAL_KEYS: [&str; 5] = [
    "capital_impact",
    "cost_impact",
    "budget_impact",
    "cost",
    "capital",
];
const REPUTATION_KEYS: [&str; 2] = ["reputation_impact", "reputation"];
const MORALE_KEYS: [&str; 2] = ["morale_impact", "morale"];
const RISK_KEYS: [&str; 2] = ["risk_level", "risk"];

fn option_from_value(value: &Value, bounds: &ImpactBounds) -> Option<OptionDraft> {
    let Value::Object(map) = value else {
        return None;
    };
    let field = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k));

    let text = field(&TEXT_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let draft = OptionDraft {
        text,
        impacts: Impacts {
            capital: field(&CAPITAL_KEYS).map(coerce_int).unwrap_or(0),
            reputation: field(&REPUTATION_KEYS).map(coerce_int).unwrap_or(0),
            morale: field(&MORALE_KEYS).map(coerce_int).unwrap_or(0),
        },
        risk: field(&RISK_KEYS).map(coerce_risk).unwrap_or(RISK_DEFAULT),
    };
    Some(clamp_option(draft, bounds))
}

/// Read a number that may arrive as a float or as text like `"+150"`.
/// Anything else counts as zero.
fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim().trim_start_matches('+').replace([',', '$'], "");
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.round() as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn coerce_risk(value: &Value) -> u8 {
    match value {
        Value::String(s) => parse_risk(s).unwrap_or(RISK_DEFAULT),
        other => clamp_risk(coerce_int(other)),
    }
}
