//! Prompt construction.

use crate::config::ImpactBounds;
use crate::world::{Category, Difficulty, Impacts, Meters};

/// State described to the model when asking for a new event.
#[derive(Debug, Clone)]
pub struct ScenarioContext<'a> {
    pub venture: &'a str,
    pub idea: &'a str,
    pub turn: i64,
    pub meters: Meters,
    pub category: Category,
    pub difficulty: Difficulty,
    pub recent_titles: &'a [String],
}

/// What happened on a turn, for the outcome narration.
#[derive(Debug, Clone)]
pub struct NarrationContext<'a> {
    pub venture: &'a str,
    pub event_title: &'a str,
    pub event_description: &'a str,
    pub option_text: &'a str,
    pub applied: Impacts,
    pub before: Meters,
    pub after: Meters,
}

pub fn scenario_prompt(ctx: &ScenarioContext<'_>, bounds: &ImpactBounds) -> String {
    let recent = if ctx.recent_titles.is_empty() {
        "none yet".to_string()
    } else {
        ctx.recent_titles.join("; ")
    };
    let idea = if ctx.idea.trim().is_empty() {
        String::new()
    } else {
        format!("Idea: {}\n", ctx.idea.trim())
    };

    format!(
        r#"You design scenarios for a startup management game. Write the next scenario for this company.

Startup: {venture}
{idea}Turn: {turn}
Capital: ${capital}
Reputation: {reputation}/100
Team morale: {morale}/100

Scenario type: {category} ({brief})
Difficulty: {difficulty}
Recent scenarios, do not repeat them: {recent}

Reply with JSON only, no commentary, in exactly this shape with exactly 3 options:
{{
  "title": "short title",
  "description": "two or three sentences describing the situation",
  "options": [
    {{"text": "what the founder does", "capital_impact": -100, "reputation_impact": 5, "morale_impact": -3, "risk_level": 2}}
  ]
}}

capital_impact is between {cap_min} and {cap_max}. reputation_impact and morale_impact are between {rep_min} and {rep_max}. risk_level is between {risk_min} (safe) and {risk_max} (reckless). Make the options meaningfully different."#,
        venture = ctx.venture,
        idea = idea,
        turn = ctx.turn,
        capital = ctx.meters.capital,
        reputation = ctx.meters.reputation,
        morale = ctx.meters.morale,
        category = ctx.category,
        brief = ctx.category.brief(),
        difficulty = ctx.difficulty,
        recent = recent,
        cap_min = bounds.capital.min,
        cap_max = bounds.capital.max,
        rep_min = bounds.reputation.min.min(bounds.morale.min),
        rep_max = bounds.reputation.max.max(bounds.morale.max),
        risk_min = bounds.risk.min,
        risk_max = bounds.risk.max,
    )
}

pub fn narration_prompt(ctx: &NarrationContext<'_>) -> String {
    format!(
        "You narrate a startup management game. In three or four vivid sentences, describe what happened \
         after the founder of {venture} faced \"{title}\" ({description}) and chose: \"{choice}\".\n\n\
         Effects: capital {capital:+}, reputation {reputation:+}, morale {morale:+}.\n\
         Capital went from ${cap_before} to ${cap_after}, reputation from {rep_before} to {rep_after}, \
         morale from {mor_before} to {mor_after}.\n\n\
         Reply with the narration only.",
        venture = ctx.venture,
        title = ctx.event_title,
        description = ctx.event_description,
        choice = ctx.option_text,
        capital = ctx.applied.capital,
        reputation = ctx.applied.reputation,
        morale = ctx.applied.morale,
        cap_before = ctx.before.capital,
        cap_after = ctx.after.capital,
        rep_before = ctx.before.reputation,
        rep_after = ctx.after.reputation,
        mor_before = ctx.before.morale,
        mor_after = ctx.after.morale,
    )
}

/// Narration used when the service is unavailable.
pub fn fallback_narration(after: &Meters) -> String {
    format!(
        "Decision applied. Capital: ${}, Reputation: {}%, Morale: {}%",
        after.capital, after.reputation, after.morale
    )
}
