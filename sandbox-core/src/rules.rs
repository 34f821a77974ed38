//! Impact resolution and game-over rules.
//!
//! Resolution is pure: given an option's raw impacts, the run's mode and
//! its current meters, it produces the applied deltas and the new meters.
//! Nothing here touches storage.

use crate::world::{Impacts, Meter, Meters, ModeMultipliers};

/// Result of applying an option to a run's meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Mode-scaled deltas, rounded but not clamped.
    pub applied: Impacts,
    /// Meters after applying the deltas, clamped into range.
    pub meters: Meters,
}

/// Scale a raw impact by a multiplier, rounding half away from zero.
pub fn scale(raw: i64, multiplier: f64) -> i64 {
    (raw as f64 * multiplier).round() as i64
}

/// Apply `impacts` to `current` under the given mode multipliers.
pub fn resolve(impacts: &Impacts, multipliers: &ModeMultipliers, current: &Meters) -> Resolution {
    let applied = Impacts {
        capital: scale(impacts.capital, multipliers.capital),
        reputation: scale(impacts.reputation, multipliers.reputation),
        morale: scale(impacts.morale, multipliers.morale),
    };

    let meters = Meters {
        capital: current.capital.saturating_add(applied.capital),
        reputation: current.reputation.saturating_add(applied.reputation),
        morale: current.morale.saturating_add(applied.morale),
    }
    .clamped();

    Resolution { applied, meters }
}

/// Meters at or below their floor, in reporting order.
pub fn failed_meters(meters: &Meters) -> Vec<Meter> {
    Meter::ALL
        .into_iter()
        .filter(|m| meters.get(*m) <= m.range().floor)
        .collect()
}

/// Score earned for one resolved turn.
///
/// Surviving a turn is worth 10; reputation and morale gains add one point
/// each, and every 10 capital adds one. The total never goes below zero.
pub fn turn_score(applied: &Impacts) -> i64 {
    let raw = 10 + applied.reputation + applied.morale + applied.capital / 10;
    raw.max(0)
}

/// Join reasons for storage (`CAPITAL,MORALE`).
pub fn join_reasons(reasons: &[Meter]) -> String {
    reasons
        .iter()
        .map(|m| m.reason())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse stored reasons, skipping anything unrecognised.
pub fn parse_reasons(stored: &str) -> Vec<Meter> {
    let mut reasons: Vec<Meter> = stored
        .split([',', ';', ' '])
        .filter_map(Meter::from_reason)
        .collect();
    reasons.dedup();
    reasons
}
