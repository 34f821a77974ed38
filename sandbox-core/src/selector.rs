//! Weighted choice of the next event category.
//!
//! Base weights are shifted by the run's state: a thin treasury or a
//! demoralised team makes crises likelier, a strong reputation brings
//! opportunities, and long runs start rolling extreme crises.

use crate::config::{CategoryWeights, SelectorConfig};
use crate::world::{Category, Meters};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Effective weights for a run at `turn` with `meters`.
pub fn weights_for(config: &SelectorConfig, turn: i64, meters: &Meters) -> CategoryWeights {
    let mut weights = config.base;

    if meters.capital < config.low_capital {
        weights.bump(Category::Crisis, 2);
    }
    if meters.reputation > config.high_reputation {
        weights.bump(Category::Opportunity, 2);
    }
    if meters.morale < config.low_morale {
        weights.bump(Category::Crisis, 1);
    }
    if turn > config.late_turn {
        weights.bump(Category::ExtremeCrisis, 1);
    }

    weights
}

/// Draw a category from `weights`.
///
/// Categories with a weight of zero or less are never drawn. If no category
/// has a positive weight, `Normal` is returned.
pub fn draw<R: Rng + ?Sized>(rng: &mut R, weights: &CategoryWeights) -> Category {
    let candidates: Vec<(Category, u32)> = Category::ALL
        .into_iter()
        .filter_map(|c| {
            let weight = weights.get(c);
            (weight > 0).then_some((c, weight as u32))
        })
        .collect();

    match WeightedIndex::new(candidates.iter().map(|(_, w)| *w)) {
        Ok(index) => candidates[index.sample(rng)].0,
        Err(_) => Category::Normal,
    }
}

/// Pick the category for the next event of a run.
pub fn select_category<R: Rng + ?Sized>(
    rng: &mut R,
    config: &SelectorConfig,
    turn: i64,
    meters: &Meters,
) -> Category {
    let weights = weights_for(config, turn, meters);
    let category = draw(rng, &weights);
    tracing::debug!(?weights, %category, turn, "selected event category");
    category
}
