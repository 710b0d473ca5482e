//! Freezing the nutrients of a single consumption event.
//!
//! The vectors returned here are copied into a `LogEntry` as-is and never
//! recomputed, so later catalog edits cannot change logged history.

use tracing::warn;

use crate::catalog::{Food, Recipe};
use crate::errors::{Result, TrackerError};
use crate::nutrients::{scale_factor, NutrientVector};

/// Consumed quantities and servings multipliers must be finite and strictly
/// positive.
pub fn validate_quantity(quantity: f64) -> Result<f64> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(quantity)
    } else {
        Err(TrackerError::InvalidQuantity(quantity))
    }
}

/// Nutrients of `quantity_consumed` (in the food's `base_unit`).
///
/// A food with an unusable `base_quantity` snapshots as all zeros rather
/// than failing the log.
pub fn snapshot_food(food: &Food, quantity_consumed: f64) -> Result<NutrientVector> {
    let quantity = validate_quantity(quantity_consumed)?;
    match scale_factor(Some(food.base_quantity), quantity) {
        Ok(multiplier) => Ok(food.nutrients.scale(multiplier)),
        Err(e) => {
            warn!(food_id = food.id, food = %food.name, error = %e, "logging food with zero nutrients");
            Ok(NutrientVector::zero())
        }
    }
}

/// Scales a recipe's cached total by a servings multiplier. A recipe with
/// no cached total yet snapshots as all zeros.
pub fn compute_recipe_log_snapshot(
    cached_total: Option<&NutrientVector>,
    servings_multiplier: f64,
) -> Result<NutrientVector> {
    let servings = validate_quantity(servings_multiplier)?;
    Ok(cached_total
        .map(|total| total.scale(servings))
        .unwrap_or_default())
}

/// Uses the recipe's cached total as it stands; ingredients are not
/// re-aggregated at log time.
pub fn snapshot_recipe_portion(recipe: &Recipe, servings_multiplier: f64) -> Result<NutrientVector> {
    compute_recipe_log_snapshot(recipe.cached_total.as_ref(), servings_multiplier)
}
