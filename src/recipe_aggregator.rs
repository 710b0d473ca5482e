use chrono::Utc;
use tracing::{debug, warn};

use crate::catalog::{IngredientId, LinkId, RecipeId, RecipeLink};
use crate::errors::{RecordKind, Result, TrackerError};
use crate::nutrients::{scale_factor, NutrientVector};
use crate::store::{CatalogStore, RecipeStore};

/// An already-fetched link: the ingredient's nutrients and basis, plus the
/// quantity the recipe uses.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkInput {
    pub nutrients: NutrientVector,
    pub unit_quantity: Option<f64>,
    pub quantity: f64,
}

/// A link that contributed nothing to a recipe total, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLink {
    pub link_id: LinkId,
    pub ingredient_id: IngredientId,
    pub reason: TrackerError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub totals: NutrientVector,
    pub link_count: usize,
    pub skipped: Vec<SkippedLink>,
}

impl Aggregation {
    /// What the recipe should cache: absent while the recipe has no links,
    /// so "no ingredients yet" is not confused with a real zero.
    pub fn cached_total(&self) -> Option<NutrientVector> {
        if self.link_count == 0 {
            None
        } else {
            Some(self.totals)
        }
    }

    /// True when some links were skipped and the totals are understated.
    pub fn is_degraded(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Short note for displays of a degraded total, e.g. "(1 ingredient excluded)".
    pub fn excluded_note(&self) -> Option<String> {
        match self.skipped.len() {
            0 => None,
            1 => Some("(1 ingredient excluded)".to_string()),
            n => Some(format!("({} ingredients excluded)", n)),
        }
    }
}

/// Nutrients `quantity` of an ingredient adds, or `InvalidBasis`.
fn link_contribution(
    nutrients: &NutrientVector,
    unit_quantity: Option<f64>,
    quantity: f64,
) -> Result<NutrientVector> {
    let multiplier = scale_factor(unit_quantity, quantity)?;
    Ok(nutrients.scale(multiplier))
}

/// Sums link contributions without touching any store. Links with an
/// invalid basis contribute nothing.
pub fn compute_recipe_totals(links: &[LinkInput]) -> NutrientVector {
    let contributions: Vec<NutrientVector> = links
        .iter()
        .enumerate()
        .filter_map(|(idx, link)| {
            match link_contribution(&link.nutrients, link.unit_quantity, link.quantity) {
                Ok(contribution) => Some(contribution),
                Err(e) => {
                    warn!(link_index = idx, error = %e, "skipping link in recipe totals");
                    None
                }
            }
        })
        .collect();
    NutrientVector::sum(&contributions)
}

/// Resolves each link's ingredient and sums the valid contributions.
/// Missing ingredients and unusable bases are recorded in
/// [`Aggregation::skipped`] instead of failing the whole recipe.
pub fn aggregate_links<S: CatalogStore + ?Sized>(catalog: &S, links: &[RecipeLink]) -> Aggregation {
    let mut totals = NutrientVector::zero();
    let mut skipped = Vec::new();

    for link in links {
        let outcome = match catalog.ingredient(link.ingredient_id) {
            None => Err(TrackerError::BrokenReference {
                kind: RecordKind::Ingredient,
                id: link.ingredient_id,
            }),
            Some(ingredient) => link_contribution(
                &ingredient.nutrients,
                Some(ingredient.unit_quantity),
                link.quantity,
            ),
        };

        match outcome {
            Ok(contribution) => totals = totals.add(&contribution),
            Err(reason) => {
                warn!(
                    recipe_id = link.recipe_id,
                    link_id = link.id,
                    ingredient_id = link.ingredient_id,
                    error = %reason,
                    "skipping recipe ingredient"
                );
                skipped.push(SkippedLink {
                    link_id: link.id,
                    ingredient_id: link.ingredient_id,
                    reason,
                });
            }
        }
    }

    Aggregation {
        totals,
        link_count: links.len(),
        skipped,
    }
}

pub fn aggregate_recipe<S>(store: &S, recipe_id: RecipeId) -> Aggregation
where
    S: CatalogStore + RecipeStore + ?Sized,
{
    let links = store.links_for_recipe(recipe_id);
    aggregate_links(store, &links)
}

/// Recomputes a recipe's totals from its current links and overwrites the
/// cached value. Must run inside the same transaction as the link change.
pub fn refresh_cached_total<S>(store: &mut S, recipe_id: RecipeId) -> Result<Aggregation>
where
    S: CatalogStore + RecipeStore + ?Sized,
{
    let mut recipe = store.recipe(recipe_id).ok_or(TrackerError::NotFound {
        kind: RecordKind::Recipe,
        id: recipe_id,
    })?;

    let aggregation = aggregate_recipe(&*store, recipe_id);
    recipe.cached_total = aggregation.cached_total();
    recipe.updated_at = Utc::now();
    debug!(
        recipe_id,
        links = aggregation.link_count,
        skipped = aggregation.skipped.len(),
        calories = aggregation.totals.calories(),
        "recipe totals refreshed"
    );
    store.put_recipe(recipe);
    Ok(aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Ingredient;
    use crate::nutrients::Nutrient;
    use crate::store::MemoryStore;

    fn kcal(value: f64) -> NutrientVector {
        NutrientVector::zero().with(Nutrient::Calories, value)
    }

    fn ingredient(id: u64, unit_quantity: f64, calories: f64) -> Ingredient {
        Ingredient {
            id,
            name: format!("ingredient-{}", id),
            category: None,
            typical_unit: "g".to_string(),
            unit_quantity,
            nutrients: kcal(calories),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn link(id: u64, ingredient_id: u64, quantity: f64) -> RecipeLink {
        RecipeLink {
            id,
            recipe_id: 1,
            ingredient_id,
            quantity,
        }
    }

    #[test]
    fn test_rice_link_contributes_scaled_calories() {
        let totals = compute_recipe_totals(&[LinkInput {
            nutrients: kcal(130.0),
            unit_quantity: Some(100.0),
            quantity: 200.0,
        }]);
        assert_eq!(totals.calories(), 260.0);
    }

    #[test]
    fn test_zero_unit_quantity_contributes_nothing() {
        let totals = compute_recipe_totals(&[
            LinkInput {
                nutrients: kcal(999.0),
                unit_quantity: Some(0.0),
                quantity: 50.0,
            },
            LinkInput {
                nutrients: kcal(130.0),
                unit_quantity: Some(100.0),
                quantity: 100.0,
            },
        ]);
        assert_eq!(totals.calories(), 130.0);
    }

    #[test]
    fn test_missing_basis_is_skipped() {
        let totals = compute_recipe_totals(&[LinkInput {
            nutrients: kcal(50.0),
            unit_quantity: None,
            quantity: 10.0,
        }]);
        assert!(totals.is_zero());
    }

    #[test]
    fn test_empty_links_give_zero_and_no_cache() {
        let store = MemoryStore::new();
        let aggregation = aggregate_links(&store, &[]);
        assert!(aggregation.totals.is_zero());
        assert_eq!(aggregation.cached_total(), None);
        assert!(!aggregation.is_degraded());
        assert_eq!(aggregation.excluded_note(), None);
    }

    #[test]
    fn test_broken_reference_is_skipped_and_reported() {
        let mut store = MemoryStore::new();
        store.put_ingredient(ingredient(1, 100.0, 130.0));
        let links = vec![link(1, 1, 200.0), link(2, 99, 50.0)];

        let aggregation = aggregate_links(&store, &links);
        assert_eq!(aggregation.totals.calories(), 260.0);
        assert!(aggregation.is_degraded());
        assert_eq!(aggregation.skipped.len(), 1);
        assert_eq!(aggregation.skipped[0].link_id, 2);
        assert!(matches!(
            aggregation.skipped[0].reason,
            TrackerError::BrokenReference { id: 99, .. }
        ));
        assert_eq!(aggregation.cached_total(), Some(aggregation.totals));
        assert_eq!(
            aggregation.excluded_note().as_deref(),
            Some("(1 ingredient excluded)")
        );
    }

    #[test]
    fn test_bad_basis_in_store_is_skipped() {
        let mut store = MemoryStore::new();
        store.put_ingredient(ingredient(1, 0.0, 500.0));
        store.put_ingredient(ingredient(2, 100.0, 40.0));
        let links = vec![link(1, 1, 100.0), link(2, 2, 50.0)];

        let aggregation = aggregate_links(&store, &links);
        assert_eq!(aggregation.totals.calories(), 20.0);
        assert!(matches!(
            aggregation.skipped[0].reason,
            TrackerError::InvalidBasis(Some(_))
        ));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let mut store = MemoryStore::new();
        store.put_ingredient(ingredient(1, 100.0, 130.0));
        store.put_ingredient(ingredient(2, 3.0, 17.3));
        let links = vec![link(1, 1, 175.0), link(2, 2, 2.0)];

        let first = aggregate_links(&store, &links);
        let second = aggregate_links(&store, &links);
        assert_eq!(first, second);
    }
}
