//! Transactional operations over a [`TrackerStore`].
//!
//! Every mutation stages its writes on a copy of the store and commits by
//! swapping the copy in only when the whole operation succeeded. A link
//! change and the recipe cache refresh it triggers therefore land together
//! or not at all.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::catalog::{
    ensure_unique_name, Food, FoodDraft, FoodId, Ingredient, IngredientDraft, IngredientId,
    LinkId, LogEntry, LogEntryId, LogSource, MealSlot, Recipe, RecipeDraft, RecipeId, RecipeLink,
};
use crate::day_summary::{self, DayLog};
use crate::errors::{RecordKind, Result, TrackerError};
use crate::log_snapshot::{snapshot_food, snapshot_recipe_portion, validate_quantity};
use crate::nutrient_lookup::NutrientLookup;
use crate::nutrients::NutrientVector;
use crate::recipe_aggregator::{aggregate_recipe, refresh_cached_total, Aggregation};
use crate::store::{LogStore, MemoryStore, TrackerStore};

fn not_found(kind: RecordKind, id: u64) -> TrackerError {
    TrackerError::NotFound { kind, id }
}

/// Result of deleting a record together with its dependents.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal<T> {
    pub record: T,
    /// Dependent records deleted with it: log entries for foods and
    /// recipes, recipe links for ingredients.
    pub cascaded: usize,
    pub refreshed_recipes: Vec<RecipeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngredientUpdate {
    pub ingredient: Ingredient,
    pub refreshed_recipes: Vec<RecipeId>,
}

/// A link that was added or removed, and the recipe totals after the change.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkChange {
    pub link: RecipeLink,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLine {
    pub link: RecipeLink,
    /// `None` when the link points at an ingredient that no longer exists.
    pub ingredient: Option<Ingredient>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub lines: Vec<RecipeLine>,
    /// Freshly computed, so skipped links show up even if the cached total
    /// was written earlier.
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Default)]
pub struct Tracker<S = MemoryStore> {
    store: S,
}

impl<S: TrackerStore> Tracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs `op` against a staged copy of the store and commits it only if
    /// `op` succeeds.
    pub fn transaction<T, F>(&mut self, operation: &'static str, op: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> Result<T>,
    {
        let mut staged = self.store.clone();
        match op(&mut staged) {
            Ok(value) => {
                self.store = staged;
                debug!(operation, "transaction committed");
                Ok(value)
            }
            Err(e) => {
                warn!(operation, error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    // --- Foods ---

    pub fn add_food(&mut self, draft: &FoodDraft) -> Result<Food> {
        let draft = draft.validate()?;
        self.transaction("add_food", |store| {
            let foods = store.foods();
            ensure_unique_name(
                RecordKind::Food,
                &draft.name,
                foods.iter().map(|f| f.name.as_str()),
            )?;

            let now = Utc::now();
            let food = Food {
                id: store.next_food_id(),
                name: draft.name,
                base_unit: draft.base_unit,
                base_quantity: draft.base_quantity,
                nutrients: NutrientVector::from_raw(&draft.nutrients),
                notes: draft.notes,
                created_at: now,
                updated_at: now,
            };
            store.put_food(food.clone());
            info!(food_id = food.id, name = %food.name, "food added");
            Ok(food)
        })
    }

    /// Existing log entries keep the nutrients they were logged with.
    pub fn edit_food(&mut self, id: FoodId, draft: &FoodDraft) -> Result<Food> {
        let draft = draft.validate()?;
        self.transaction("edit_food", |store| {
            let mut food = store.food(id).ok_or_else(|| not_found(RecordKind::Food, id))?;
            let foods = store.foods();
            ensure_unique_name(
                RecordKind::Food,
                &draft.name,
                foods.iter().filter(|f| f.id != id).map(|f| f.name.as_str()),
            )?;

            food.name = draft.name;
            food.base_unit = draft.base_unit;
            food.base_quantity = draft.base_quantity;
            food.nutrients = NutrientVector::from_raw(&draft.nutrients);
            food.notes = draft.notes;
            food.updated_at = Utc::now();
            store.put_food(food.clone());
            info!(food_id = id, name = %food.name, "food updated");
            Ok(food)
        })
    }

    /// Deletes the food and every log entry that references it.
    pub fn delete_food(&mut self, id: FoodId) -> Result<Removal<Food>> {
        self.transaction("delete_food", |store| {
            let food = store.remove_food(id).ok_or_else(|| not_found(RecordKind::Food, id))?;
            let cascaded = remove_entries_for(store, LogSource::Food(id));
            info!(food_id = id, name = %food.name, log_entries = cascaded, "food deleted");
            Ok(Removal {
                record: food,
                cascaded,
                refreshed_recipes: Vec::new(),
            })
        })
    }

    pub fn food(&self, id: FoodId) -> Option<Food> {
        self.store.food(id)
    }

    /// Sorted by name.
    pub fn list_foods(&self) -> Vec<Food> {
        let mut foods = self.store.foods();
        foods.sort_by_key(|f| f.name.to_lowercase());
        foods
    }

    // --- Ingredients ---

    pub fn add_ingredient(&mut self, draft: &IngredientDraft) -> Result<Ingredient> {
        let draft = draft.validate()?;
        self.transaction("add_ingredient", |store| {
            let ingredients = store.ingredients();
            ensure_unique_name(
                RecordKind::Ingredient,
                &draft.name,
                ingredients.iter().map(|i| i.name.as_str()),
            )?;

            let now = Utc::now();
            let ingredient = Ingredient {
                id: store.next_ingredient_id(),
                name: draft.name,
                category: draft.category,
                typical_unit: draft.typical_unit,
                unit_quantity: draft.unit_quantity,
                nutrients: NutrientVector::from_raw(&draft.nutrients),
                notes: draft.notes,
                created_at: now,
                updated_at: now,
            };
            store.put_ingredient(ingredient.clone());
            info!(ingredient_id = ingredient.id, name = %ingredient.name, "ingredient added");
            Ok(ingredient)
        })
    }

    /// Creates an ingredient from reference data, exactly as if it had been
    /// entered by hand.
    pub fn import_ingredient<L>(
        &mut self,
        name: &str,
        category: Option<String>,
        lookup: &L,
    ) -> Result<Ingredient>
    where
        L: NutrientLookup + ?Sized,
    {
        let record = lookup
            .lookup(name)
            .ok_or_else(|| TrackerError::NoReferenceData(name.trim().to_string()))?;
        debug!(name, reference = %record.name, "reference data found");
        self.add_ingredient(&record.to_ingredient_draft(name, category))
    }

    /// Updates the ingredient and refreshes the cached totals of every
    /// recipe that uses it.
    pub fn edit_ingredient(
        &mut self,
        id: IngredientId,
        draft: &IngredientDraft,
    ) -> Result<IngredientUpdate> {
        let draft = draft.validate()?;
        self.transaction("edit_ingredient", |store| {
            let mut ingredient = store
                .ingredient(id)
                .ok_or_else(|| not_found(RecordKind::Ingredient, id))?;
            let ingredients = store.ingredients();
            ensure_unique_name(
                RecordKind::Ingredient,
                &draft.name,
                ingredients
                    .iter()
                    .filter(|i| i.id != id)
                    .map(|i| i.name.as_str()),
            )?;

            ingredient.name = draft.name;
            ingredient.category = draft.category;
            ingredient.typical_unit = draft.typical_unit;
            ingredient.unit_quantity = draft.unit_quantity;
            ingredient.nutrients = NutrientVector::from_raw(&draft.nutrients);
            ingredient.notes = draft.notes;
            ingredient.updated_at = Utc::now();
            store.put_ingredient(ingredient.clone());

            let recipe_ids = recipes_using(&*store, id);
            for recipe_id in &recipe_ids {
                refresh_cached_total(store, *recipe_id)?;
            }
            info!(
                ingredient_id = id,
                name = %ingredient.name,
                recipes = recipe_ids.len(),
                "ingredient updated"
            );
            Ok(IngredientUpdate {
                ingredient,
                refreshed_recipes: recipe_ids,
            })
        })
    }

    /// Deletes the ingredient, drops its recipe links and refreshes the
    /// affected recipes.
    pub fn delete_ingredient(&mut self, id: IngredientId) -> Result<Removal<Ingredient>> {
        self.transaction("delete_ingredient", |store| {
            let ingredient = store
                .remove_ingredient(id)
                .ok_or_else(|| not_found(RecordKind::Ingredient, id))?;

            let recipe_ids = recipes_using(&*store, id);
            let links = store.links_for_ingredient(id);
            for link in &links {
                store.remove_link(link.id);
            }
            for recipe_id in &recipe_ids {
                refresh_cached_total(store, *recipe_id)?;
            }
            info!(
                ingredient_id = id,
                name = %ingredient.name,
                links = links.len(),
                "ingredient deleted"
            );
            Ok(Removal {
                record: ingredient,
                cascaded: links.len(),
                refreshed_recipes: recipe_ids,
            })
        })
    }

    pub fn ingredient(&self, id: IngredientId) -> Option<Ingredient> {
        self.store.ingredient(id)
    }

    /// Sorted by category (uncategorized first), then name.
    pub fn list_ingredients(&self) -> Vec<Ingredient> {
        let mut ingredients = self.store.ingredients();
        ingredients.sort_by_key(|i| {
            (
                i.category.as_deref().map(str::to_lowercase),
                i.name.to_lowercase(),
            )
        });
        ingredients
    }

    // --- Recipes ---

    pub fn create_recipe(&mut self, draft: &RecipeDraft) -> Result<Recipe> {
        let draft = draft.validate()?;
        self.transaction("create_recipe", |store| {
            let now = Utc::now();
            let recipe = Recipe {
                id: store.next_recipe_id(),
                name: draft.name,
                description: draft.description,
                instructions: draft.instructions,
                suitable_for: draft.suitable_for,
                cached_total: None,
                created_at: now,
                updated_at: now,
            };
            store.put_recipe(recipe.clone());
            info!(recipe_id = recipe.id, name = %recipe.name, "recipe created");
            Ok(recipe)
        })
    }

    /// Updates descriptive fields only; links and cached totals are kept.
    pub fn edit_recipe(&mut self, id: RecipeId, draft: &RecipeDraft) -> Result<Recipe> {
        let draft = draft.validate()?;
        self.transaction("edit_recipe", |store| {
            let mut recipe = store.recipe(id).ok_or_else(|| not_found(RecordKind::Recipe, id))?;
            recipe.name = draft.name;
            recipe.description = draft.description;
            recipe.instructions = draft.instructions;
            recipe.suitable_for = draft.suitable_for;
            recipe.updated_at = Utc::now();
            store.put_recipe(recipe.clone());
            info!(recipe_id = id, name = %recipe.name, "recipe updated");
            Ok(recipe)
        })
    }

    /// Deletes the recipe, its links, and every log entry that references
    /// it, the same way deleting a food does.
    pub fn delete_recipe(&mut self, id: RecipeId) -> Result<Removal<Recipe>> {
        self.transaction("delete_recipe", |store| {
            let recipe = store.remove_recipe(id).ok_or_else(|| not_found(RecordKind::Recipe, id))?;
            let links = store.links_for_recipe(id);
            for link in &links {
                store.remove_link(link.id);
            }
            let cascaded = remove_entries_for(store, LogSource::Recipe(id));
            info!(
                recipe_id = id,
                name = %recipe.name,
                links = links.len(),
                log_entries = cascaded,
                "recipe deleted"
            );
            Ok(Removal {
                record: recipe,
                cascaded,
                refreshed_recipes: Vec::new(),
            })
        })
    }

    pub fn recipe(&self, id: RecipeId) -> Option<Recipe> {
        self.store.recipe(id)
    }

    /// Sorted by name.
    pub fn list_recipes(&self) -> Vec<Recipe> {
        let mut recipes = self.store.recipes();
        recipes.sort_by_key(|r| (r.name.to_lowercase(), r.id));
        recipes
    }

    /// Adds `quantity` (in the ingredient's unit) of an ingredient and
    /// refreshes the recipe's cached total in the same transaction.
    pub fn add_recipe_ingredient(
        &mut self,
        recipe_id: RecipeId,
        ingredient_id: IngredientId,
        quantity: f64,
    ) -> Result<LinkChange> {
        let quantity = validate_quantity(quantity)?;
        self.transaction("add_recipe_ingredient", |store| {
            store
                .recipe(recipe_id)
                .ok_or_else(|| not_found(RecordKind::Recipe, recipe_id))?;
            let ingredient = store
                .ingredient(ingredient_id)
                .ok_or_else(|| not_found(RecordKind::Ingredient, ingredient_id))?;
            if store
                .links_for_recipe(recipe_id)
                .iter()
                .any(|link| link.ingredient_id == ingredient_id)
            {
                return Err(TrackerError::DuplicateLink {
                    recipe_id,
                    ingredient_id,
                });
            }

            let link = RecipeLink {
                id: store.next_link_id(),
                recipe_id,
                ingredient_id,
                quantity,
            };
            store.put_link(link.clone());
            let aggregation = refresh_cached_total(store, recipe_id)?;
            info!(
                recipe_id,
                link_id = link.id,
                ingredient = %ingredient.name,
                quantity,
                unit = %ingredient.typical_unit,
                "ingredient added to recipe"
            );
            Ok(LinkChange { link, aggregation })
        })
    }

    /// Removes a link and refreshes the recipe's cached total in the same
    /// transaction.
    pub fn remove_recipe_ingredient(&mut self, link_id: LinkId) -> Result<LinkChange> {
        self.transaction("remove_recipe_ingredient", |store| {
            let link = store
                .remove_link(link_id)
                .ok_or_else(|| not_found(RecordKind::RecipeLink, link_id))?;
            let aggregation = refresh_cached_total(store, link.recipe_id)?;
            info!(
                recipe_id = link.recipe_id,
                link_id,
                ingredient_id = link.ingredient_id,
                "ingredient removed from recipe"
            );
            Ok(LinkChange { link, aggregation })
        })
    }

    /// Recomputes and stores a recipe's cached total from its current links.
    pub fn refresh_recipe(&mut self, recipe_id: RecipeId) -> Result<Aggregation> {
        self.transaction("refresh_recipe", |store| refresh_cached_total(store, recipe_id))
    }

    /// Ingredients not yet linked into the recipe, sorted by name.
    pub fn available_ingredients(&self, recipe_id: RecipeId) -> Result<Vec<Ingredient>> {
        self.store
            .recipe(recipe_id)
            .ok_or_else(|| not_found(RecordKind::Recipe, recipe_id))?;
        let linked: Vec<IngredientId> = self
            .store
            .links_for_recipe(recipe_id)
            .iter()
            .map(|link| link.ingredient_id)
            .collect();

        let mut available: Vec<Ingredient> = self
            .store
            .ingredients()
            .into_iter()
            .filter(|i| !linked.contains(&i.id))
            .collect();
        available.sort_by_key(|i| i.name.to_lowercase());
        Ok(available)
    }

    pub fn recipe_detail(&self, recipe_id: RecipeId) -> Result<RecipeDetail> {
        let recipe = self
            .store
            .recipe(recipe_id)
            .ok_or_else(|| not_found(RecordKind::Recipe, recipe_id))?;
        let lines = self
            .store
            .links_for_recipe(recipe_id)
            .into_iter()
            .map(|link| RecipeLine {
                ingredient: self.store.ingredient(link.ingredient_id),
                link,
            })
            .collect();
        let aggregation = aggregate_recipe(&self.store, recipe_id);
        Ok(RecipeDetail {
            recipe,
            lines,
            aggregation,
        })
    }

    // --- Log ---

    /// Logs `quantity` of a food (in its `base_unit`) with its nutrients
    /// frozen at this moment.
    pub fn log_food(
        &mut self,
        date: NaiveDate,
        meal: MealSlot,
        food_id: FoodId,
        quantity: f64,
    ) -> Result<LogEntry> {
        let quantity = validate_quantity(quantity)?;
        self.transaction("log_food", |store| {
            let food = store.food(food_id).ok_or_else(|| not_found(RecordKind::Food, food_id))?;
            let nutrients = snapshot_food(&food, quantity)?;
            let entry = LogEntry {
                id: store.next_log_id(),
                date,
                meal,
                source: LogSource::Food(food_id),
                quantity_consumed: quantity,
                nutrients,
                created_at: Utc::now(),
            };
            store.insert_entry(entry.clone());
            info!(
                log_id = entry.id,
                %date,
                %meal,
                food = %food.name,
                quantity,
                unit = %food.base_unit,
                calories = nutrients.calories(),
                "food logged"
            );
            Ok(entry)
        })
    }

    /// Logs a servings multiplier of a recipe, using its cached total.
    pub fn log_recipe(
        &mut self,
        date: NaiveDate,
        meal: MealSlot,
        recipe_id: RecipeId,
        servings: f64,
    ) -> Result<LogEntry> {
        let servings = validate_quantity(servings)?;
        self.transaction("log_recipe", |store| {
            let recipe = store
                .recipe(recipe_id)
                .ok_or_else(|| not_found(RecordKind::Recipe, recipe_id))?;
            if recipe.cached_total.is_none() {
                warn!(recipe_id, "logging a recipe without ingredients");
            }
            let nutrients = snapshot_recipe_portion(&recipe, servings)?;
            let entry = LogEntry {
                id: store.next_log_id(),
                date,
                meal,
                source: LogSource::Recipe(recipe_id),
                quantity_consumed: servings,
                nutrients,
                created_at: Utc::now(),
            };
            store.insert_entry(entry.clone());
            info!(
                log_id = entry.id,
                %date,
                %meal,
                recipe = %recipe.name,
                servings,
                calories = nutrients.calories(),
                "recipe logged"
            );
            Ok(entry)
        })
    }

    pub fn delete_log_entry(&mut self, id: LogEntryId) -> Result<LogEntry> {
        self.transaction("delete_log_entry", |store| {
            let entry = store
                .remove_entry(id)
                .ok_or_else(|| not_found(RecordKind::LogEntry, id))?;
            info!(log_id = id, date = %entry.date, "log entry deleted");
            Ok(entry)
        })
    }

    pub fn log_entry(&self, id: LogEntryId) -> Option<LogEntry> {
        self.store.entry(id)
    }

    pub fn summarize(&self, date: NaiveDate) -> NutrientVector {
        day_summary::summarize(&self.store, date)
    }

    pub fn day_log(&self, date: NaiveDate) -> DayLog {
        day_summary::day_log(&self.store, date)
    }

    /// Display name of a log entry's source, if it still exists.
    pub fn source_name(&self, source: LogSource) -> Option<String> {
        match source {
            LogSource::Food(id) => self.store.food(id).map(|f| f.name),
            LogSource::Recipe(id) => self.store.recipe(id).map(|r| r.name),
        }
    }
}

fn remove_entries_for<S: LogStore + ?Sized>(store: &mut S, source: LogSource) -> usize {
    let entries = store.entries_for_source(source);
    for entry in &entries {
        store.remove_entry(entry.id);
    }
    entries.len()
}

/// Distinct existing recipes linking an ingredient, ascending. Links whose
/// recipe is gone are reported and left out.
fn recipes_using<S: TrackerStore>(store: &S, ingredient_id: IngredientId) -> Vec<RecipeId> {
    let mut recipe_ids: Vec<RecipeId> = Vec::new();
    for link in store.links_for_ingredient(ingredient_id) {
        if store.recipe(link.recipe_id).is_some() {
            recipe_ids.push(link.recipe_id);
        } else {
            warn!(
                link_id = link.id,
                ingredient_id,
                recipe_id = link.recipe_id,
                "recipe ingredient points at a missing recipe"
            );
        }
    }
    recipe_ids.sort_unstable();
    recipe_ids.dedup();
    recipe_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrients::RawNutrients;
    use crate::store::CatalogStore;

    fn tracker() -> Tracker {
        Tracker::new(MemoryStore::new())
    }

    fn food_draft(name: &str) -> FoodDraft {
        FoodDraft {
            name: name.to_string(),
            base_unit: "g".to_string(),
            base_quantity: 100.0,
            nutrients: RawNutrients {
                calories: Some(250.0),
                ..Default::default()
            },
            notes: None,
        }
    }

    #[test]
    fn test_failed_transaction_leaves_store_untouched() {
        let mut tracker = tracker();
        tracker.add_food(&food_draft("Toast")).unwrap();
        let before = tracker.store().clone();

        let result: Result<()> = tracker.transaction("test", |store| {
            store.remove_food(1);
            Err(TrackerError::Store("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(tracker.store(), &before);
    }

    #[test]
    fn test_duplicate_food_name_rejected() {
        let mut tracker = tracker();
        tracker.add_food(&food_draft("Toast")).unwrap();
        let err = tracker.add_food(&food_draft(" toast")).unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateName { .. }));
        assert_eq!(tracker.list_foods().len(), 1);
    }

    #[test]
    fn test_edit_food_may_keep_its_own_name() {
        let mut tracker = tracker();
        let food = tracker.add_food(&food_draft("Toast")).unwrap();
        let mut draft = food_draft("TOAST");
        draft.base_quantity = 30.0;
        let edited = tracker.edit_food(food.id, &draft).unwrap();
        assert_eq!(edited.name, "TOAST");
        assert_eq!(edited.base_quantity, 30.0);
    }

    #[test]
    fn test_orphan_link_does_not_block_ingredient_changes() {
        use crate::store::RecipeStore;

        let mut tracker = tracker();
        let rice = tracker.add_ingredient(&IngredientDraft::new("Rice")).unwrap();
        let mut store = tracker.into_store();
        store.put_link(RecipeLink {
            id: 1,
            recipe_id: 42,
            ingredient_id: rice.id,
            quantity: 100.0,
        });
        let mut tracker = Tracker::new(store);

        let update = tracker
            .edit_ingredient(rice.id, &IngredientDraft::new("Brown rice"))
            .unwrap();
        assert!(update.refreshed_recipes.is_empty());

        let removal = tracker.delete_ingredient(rice.id).unwrap();
        assert_eq!(removal.cascaded, 1);
        assert!(removal.refreshed_recipes.is_empty());
        assert_eq!(tracker.store().link_count(), 0);
    }

    #[test]
    fn test_invalid_log_quantity_creates_nothing() {
        let mut tracker = tracker();
        let food = tracker.add_food(&food_draft("Toast")).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let err = tracker
            .log_food(date, MealSlot::Breakfast, food.id, 0.0)
            .unwrap_err();
        assert_eq!(err, TrackerError::InvalidQuantity(0.0));
        assert_eq!(tracker.store().log_entry_count(), 0);
    }
}
