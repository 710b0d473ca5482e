use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CatalogStore, LogStore, RecipeStore};
use crate::catalog::{
    Food, FoodId, Ingredient, IngredientId, LinkId, LogEntry, LogEntryId, LogSource, Recipe,
    RecipeId, RecipeLink,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct IdCounters {
    food: u64,
    ingredient: u64,
    recipe: u64,
    link: u64,
    log: u64,
}

/// Next id for a table. The counter is first raised to the table's highest
/// key, so files written without `next_ids` never reuse an existing id.
fn next_key<V>(counter: &mut u64, table: &BTreeMap<u64, V>) -> u64 {
    let highest = table.keys().next_back().copied().unwrap_or(0);
    *counter = (*counter).max(highest) + 1;
    *counter
}

/// Table-per-record store held in memory. Serializes as a whole, which is
/// how [`super::JsonFileStore`] persists it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    next_ids: IdCounters,
    #[serde(default)]
    foods: BTreeMap<FoodId, Food>,
    #[serde(default)]
    ingredients: BTreeMap<IngredientId, Ingredient>,
    #[serde(default)]
    recipes: BTreeMap<RecipeId, Recipe>,
    #[serde(default)]
    links: BTreeMap<LinkId, RecipeLink>,
    #[serde(default)]
    log_entries: BTreeMap<LogEntryId, LogEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_entry_count(&self) -> usize {
        self.log_entries.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl CatalogStore for MemoryStore {
    fn food(&self, id: FoodId) -> Option<Food> {
        self.foods.get(&id).cloned()
    }

    fn foods(&self) -> Vec<Food> {
        self.foods.values().cloned().collect()
    }

    fn next_food_id(&mut self) -> FoodId {
        next_key(&mut self.next_ids.food, &self.foods)
    }

    fn put_food(&mut self, food: Food) {
        self.next_ids.food = self.next_ids.food.max(food.id);
        self.foods.insert(food.id, food);
    }

    fn remove_food(&mut self, id: FoodId) -> Option<Food> {
        self.foods.remove(&id)
    }

    fn ingredient(&self, id: IngredientId) -> Option<Ingredient> {
        self.ingredients.get(&id).cloned()
    }

    fn ingredients(&self) -> Vec<Ingredient> {
        self.ingredients.values().cloned().collect()
    }

    fn next_ingredient_id(&mut self) -> IngredientId {
        next_key(&mut self.next_ids.ingredient, &self.ingredients)
    }

    fn put_ingredient(&mut self, ingredient: Ingredient) {
        self.next_ids.ingredient = self.next_ids.ingredient.max(ingredient.id);
        self.ingredients.insert(ingredient.id, ingredient);
    }

    fn remove_ingredient(&mut self, id: IngredientId) -> Option<Ingredient> {
        self.ingredients.remove(&id)
    }
}

impl RecipeStore for MemoryStore {
    fn recipe(&self, id: RecipeId) -> Option<Recipe> {
        self.recipes.get(&id).cloned()
    }

    fn recipes(&self) -> Vec<Recipe> {
        self.recipes.values().cloned().collect()
    }

    fn next_recipe_id(&mut self) -> RecipeId {
        next_key(&mut self.next_ids.recipe, &self.recipes)
    }

    fn put_recipe(&mut self, recipe: Recipe) {
        self.next_ids.recipe = self.next_ids.recipe.max(recipe.id);
        self.recipes.insert(recipe.id, recipe);
    }

    fn remove_recipe(&mut self, id: RecipeId) -> Option<Recipe> {
        self.recipes.remove(&id)
    }

    fn link(&self, id: LinkId) -> Option<RecipeLink> {
        self.links.get(&id).cloned()
    }

    fn links_for_recipe(&self, recipe_id: RecipeId) -> Vec<RecipeLink> {
        self.links
            .values()
            .filter(|link| link.recipe_id == recipe_id)
            .cloned()
            .collect()
    }

    fn links_for_ingredient(&self, ingredient_id: IngredientId) -> Vec<RecipeLink> {
        self.links
            .values()
            .filter(|link| link.ingredient_id == ingredient_id)
            .cloned()
            .collect()
    }

    fn next_link_id(&mut self) -> LinkId {
        next_key(&mut self.next_ids.link, &self.links)
    }

    fn put_link(&mut self, link: RecipeLink) {
        self.next_ids.link = self.next_ids.link.max(link.id);
        self.links.insert(link.id, link);
    }

    fn remove_link(&mut self, id: LinkId) -> Option<RecipeLink> {
        self.links.remove(&id)
    }
}

impl LogStore for MemoryStore {
    fn entry(&self, id: LogEntryId) -> Option<LogEntry> {
        self.log_entries.get(&id).cloned()
    }

    fn entries_on(&self, date: NaiveDate) -> Vec<LogEntry> {
        let mut entries: Vec<LogEntry> = self
            .log_entries
            .values()
            .filter(|entry| entry.date == date)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        entries
    }

    fn entries_for_source(&self, source: LogSource) -> Vec<LogEntry> {
        self.log_entries
            .values()
            .filter(|entry| entry.source == source)
            .cloned()
            .collect()
    }

    fn next_log_id(&mut self) -> LogEntryId {
        next_key(&mut self.next_ids.log, &self.log_entries)
    }

    fn insert_entry(&mut self, entry: LogEntry) {
        self.next_ids.log = self.next_ids.log.max(entry.id);
        self.log_entries.insert(entry.id, entry);
    }

    fn remove_entry(&mut self, id: LogEntryId) -> Option<LogEntry> {
        self.log_entries.remove(&id)
    }
}
