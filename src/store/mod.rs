//! Persistence seams. The engine only needs read/query and write/persist
//! operations on these records; how they are stored is up to the
//! implementation.
//!
//! Log entries have no update operation: once inserted, an entry can only be
//! read or removed.

pub mod json_file;
pub mod memory;

use chrono::NaiveDate;

use crate::catalog::{
    Food, FoodId, Ingredient, IngredientId, LinkId, LogEntry, LogEntryId, LogSource, Recipe,
    RecipeId, RecipeLink,
};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

pub trait CatalogStore {
    fn food(&self, id: FoodId) -> Option<Food>;
    fn foods(&self) -> Vec<Food>;
    fn next_food_id(&mut self) -> FoodId;
    /// Inserts or replaces the food with the same id.
    fn put_food(&mut self, food: Food);
    fn remove_food(&mut self, id: FoodId) -> Option<Food>;

    fn ingredient(&self, id: IngredientId) -> Option<Ingredient>;
    fn ingredients(&self) -> Vec<Ingredient>;
    fn next_ingredient_id(&mut self) -> IngredientId;
    fn put_ingredient(&mut self, ingredient: Ingredient);
    fn remove_ingredient(&mut self, id: IngredientId) -> Option<Ingredient>;
}

pub trait RecipeStore {
    fn recipe(&self, id: RecipeId) -> Option<Recipe>;
    fn recipes(&self) -> Vec<Recipe>;
    fn next_recipe_id(&mut self) -> RecipeId;
    fn put_recipe(&mut self, recipe: Recipe);
    fn remove_recipe(&mut self, id: RecipeId) -> Option<Recipe>;

    fn link(&self, id: LinkId) -> Option<RecipeLink>;
    /// Links of one recipe, in insertion order.
    fn links_for_recipe(&self, recipe_id: RecipeId) -> Vec<RecipeLink>;
    fn links_for_ingredient(&self, ingredient_id: IngredientId) -> Vec<RecipeLink>;
    fn next_link_id(&mut self) -> LinkId;
    fn put_link(&mut self, link: RecipeLink);
    fn remove_link(&mut self, id: LinkId) -> Option<RecipeLink>;
}

pub trait LogStore {
    fn entry(&self, id: LogEntryId) -> Option<LogEntry>;
    /// Entries for one date, ordered by creation time.
    fn entries_on(&self, date: NaiveDate) -> Vec<LogEntry>;
    fn entries_for_source(&self, source: LogSource) -> Vec<LogEntry>;
    fn next_log_id(&mut self) -> LogEntryId;
    fn insert_entry(&mut self, entry: LogEntry);
    fn remove_entry(&mut self, id: LogEntryId) -> Option<LogEntry>;
}

/// Everything a [`crate::tracker::Tracker`] needs. `Clone` is what lets a
/// transaction stage its writes on a copy and commit by swapping.
pub trait TrackerStore: CatalogStore + RecipeStore + LogStore + Clone {}

impl<T> TrackerStore for T where T: CatalogStore + RecipeStore + LogStore + Clone {}
