use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::catalog::{
    FoodDraft, IngredientDraft, MealSlot, RecipeDraft, DEFAULT_BASIS_QUANTITY, DEFAULT_UNIT,
};
use crate::nutrients::{Nutrient, RawNutrients};

#[derive(Parser, Debug)]
#[command(author, version, about = "Track foods, recipes and daily nutrient intake", long_about = None)]
pub struct Cli {
    /// Path to the JSON data file [env: INTAKE_TRACKER_DATA]
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Reference nutrient CSV used by `ingredient import` [env: INTAKE_TRACKER_REFERENCE_CSV]
    #[arg(long, global = true)]
    pub reference_csv: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset [env: INTAKE_TRACKER_LOG]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage foods that can be logged directly
    #[command(subcommand)]
    Food(FoodCommand),
    /// Manage recipe ingredients
    #[command(subcommand)]
    Ingredient(IngredientCommand),
    /// Manage recipes and their ingredients
    #[command(subcommand)]
    Recipe(RecipeCommand),
    /// Record what was eaten and review a day
    #[command(subcommand)]
    Log(LogCommand),
}

/// One optional flag per nutrient. Omitted values stay missing.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct NutrientArgs {
    #[arg(long)]
    pub calories: Option<f64>,
    #[arg(long)]
    pub protein: Option<f64>,
    #[arg(long)]
    pub carbs: Option<f64>,
    #[arg(long)]
    pub fat: Option<f64>,
    #[arg(long)]
    pub fiber: Option<f64>,
    #[arg(long)]
    pub sugar: Option<f64>,
    #[arg(long)]
    pub calcium: Option<f64>,
    #[arg(long)]
    pub iron: Option<f64>,
    #[arg(long)]
    pub potassium: Option<f64>,
    #[arg(long)]
    pub sodium: Option<f64>,
    #[arg(long)]
    pub vitamin_d: Option<f64>,
}

impl NutrientArgs {
    fn value(&self, nutrient: Nutrient) -> Option<f64> {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Carbs => self.carbs,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
            Nutrient::Sugar => self.sugar,
            Nutrient::Calcium => self.calcium,
            Nutrient::Iron => self.iron,
            Nutrient::Potassium => self.potassium,
            Nutrient::Sodium => self.sodium,
            Nutrient::VitaminD => self.vitamin_d,
        }
    }

    pub fn to_raw(&self) -> RawNutrients {
        let mut raw = RawNutrients::default();
        self.apply(&mut raw);
        raw
    }

    /// Overwrites only the nutrients that were given on the command line.
    pub fn apply(&self, raw: &mut RawNutrients) {
        for &nutrient in Nutrient::ALL {
            if let Some(value) = self.value(nutrient) {
                raw.set(nutrient, Some(value));
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum FoodCommand {
    Add(FoodAddArgs),
    /// Change a food; log entries already recorded keep their nutrients
    Edit(FoodEditArgs),
    /// Delete a food and every log entry that references it
    Delete { id: u64 },
    List,
}

#[derive(Args, Debug)]
pub struct FoodAddArgs {
    #[arg(long)]
    pub name: String,
    /// Unit the food is logged in, e.g. g, ml, slice
    #[arg(long, default_value = DEFAULT_UNIT)]
    pub unit: String,
    /// Amount of `unit` the nutrient values refer to
    #[arg(long, default_value_t = DEFAULT_BASIS_QUANTITY)]
    pub base_quantity: f64,
    #[command(flatten)]
    pub nutrients: NutrientArgs,
    #[arg(long)]
    pub notes: Option<String>,
}

impl FoodAddArgs {
    pub fn to_draft(&self) -> FoodDraft {
        FoodDraft {
            name: self.name.clone(),
            base_unit: self.unit.clone(),
            base_quantity: self.base_quantity,
            nutrients: self.nutrients.to_raw(),
            notes: self.notes.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct FoodEditArgs {
    pub id: u64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub base_quantity: Option<f64>,
    #[command(flatten)]
    pub nutrients: NutrientArgs,
    #[arg(long)]
    pub notes: Option<String>,
}

impl FoodEditArgs {
    pub fn apply(&self, draft: &mut FoodDraft) {
        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if let Some(unit) = &self.unit {
            draft.base_unit = unit.clone();
        }
        if let Some(quantity) = self.base_quantity {
            draft.base_quantity = quantity;
        }
        if self.notes.is_some() {
            draft.notes = self.notes.clone();
        }
        self.nutrients.apply(&mut draft.nutrients);
    }
}

#[derive(Subcommand, Debug)]
pub enum IngredientCommand {
    Add(IngredientAddArgs),
    /// Change an ingredient and refresh every recipe that uses it
    Edit(IngredientEditArgs),
    /// Delete an ingredient, removing it from every recipe
    Delete { id: u64 },
    List,
    /// Create an ingredient from the reference nutrient table
    Import {
        name: String,
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct IngredientAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, default_value = DEFAULT_UNIT)]
    pub unit: String,
    /// Amount of `unit` the nutrient values refer to
    #[arg(long, default_value_t = DEFAULT_BASIS_QUANTITY)]
    pub unit_quantity: f64,
    #[command(flatten)]
    pub nutrients: NutrientArgs,
    #[arg(long)]
    pub notes: Option<String>,
}

impl IngredientAddArgs {
    pub fn to_draft(&self) -> IngredientDraft {
        IngredientDraft {
            name: self.name.clone(),
            category: self.category.clone(),
            typical_unit: self.unit.clone(),
            unit_quantity: self.unit_quantity,
            nutrients: self.nutrients.to_raw(),
            notes: self.notes.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct IngredientEditArgs {
    pub id: u64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub unit_quantity: Option<f64>,
    #[command(flatten)]
    pub nutrients: NutrientArgs,
    #[arg(long)]
    pub notes: Option<String>,
}

impl IngredientEditArgs {
    pub fn apply(&self, draft: &mut IngredientDraft) {
        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if self.category.is_some() {
            draft.category = self.category.clone();
        }
        if let Some(unit) = &self.unit {
            draft.typical_unit = unit.clone();
        }
        if let Some(quantity) = self.unit_quantity {
            draft.unit_quantity = quantity;
        }
        if self.notes.is_some() {
            draft.notes = self.notes.clone();
        }
        self.nutrients.apply(&mut draft.nutrients);
    }
}

#[derive(Subcommand, Debug)]
pub enum RecipeCommand {
    Create(RecipeArgs),
    /// Change a recipe's name, text or meal tags
    Edit {
        id: u64,
        #[command(flatten)]
        recipe: RecipeEditArgs,
    },
    /// Delete a recipe, its ingredient list and its log entries
    Delete { id: u64 },
    List,
    /// Show a recipe with its ingredients and totals
    Show { id: u64 },
    AddIngredient {
        recipe_id: u64,
        ingredient_id: u64,
        /// Amount in the ingredient's unit
        quantity: f64,
    },
    RemoveIngredient {
        /// Id of the recipe ingredient line, as shown by `recipe show`
        link_id: u64,
    },
    /// Recompute a recipe's stored totals from its ingredients
    Refresh { id: u64 },
}

#[derive(Args, Debug)]
pub struct RecipeArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub instructions: Option<String>,
    /// Meal the recipe suits; repeat for several
    #[arg(long = "meal")]
    pub meals: Vec<MealSlot>,
}

impl RecipeArgs {
    pub fn to_draft(&self) -> RecipeDraft {
        RecipeDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            instructions: self.instructions.clone(),
            suitable_for: self.meals.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct RecipeEditArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub instructions: Option<String>,
    /// Replaces the meal tags when given
    #[arg(long = "meal")]
    pub meals: Vec<MealSlot>,
}

impl RecipeEditArgs {
    pub fn apply(&self, draft: &mut RecipeDraft) {
        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if self.description.is_some() {
            draft.description = self.description.clone();
        }
        if self.instructions.is_some() {
            draft.instructions = self.instructions.clone();
        }
        if !self.meals.is_empty() {
            draft.suitable_for = self.meals.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum LogCommand {
    /// Log an amount of a food, in the food's unit
    Food {
        food_id: u64,
        quantity: f64,
        #[arg(long)]
        meal: MealSlot,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Log servings of a recipe (1 = the whole recipe)
    Recipe {
        recipe_id: u64,
        #[arg(default_value_t = 1.0)]
        servings: f64,
        #[arg(long)]
        meal: MealSlot,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete { id: u64 },
    /// Show a day's entries by meal with totals
    Day {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_food_add() {
        let cli = Cli::try_parse_from([
            "intake_tracker",
            "food",
            "add",
            "--name",
            "Granola",
            "--base-quantity",
            "40",
            "--calories",
            "100",
        ])
        .unwrap();
        match cli.command {
            Command::Food(FoodCommand::Add(args)) => {
                let draft = args.to_draft();
                assert_eq!(draft.base_unit, "g");
                assert_eq!(draft.base_quantity, 40.0);
                assert_eq!(draft.nutrients.calories, Some(100.0));
                assert_eq!(draft.nutrients.protein, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_log_recipe_with_defaults() {
        let cli = Cli::try_parse_from([
            "intake_tracker",
            "--data",
            "meals.json",
            "log",
            "recipe",
            "3",
            "--meal",
            "snack",
            "--date",
            "2024-03-01",
        ])
        .unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("meals.json")));
        match cli.command {
            Command::Log(LogCommand::Recipe {
                recipe_id,
                servings,
                meal,
                date,
            }) => {
                assert_eq!(recipe_id, 3);
                assert_eq!(servings, 1.0);
                assert_eq!(meal, MealSlot::Snacks);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_meal_is_rejected() {
        let result = Cli::try_parse_from([
            "intake_tracker",
            "log",
            "food",
            "1",
            "50",
            "--meal",
            "brunch",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_edit_args_only_touch_given_fields() {
        let mut draft = FoodDraft {
            name: "Granola".to_string(),
            base_unit: "g".to_string(),
            base_quantity: 40.0,
            nutrients: RawNutrients {
                calories: Some(100.0),
                protein: Some(3.0),
                ..Default::default()
            },
            notes: None,
        };
        let edit = FoodEditArgs {
            id: 1,
            name: None,
            unit: None,
            base_quantity: Some(50.0),
            nutrients: NutrientArgs {
                calories: Some(125.0),
                ..Default::default()
            },
            notes: None,
        };
        edit.apply(&mut draft);
        assert_eq!(draft.name, "Granola");
        assert_eq!(draft.base_quantity, 50.0);
        assert_eq!(draft.nutrients.calories, Some(125.0));
        assert_eq!(draft.nutrients.protein, Some(3.0));
    }
}
