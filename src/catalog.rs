use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{RecordKind, Result, TrackerError};
use crate::nutrients::{Nutrient, NutrientVector, RawNutrients};

pub type FoodId = u64;
pub type IngredientId = u64;
pub type RecipeId = u64;
pub type LinkId = u64;
pub type LogEntryId = u64;

const MAX_NAME_LEN: usize = 150;
const MAX_RECIPE_NAME_LEN: usize = 200;
const MAX_UNIT_LEN: usize = 50;
const MAX_CATEGORY_LEN: usize = 100;

pub const DEFAULT_UNIT: &str = "g";
pub const DEFAULT_BASIS_QUANTITY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealSlot {
    /// Display order of a day.
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snacks,
    ];
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MealSlot::Breakfast => "Breakfast",
            MealSlot::Lunch => "Lunch",
            MealSlot::Dinner => "Dinner",
            MealSlot::Snacks => "Snacks",
        };
        f.write_str(name)
    }
}

impl FromStr for MealSlot {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealSlot::Breakfast),
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            "snack" | "snacks" => Ok(MealSlot::Snacks),
            other => Err(TrackerError::Validation(format!("unknown meal slot '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: FoodId,
    pub name: String,
    pub base_unit: String,
    /// Amount of `base_unit` the nutrients are defined for.
    pub base_quantity: f64,
    pub nutrients: NutrientVector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub typical_unit: String,
    /// Amount of `typical_unit` the nutrients are defined for.
    pub unit_quantity: f64,
    pub nutrients: NutrientVector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Empty means suitable for any meal.
    #[serde(default)]
    pub suitable_for: Vec<MealSlot>,
    /// Derived from the recipe's links. `None` while the recipe has no
    /// ingredients.
    #[serde(default)]
    pub cached_total: Option<NutrientVector>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ingredient used in a recipe. `quantity` is in the ingredient's
/// `typical_unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLink {
    pub id: LinkId,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    Food(FoodId),
    Recipe(RecipeId),
}

/// A consumption event with its nutrients frozen at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub date: NaiveDate,
    pub meal: MealSlot,
    pub source: LogSource,
    /// Raw quantity in the food's `base_unit`, or a servings multiplier for
    /// recipes.
    pub quantity_consumed: f64,
    pub nutrients: NutrientVector,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodDraft {
    pub name: String,
    pub base_unit: String,
    pub base_quantity: f64,
    #[serde(default)]
    pub nutrients: RawNutrients,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FoodDraft {
    /// Returns a trimmed copy, or the first problem found.
    pub fn validate(&self) -> Result<FoodDraft> {
        Ok(FoodDraft {
            name: required_text("name", &self.name, MAX_NAME_LEN)?,
            base_unit: required_text("base unit", &self.base_unit, MAX_UNIT_LEN)?,
            base_quantity: basis_quantity("base quantity", self.base_quantity)?,
            nutrients: nutrient_values(&self.nutrients)?,
            notes: optional_text(self.notes.as_deref()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientDraft {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub typical_unit: String,
    pub unit_quantity: f64,
    #[serde(default)]
    pub nutrients: RawNutrients,
    #[serde(default)]
    pub notes: Option<String>,
}

impl IngredientDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            typical_unit: DEFAULT_UNIT.to_string(),
            unit_quantity: DEFAULT_BASIS_QUANTITY,
            nutrients: RawNutrients::default(),
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<IngredientDraft> {
        let category = optional_text(self.category.as_deref());
        if let Some(category) = &category {
            check_len("category", category, MAX_CATEGORY_LEN)?;
        }
        Ok(IngredientDraft {
            name: required_text("name", &self.name, MAX_NAME_LEN)?,
            category,
            typical_unit: required_text("typical unit", &self.typical_unit, MAX_UNIT_LEN)?,
            unit_quantity: basis_quantity("unit quantity", self.unit_quantity)?,
            nutrients: nutrient_values(&self.nutrients)?,
            notes: optional_text(self.notes.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub suitable_for: Vec<MealSlot>,
}

impl RecipeDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<RecipeDraft> {
        let mut suitable_for = self.suitable_for.clone();
        suitable_for.sort();
        suitable_for.dedup();
        Ok(RecipeDraft {
            name: required_text("name", &self.name, MAX_RECIPE_NAME_LEN)?,
            description: optional_text(self.description.as_deref()),
            instructions: optional_text(self.instructions.as_deref()),
            suitable_for,
        })
    }
}

impl From<&Food> for FoodDraft {
    fn from(food: &Food) -> Self {
        Self {
            name: food.name.clone(),
            base_unit: food.base_unit.clone(),
            base_quantity: food.base_quantity,
            nutrients: food.nutrients.to_raw(),
            notes: food.notes.clone(),
        }
    }
}

impl From<&Ingredient> for IngredientDraft {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            name: ingredient.name.clone(),
            category: ingredient.category.clone(),
            typical_unit: ingredient.typical_unit.clone(),
            unit_quantity: ingredient.unit_quantity,
            nutrients: ingredient.nutrients.to_raw(),
            notes: ingredient.notes.clone(),
        }
    }
}

impl From<&Recipe> for RecipeDraft {
    fn from(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            instructions: recipe.instructions.clone(),
            suitable_for: recipe.suitable_for.clone(),
        }
    }
}

/// Case-insensitive name comparison used for uniqueness checks.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub(crate) fn ensure_unique_name<'a, I>(
    kind: RecordKind,
    name: &str,
    existing: I,
) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    if existing.into_iter().any(|other| same_name(other, name)) {
        return Err(TrackerError::DuplicateName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn required_text(field: &str, value: &str, max_len: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::Validation(format!("{} is required", field)));
    }
    check_len(field, trimmed, max_len)?;
    Ok(trimmed.to_string())
}

fn check_len(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.chars().count() > max_len {
        return Err(TrackerError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn basis_quantity(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(TrackerError::Validation(format!(
            "{} must be a positive number, got {}",
            field, value
        )))
    }
}

/// Entered nutrient values may be missing but never negative or non-finite.
fn nutrient_values(raw: &RawNutrients) -> Result<RawNutrients> {
    for &nutrient in Nutrient::ALL {
        if let Some(value) = raw.get(nutrient) {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackerError::Validation(format!(
                    "{} must be zero or more, got {}",
                    nutrient.label(),
                    value
                )));
            }
        }
    }
    Ok(raw.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_draft_trims_and_validates() {
        let draft = FoodDraft {
            name: "  Oat Milk ".to_string(),
            base_unit: " ml".to_string(),
            base_quantity: 250.0,
            nutrients: RawNutrients::default(),
            notes: Some("   ".to_string()),
        };
        let valid = draft.validate().unwrap();
        assert_eq!(valid.name, "Oat Milk");
        assert_eq!(valid.base_unit, "ml");
        assert_eq!(valid.notes, None);
    }

    #[test]
    fn test_food_draft_rejects_zero_basis() {
        let draft = FoodDraft {
            name: "Bread".to_string(),
            base_unit: "slice".to_string(),
            base_quantity: 0.0,
            nutrients: RawNutrients::default(),
            notes: None,
        };
        assert!(matches!(draft.validate(), Err(TrackerError::Validation(_))));
    }

    #[test]
    fn test_negative_nutrient_is_rejected() {
        let draft = FoodDraft {
            name: "Bread".to_string(),
            base_unit: "slice".to_string(),
            base_quantity: 1.0,
            nutrients: RawNutrients {
                calories: Some(-100.0),
                ..Default::default()
            },
            notes: None,
        };
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, TrackerError::Validation(msg) if msg.contains("calories")));

        let mut ingredient = IngredientDraft::new("Salt");
        ingredient.nutrients.sodium = Some(f64::NAN);
        assert!(matches!(ingredient.validate(), Err(TrackerError::Validation(_))));

        ingredient.nutrients.sodium = Some(0.0);
        assert!(ingredient.validate().is_ok());
    }

    #[test]
    fn test_ingredient_draft_defaults() {
        let draft = IngredientDraft::new("Rice");
        assert_eq!(draft.typical_unit, "g");
        assert_eq!(draft.unit_quantity, 100.0);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_ingredient_draft_rejects_long_name() {
        let draft = IngredientDraft::new("x".repeat(151));
        assert!(matches!(draft.validate(), Err(TrackerError::Validation(_))));
    }

    #[test]
    fn test_recipe_draft_requires_name() {
        assert!(RecipeDraft::new("   ").validate().is_err());
    }

    #[test]
    fn test_meal_slot_parsing() {
        assert_eq!("snack".parse::<MealSlot>().unwrap(), MealSlot::Snacks);
        assert_eq!("Dinner".parse::<MealSlot>().unwrap(), MealSlot::Dinner);
        assert!("brunch".parse::<MealSlot>().is_err());
    }

    #[test]
    fn test_unique_name_is_case_insensitive() {
        let names = ["Rice", "Beans"];
        assert!(ensure_unique_name(RecordKind::Ingredient, "rice ", names).is_err());
        assert!(ensure_unique_name(RecordKind::Ingredient, "Lentils", names).is_ok());
    }

    #[test]
    fn test_log_source_serializes_tagged() {
        let json = serde_json::to_string(&LogSource::Recipe(3)).unwrap();
        assert_eq!(json, r#"{"recipe":3}"#);
    }
}
