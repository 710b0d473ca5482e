use std::fmt;

use thiserror::Error;

/// The kind of record an operation or link refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Food,
    Ingredient,
    Recipe,
    RecipeLink,
    LogEntry,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Food => "food",
            RecordKind::Ingredient => "ingredient",
            RecordKind::Recipe => "recipe",
            RecordKind::RecipeLink => "recipe ingredient",
            RecordKind::LogEntry => "log entry",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackerError {
    /// The quantity a nutrient record is defined for is unusable.
    #[error("invalid basis quantity: {0:?}")]
    InvalidBasis(Option<f64>),

    /// A consumed quantity or servings multiplier that is not strictly positive.
    #[error("quantity must be a positive number, got {0}")]
    InvalidQuantity(f64),

    #[error("{kind} {id} referenced but missing")]
    BrokenReference { kind: RecordKind, id: u64 },

    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: u64 },

    #[error("a {kind} named '{name}' already exists")]
    DuplicateName { kind: RecordKind, name: String },

    #[error("ingredient {ingredient_id} is already part of recipe {recipe_id}")]
    DuplicateLink { recipe_id: u64, ingredient_id: u64 },

    #[error("no reference nutrient data for '{0}'")]
    NoReferenceData(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
