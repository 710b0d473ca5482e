pub mod catalog;
pub mod cli;
pub mod config;
pub mod day_summary;
pub mod errors;
pub mod log_snapshot;
pub mod logging;
pub mod nutrient_lookup;
pub mod nutrients;
pub mod recipe_aggregator;
pub mod store;
pub mod tracker;

pub use errors::{Result, TrackerError};
pub use nutrients::NutrientVector;
pub use tracker::Tracker;
