use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use intake_tracker::catalog::{FoodDraft, IngredientDraft, LogEntry, LogSource, RecipeDraft};
use intake_tracker::cli::{
    parse_args, Command, FoodCommand, IngredientCommand, LogCommand, RecipeCommand,
};
use intake_tracker::config::Config;
use intake_tracker::errors::RecordKind;
use intake_tracker::logging::init_logging;
use intake_tracker::nutrient_lookup::CsvNutrientTable;
use intake_tracker::nutrients::NutrientVector;
use intake_tracker::store::JsonFileStore;
use intake_tracker::tracker::Tracker;
use tracing::{debug, warn};

/// Whether a command changed the store and it needs saving.
type Changed = bool;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn missing(kind: RecordKind, id: u64) -> anyhow::Error {
    anyhow::anyhow!("{} {} not found", kind, id)
}

fn run_food(tracker: &mut Tracker, command: FoodCommand) -> Result<Changed> {
    match command {
        FoodCommand::Add(args) => {
            let food = tracker.add_food(&args.to_draft())?;
            println!("Added food #{}: {}", food.id, food.name);
            Ok(true)
        }
        FoodCommand::Edit(args) => {
            let current = tracker
                .food(args.id)
                .ok_or_else(|| missing(RecordKind::Food, args.id))?;
            let mut draft = FoodDraft::from(&current);
            args.apply(&mut draft);
            let food = tracker.edit_food(args.id, &draft)?;
            println!("Updated food #{}: {}", food.id, food.name);
            Ok(true)
        }
        FoodCommand::Delete { id } => {
            let removal = tracker.delete_food(id)?;
            println!(
                "Deleted food #{} ({}) and {} log entries",
                id, removal.record.name, removal.cascaded
            );
            Ok(true)
        }
        FoodCommand::List => {
            for food in tracker.list_foods() {
                println!(
                    "#{:<4} {} (per {} {}): {}",
                    food.id, food.name, food.base_quantity, food.base_unit, food.nutrients
                );
            }
            Ok(false)
        }
    }
}

fn run_ingredient(
    tracker: &mut Tracker,
    config: &Config,
    command: IngredientCommand,
) -> Result<Changed> {
    match command {
        IngredientCommand::Add(args) => {
            let ingredient = tracker.add_ingredient(&args.to_draft())?;
            println!("Added ingredient #{}: {}", ingredient.id, ingredient.name);
            Ok(true)
        }
        IngredientCommand::Edit(args) => {
            let current = tracker
                .ingredient(args.id)
                .ok_or_else(|| missing(RecordKind::Ingredient, args.id))?;
            let mut draft = IngredientDraft::from(&current);
            args.apply(&mut draft);
            let update = tracker.edit_ingredient(args.id, &draft)?;
            println!(
                "Updated ingredient #{}: {} ({} recipes refreshed)",
                update.ingredient.id,
                update.ingredient.name,
                update.refreshed_recipes.len()
            );
            Ok(true)
        }
        IngredientCommand::Delete { id } => {
            let removal = tracker.delete_ingredient(id)?;
            println!(
                "Deleted ingredient #{} ({}), removed from {} recipes",
                id,
                removal.record.name,
                removal.refreshed_recipes.len()
            );
            Ok(true)
        }
        IngredientCommand::List => {
            for ingredient in tracker.list_ingredients() {
                println!(
                    "#{:<4} {} [{}] (per {} {}): {}",
                    ingredient.id,
                    ingredient.name,
                    ingredient.category.as_deref().unwrap_or("uncategorized"),
                    ingredient.unit_quantity,
                    ingredient.typical_unit,
                    ingredient.nutrients
                );
            }
            Ok(false)
        }
        IngredientCommand::Import { name, category } => {
            let csv_path = config.reference_csv.as_ref().ok_or_else(|| {
                anyhow::anyhow!("No reference CSV configured; pass --reference-csv")
            })?;
            let table = CsvNutrientTable::load(csv_path)
                .with_context(|| format!("Failed to load reference table {:?}", csv_path))?;
            let ingredient = tracker.import_ingredient(&name, category, &table)?;
            println!(
                "Imported ingredient #{}: {} (per {} {}): {}",
                ingredient.id,
                ingredient.name,
                ingredient.unit_quantity,
                ingredient.typical_unit,
                ingredient.nutrients
            );
            Ok(true)
        }
    }
}

fn print_recipe(tracker: &Tracker, id: u64) -> Result<()> {
    let detail = tracker.recipe_detail(id)?;
    let recipe = &detail.recipe;
    println!("#{} {}", recipe.id, recipe.name);
    if !recipe.suitable_for.is_empty() {
        let meals: Vec<String> = recipe.suitable_for.iter().map(|m| m.to_string()).collect();
        println!("Suitable for: {}", meals.join(", "));
    }
    if let Some(description) = &recipe.description {
        println!("{}", description);
    }

    println!("Ingredients:");
    if detail.lines.is_empty() {
        println!("  (none)");
    }
    for line in &detail.lines {
        match &line.ingredient {
            Some(ingredient) => println!(
                "  [{}] {} {} {}",
                line.link.id, line.link.quantity, ingredient.typical_unit, ingredient.name
            ),
            None => println!(
                "  [{}] {} of missing ingredient #{}",
                line.link.id, line.link.quantity, line.link.ingredient_id
            ),
        }
    }

    if let Some(instructions) = &recipe.instructions {
        println!("Instructions:\n{}", instructions);
    }

    match &recipe.cached_total {
        Some(total) => println!("Total: {}", total),
        None => println!("Total: unknown (no ingredients)"),
    }
    if let Some(note) = detail.aggregation.excluded_note() {
        println!("{}", note);
    }
    for skipped in &detail.aggregation.skipped {
        warn!(
            recipe_id = id,
            link_id = skipped.link_id,
            reason = %skipped.reason,
            "ingredient excluded from totals"
        );
    }
    Ok(())
}

fn run_recipe(tracker: &mut Tracker, command: RecipeCommand) -> Result<Changed> {
    match command {
        RecipeCommand::Create(args) => {
            let recipe = tracker.create_recipe(&args.to_draft())?;
            println!("Created recipe #{}: {}", recipe.id, recipe.name);
            Ok(true)
        }
        RecipeCommand::Edit { id, recipe } => {
            let current = tracker
                .recipe(id)
                .ok_or_else(|| missing(RecordKind::Recipe, id))?;
            let mut draft = RecipeDraft::from(&current);
            recipe.apply(&mut draft);
            let updated = tracker.edit_recipe(id, &draft)?;
            println!("Updated recipe #{}: {}", updated.id, updated.name);
            Ok(true)
        }
        RecipeCommand::Delete { id } => {
            let removal = tracker.delete_recipe(id)?;
            println!(
                "Deleted recipe #{} ({}) and {} log entries",
                id, removal.record.name, removal.cascaded
            );
            Ok(true)
        }
        RecipeCommand::List => {
            for recipe in tracker.list_recipes() {
                let calories = recipe
                    .cached_total
                    .as_ref()
                    .map(|total| format!("{:.0} kcal", total.calories()))
                    .unwrap_or_else(|| "no ingredients".to_string());
                let note = tracker
                    .recipe_detail(recipe.id)?
                    .aggregation
                    .excluded_note()
                    .map(|note| format!(" {}", note))
                    .unwrap_or_default();
                println!("#{:<4} {} ({}){}", recipe.id, recipe.name, calories, note);
            }
            Ok(false)
        }
        RecipeCommand::Show { id } => {
            print_recipe(tracker, id)?;
            Ok(false)
        }
        RecipeCommand::AddIngredient {
            recipe_id,
            ingredient_id,
            quantity,
        } => {
            let change = tracker.add_recipe_ingredient(recipe_id, ingredient_id, quantity)?;
            println!(
                "Added ingredient #{} to recipe #{} as line [{}]",
                ingredient_id, recipe_id, change.link.id
            );
            println!("Total: {}", change.aggregation.totals);
            if let Some(note) = change.aggregation.excluded_note() {
                println!("{}", note);
            }
            Ok(true)
        }
        RecipeCommand::RemoveIngredient { link_id } => {
            let change = tracker.remove_recipe_ingredient(link_id)?;
            println!(
                "Removed line [{}] from recipe #{}",
                link_id, change.link.recipe_id
            );
            match change.aggregation.cached_total() {
                Some(total) => println!("Total: {}", total),
                None => println!("Total: unknown (no ingredients)"),
            }
            Ok(true)
        }
        RecipeCommand::Refresh { id } => {
            let aggregation = tracker.refresh_recipe(id)?;
            println!(
                "Refreshed recipe #{} from {} ingredients ({} skipped)",
                id,
                aggregation.link_count,
                aggregation.skipped.len()
            );
            Ok(true)
        }
    }
}

fn describe_entry(tracker: &Tracker, entry: &LogEntry) -> String {
    let name = tracker
        .source_name(entry.source)
        .unwrap_or_else(|| "(deleted)".to_string());
    let amount = match entry.source {
        LogSource::Food(id) => {
            let unit = tracker.food(id).map(|f| f.base_unit).unwrap_or_default();
            format!("{} {}", entry.quantity_consumed, unit)
        }
        LogSource::Recipe(_) => format!("x{}", entry.quantity_consumed),
    };
    format!(
        "#{:<4} {} {}: {:.0} kcal",
        entry.id,
        name,
        amount.trim_end(),
        entry.nutrients.calories()
    )
}

fn print_totals(label: &str, totals: &NutrientVector) {
    println!("{}: {}", label, totals);
}

fn run_log(tracker: &mut Tracker, command: LogCommand) -> Result<Changed> {
    match command {
        LogCommand::Food {
            food_id,
            quantity,
            meal,
            date,
        } => {
            let entry = tracker.log_food(date.unwrap_or_else(today), meal, food_id, quantity)?;
            println!("Logged {} for {} on {}", describe_entry(tracker, &entry), meal, entry.date);
            Ok(true)
        }
        LogCommand::Recipe {
            recipe_id,
            servings,
            meal,
            date,
        } => {
            let entry =
                tracker.log_recipe(date.unwrap_or_else(today), meal, recipe_id, servings)?;
            println!("Logged {} for {} on {}", describe_entry(tracker, &entry), meal, entry.date);
            Ok(true)
        }
        LogCommand::Delete { id } => {
            let entry = tracker.delete_log_entry(id)?;
            println!("Deleted log entry #{} from {}", entry.id, entry.date);
            Ok(true)
        }
        LogCommand::Day { date } => {
            let day = tracker.day_log(date.unwrap_or_else(today));
            println!("{}", day.date.format("%A %Y-%m-%d"));
            for meal in &day.meals {
                println!("\n{}", meal.meal);
                if meal.entries.is_empty() {
                    println!("  (nothing logged)");
                    continue;
                }
                for entry in &meal.entries {
                    println!("  {}", describe_entry(tracker, entry));
                }
                println!("  subtotal: {:.0} kcal", meal.subtotal.calories());
            }
            println!();
            print_totals("Day total", &day.summary);
            if let (Some(previous), Some(next)) = (day.previous, day.next) {
                println!("(previous: {}, next: {})", previous, next);
            }
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args();
    let config = Config::from_env().with_overrides(
        cli.data.clone(),
        cli.reference_csv.clone(),
        cli.log_level.clone(),
    );
    init_logging(&config.log_level)?;
    debug!(?config, "configuration resolved");

    let file_store = JsonFileStore::new(&config.data_path);
    let store = file_store
        .load()
        .await
        .with_context(|| format!("Failed to load data from {:?}", config.data_path))?;
    let mut tracker = Tracker::new(store);

    let changed = match cli.command {
        Command::Food(command) => run_food(&mut tracker, command)?,
        Command::Ingredient(command) => run_ingredient(&mut tracker, &config, command)?,
        Command::Recipe(command) => run_recipe(&mut tracker, command)?,
        Command::Log(command) => run_log(&mut tracker, command)?,
    };

    if changed {
        file_store
            .save(tracker.store())
            .await
            .with_context(|| format!("Failed to save data to {:?}", config.data_path))?;
    }
    Ok(())
}
