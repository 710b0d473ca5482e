use chrono::NaiveDate;

use crate::catalog::{LogEntry, MealSlot};
use crate::nutrients::NutrientVector;
use crate::store::LogStore;

/// Sums frozen log snapshots. Source type and meal slot do not matter once
/// a vector has been snapshotted.
pub fn summarize_day<'a, I>(entries: I) -> NutrientVector
where
    I: IntoIterator<Item = &'a NutrientVector>,
{
    NutrientVector::sum(entries)
}

/// Recomputed on every call; nothing is cached.
pub fn summarize<S: LogStore + ?Sized>(store: &S, date: NaiveDate) -> NutrientVector {
    let entries = store.entries_on(date);
    summarize_day(entries.iter().map(|entry| &entry.nutrients))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealEntries {
    pub meal: MealSlot,
    pub entries: Vec<LogEntry>,
    pub subtotal: NutrientVector,
}

/// Everything logged on one date, grouped by meal.
#[derive(Debug, Clone, PartialEq)]
pub struct DayLog {
    pub date: NaiveDate,
    /// One group per [`MealSlot`], in [`MealSlot::ALL`] order, empty groups
    /// included.
    pub meals: Vec<MealEntries>,
    pub summary: NutrientVector,
    pub previous: Option<NaiveDate>,
    pub next: Option<NaiveDate>,
}

pub fn day_log<S: LogStore + ?Sized>(store: &S, date: NaiveDate) -> DayLog {
    let entries = store.entries_on(date);
    let meals = MealSlot::ALL
        .iter()
        .map(|meal| {
            let entries: Vec<LogEntry> = entries
                .iter()
                .filter(|entry| entry.meal == *meal)
                .cloned()
                .collect();
            let subtotal = summarize_day(entries.iter().map(|entry| &entry.nutrients));
            MealEntries {
                meal: *meal,
                entries,
                subtotal,
            }
        })
        .collect();

    DayLog {
        date,
        meals,
        summary: summarize_day(entries.iter().map(|entry| &entry.nutrients)),
        previous: date.pred_opt(),
        next: date.succ_opt(),
    }
}
