use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, warn};

use crate::catalog::{same_name, IngredientDraft, DEFAULT_BASIS_QUANTITY};
use crate::nutrients::{Nutrient, RawNutrients};

// Required column headers
const NAME_COL: &str = "Name";
const UNIT_COL: &str = "Unit";
const QUANTITY_COL: &str = "Quantity";

/// Reference nutrient data for one named item, already normalized to
/// `unit_quantity` of `unit`.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRecord {
    pub name: String,
    pub unit: String,
    pub unit_quantity: f64,
    pub nutrients: RawNutrients,
}

impl LookupRecord {
    /// A draft ingredient carrying this record's data unchanged.
    pub fn to_ingredient_draft(&self, name: &str, category: Option<String>) -> IngredientDraft {
        IngredientDraft {
            name: name.to_string(),
            category,
            typical_unit: self.unit.clone(),
            unit_quantity: self.unit_quantity,
            nutrients: self.nutrients.clone(),
            notes: Some(format!("Imported from reference entry '{}'", self.name)),
        }
    }
}

/// Best-effort source of nutrient data for new ingredients.
pub trait NutrientLookup {
    fn lookup(&self, name: &str) -> Option<LookupRecord>;
}

/// Reference table loaded from a CSV file.
#[derive(Debug, Clone, Default)]
pub struct CsvNutrientTable {
    records: Vec<LookupRecord>,
}

fn parse_optional_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// Header for a nutrient column, e.g. "Calories" or "Vitamin D".
fn nutrient_header(nutrient: Nutrient) -> String {
    let label = nutrient.label();
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl CsvNutrientTable {
    pub fn load(csv_path: &Path) -> Result<Self> {
        if !csv_path.exists() {
            return Err(anyhow::anyhow!("Reference CSV file not found at: {:?}", csv_path));
        }

        let file = std::fs::File::open(csv_path)
            .with_context(|| format!("Failed to open reference CSV file at {:?}", csv_path))?;
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        let name_idx = column(NAME_COL).ok_or_else(|| anyhow::anyhow!("Column '{}' not found", NAME_COL))?;
        let unit_idx = column(UNIT_COL).ok_or_else(|| anyhow::anyhow!("Column '{}' not found", UNIT_COL))?;
        let quantity_idx = column(QUANTITY_COL)
            .ok_or_else(|| anyhow::anyhow!("Column '{}' not found", QUANTITY_COL))?;
        let calories_header = nutrient_header(Nutrient::Calories);
        if column(calories_header.as_str()).is_none() {
            return Err(anyhow::anyhow!("Column '{}' not found", calories_header));
        }
        // Other nutrient columns are optional.
        let nutrient_columns: Vec<(Nutrient, usize)> = Nutrient::ALL
            .iter()
            .filter_map(|n| column(nutrient_header(*n).as_str()).map(|idx| (*n, idx)))
            .collect();

        let mut records = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;

            let name = record.get(name_idx).unwrap_or_default().trim().to_string();
            if name.is_empty() {
                continue;
            }

            let unit = match record.get(unit_idx).map(str::trim) {
                Some(unit) if !unit.is_empty() => unit.to_string(),
                _ => crate::catalog::DEFAULT_UNIT.to_string(),
            };

            let quantity_cell = record.get(quantity_idx).unwrap_or_default().trim();
            let unit_quantity = if quantity_cell.is_empty() {
                DEFAULT_BASIS_QUANTITY
            } else {
                match parse_optional_f64(quantity_cell) {
                    Some(q) if q.is_finite() && q > 0.0 => q,
                    _ => {
                        warn!(row = row_index + 1, name = %name, quantity = quantity_cell, "skipping reference row with invalid quantity");
                        continue;
                    }
                }
            };

            let mut nutrients = RawNutrients::default();
            for (nutrient, idx) in &nutrient_columns {
                nutrients.set(*nutrient, record.get(*idx).and_then(parse_optional_f64));
            }

            records.push(LookupRecord {
                name,
                unit,
                unit_quantity,
                nutrients,
            });
        }

        if records.is_empty() {
            return Err(anyhow::anyhow!("No valid reference data loaded from {:?}", csv_path));
        }

        debug!(path = ?csv_path, rows = records.len(), "reference table loaded");
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl NutrientLookup for CsvNutrientTable {
    fn lookup(&self, name: &str) -> Option<LookupRecord> {
        self.records
            .iter()
            .find(|record| same_name(&record.name, name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv_file() -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Name,Unit,Quantity,Calories,Protein,Carbs,Fat,Vitamin D")?;
        writeln!(file, "Rice,g,100,130,2.7,28,0.3,0")?;
        writeln!(file, "Egg,piece,1,72,6.3,0.4,4.8,1.1")?;
        writeln!(file, "Milk,ml,,42,,5,1,")?; // Quantity defaults, blanks stay missing
        writeln!(file, ",g,100,10,10,10,10,10")?; // Empty name
        writeln!(file, "Broken,g,zero,10,10,10,10,10")?; // Invalid quantity
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_reference_table() -> Result<()> {
        let file = create_test_csv_file()?;
        let table = CsvNutrientTable::load(file.path())?;

        assert_eq!(table.len(), 3);

        let egg = table.lookup("egg").unwrap();
        assert_eq!(egg.unit, "piece");
        assert_eq!(egg.unit_quantity, 1.0);
        assert_eq!(egg.nutrients.calories, Some(72.0));
        assert_eq!(egg.nutrients.vitamin_d, Some(1.1));
        assert_eq!(egg.nutrients.sodium, None); // no column

        let milk = table.lookup("Milk").unwrap();
        assert_eq!(milk.unit_quantity, 100.0);
        assert_eq!(milk.nutrients.protein, None);

        assert!(table.lookup("Broken").is_none());
        Ok(())
    }

    #[test]
    fn test_missing_required_column() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Name,Unit,Quantity,Protein")?;
        writeln!(file, "Rice,g,100,2.7")?;
        file.flush()?;

        let result = CsvNutrientTable::load(file.path());
        assert!(result.unwrap_err().to_string().contains("Column 'Calories' not found"));
        Ok(())
    }

    #[test]
    fn test_headers_only_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Name,Unit,Quantity,Calories")?;
        file.flush()?;

        let result = CsvNutrientTable::load(file.path());
        assert!(result.unwrap_err().to_string().contains("No valid reference data"));
        Ok(())
    }

    #[test]
    fn test_file_not_found() {
        let result = CsvNutrientTable::load(Path::new("this_file_does_not_exist.csv"));
        assert!(result.unwrap_err().to_string().contains("Reference CSV file not found"));
    }

    #[test]
    fn test_record_to_draft_keeps_basis() {
        let record = LookupRecord {
            name: "Rice, white".to_string(),
            unit: "g".to_string(),
            unit_quantity: 100.0,
            nutrients: RawNutrients {
                calories: Some(130.0),
                ..Default::default()
            },
        };
        let draft = record.to_ingredient_draft("Rice", Some("Grain".to_string()));
        assert_eq!(draft.unit_quantity, 100.0);
        assert_eq!(draft.nutrients.calories, Some(130.0));
        assert_eq!(draft.category.as_deref(), Some("Grain"));
    }
}
