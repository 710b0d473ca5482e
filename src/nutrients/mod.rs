//! Fixed-schema nutrient values and the arithmetic the rest of the crate
//! builds on.
//!
//! Two forms exist:
//! * [`RawNutrients`] is the boundary form, one `Option<f64>` per nutrient,
//!   exactly as it was typed in, read from a CSV, or returned by a lookup.
//! * [`NutrientVector`] is the sanitized form. Every field is finite and
//!   non-negative, which makes it safe to scale and sum without checks.

pub mod unit;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use unit::scale_factor;

/// Maps a raw value onto the domain: missing, non-finite and negative
/// values all become `0.0`.
pub fn sanitize(raw: Option<f64>) -> f64 {
    match raw {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

fn clamp(value: f64) -> f64 {
    sanitize(Some(value))
}

macro_rules! nutrient_schema {
    ($( $variant:ident => $field:ident, $label:literal, $unit:literal; )*) => {
        /// One tracked nutrient. Order matches the field order of
        /// [`NutrientVector`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Nutrient {
            $( $variant, )*
        }

        impl Nutrient {
            pub const ALL: &'static [Nutrient] = &[$( Nutrient::$variant, )*];

            pub fn label(self) -> &'static str {
                match self {
                    $( Nutrient::$variant => $label, )*
                }
            }

            pub fn unit(self) -> &'static str {
                match self {
                    $( Nutrient::$variant => $unit, )*
                }
            }
        }

        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct RawNutrients {
            $(
                #[serde(default)]
                pub $field: Option<f64>,
            )*
        }

        impl RawNutrients {
            pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
                match nutrient {
                    $( Nutrient::$variant => self.$field, )*
                }
            }

            pub fn set(&mut self, nutrient: Nutrient, value: Option<f64>) {
                match nutrient {
                    $( Nutrient::$variant => self.$field = value, )*
                }
            }
        }

        #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
        #[serde(from = "RawNutrients")]
        pub struct NutrientVector {
            $( $field: f64, )*
        }

        impl NutrientVector {
            $(
                pub fn $field(&self) -> f64 {
                    self.$field
                }
            )*

            pub fn get(&self, nutrient: Nutrient) -> f64 {
                match nutrient {
                    $( Nutrient::$variant => self.$field, )*
                }
            }

            /// Returns a copy with `nutrient` set to the sanitized `value`.
            pub fn with(mut self, nutrient: Nutrient, value: f64) -> Self {
                let value = clamp(value);
                match nutrient {
                    $( Nutrient::$variant => self.$field = value, )*
                }
                self
            }

            pub fn from_raw(raw: &RawNutrients) -> Self {
                Self {
                    $( $field: sanitize(raw.$field), )*
                }
            }

            pub fn to_raw(&self) -> RawNutrients {
                RawNutrients {
                    $( $field: Some(self.$field), )*
                }
            }

            fn map(&self, f: impl Fn(f64) -> f64) -> Self {
                Self {
                    $( $field: clamp(f(self.$field)), )*
                }
            }

            fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
                Self {
                    $( $field: clamp(f(self.$field, other.$field)), )*
                }
            }
        }
    };
}

nutrient_schema! {
    Calories => calories, "calories", "kcal";
    Protein => protein, "protein", "g";
    Carbs => carbs, "carbs", "g";
    Fat => fat, "fat", "g";
    Fiber => fiber, "fiber", "g";
    Sugar => sugar, "sugar", "g";
    Calcium => calcium, "calcium", "mg";
    Iron => iron, "iron", "mg";
    Potassium => potassium, "potassium", "mg";
    Sodium => sodium, "sodium", "mg";
    VitaminD => vitamin_d, "vitamin D", "µg";
}

impl From<RawNutrients> for NutrientVector {
    fn from(raw: RawNutrients) -> Self {
        NutrientVector::from_raw(&raw)
    }
}

impl NutrientVector {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Elementwise multiply. Results that come out negative or non-finite
    /// (negative or NaN multipliers, overflow) are clamped to `0.0`.
    pub fn scale(&self, multiplier: f64) -> Self {
        self.map(|value| value * multiplier)
    }

    pub fn add(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a + b)
    }

    /// Elementwise sum of any number of vectors; an empty input yields the
    /// all-zero vector.
    pub fn sum<'a, I>(vectors: I) -> Self
    where
        I: IntoIterator<Item = &'a NutrientVector>,
    {
        vectors
            .into_iter()
            .fold(Self::zero(), |total, vector| total.add(vector))
    }

    pub fn is_zero(&self) -> bool {
        Nutrient::ALL.iter().all(|n| self.get(*n) == 0.0)
    }

    /// Field-by-field comparison within an absolute tolerance.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        Nutrient::ALL
            .iter()
            .all(|n| (self.get(*n) - other.get(*n)).abs() <= tolerance)
    }
}

impl fmt::Display for NutrientVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, nutrient) in Nutrient::ALL.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {:.1} {}", nutrient.label(), self.get(*nutrient), nutrient.unit())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_vector(rng: &mut StdRng) -> NutrientVector {
        Nutrient::ALL.iter().fold(NutrientVector::zero(), |v, n| {
            v.with(*n, rng.gen_range(0.0..1000.0))
        })
    }

    #[test]
    fn test_sanitize_floors_bad_values() {
        assert_eq!(sanitize(None), 0.0);
        assert_eq!(sanitize(Some(f64::NAN)), 0.0);
        assert_eq!(sanitize(Some(f64::INFINITY)), 0.0);
        assert_eq!(sanitize(Some(-3.0)), 0.0);
        assert_eq!(sanitize(Some(12.5)), 12.5);
    }

    #[test]
    fn test_from_raw_fills_missing_with_zero() {
        let raw = RawNutrients {
            calories: Some(250.0),
            protein: None,
            fat: Some(-1.0),
            ..Default::default()
        };
        let vector = NutrientVector::from_raw(&raw);
        assert_eq!(vector.calories(), 250.0);
        assert_eq!(vector.protein(), 0.0);
        assert_eq!(vector.fat(), 0.0);
        assert_eq!(vector.vitamin_d(), 0.0);
    }

    #[test]
    fn test_deserialize_sanitizes() {
        let json = r#"{"calories": 120.0, "protein": null, "sugar": -4.0}"#;
        let vector: NutrientVector = serde_json::from_str(json).unwrap();
        assert_eq!(vector.calories(), 120.0);
        assert_eq!(vector.protein(), 0.0);
        assert_eq!(vector.sugar(), 0.0);
        assert_eq!(vector.iron(), 0.0);
    }

    #[test]
    fn test_scale_identity_and_clamping() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let v = random_vector(&mut rng);
            assert_eq!(v.scale(1.0), v);
            assert!(v.scale(-2.0).is_zero());
            assert!(v.scale(f64::NAN).is_zero());
            assert!(v.scale(f64::NEG_INFINITY).is_zero());
            assert!(v.scale(0.0).is_zero());
        }
    }

    #[test]
    fn test_scale_overflow_clamps_to_zero() {
        let v = NutrientVector::zero().with(Nutrient::Calories, f64::MAX);
        assert_eq!(v.scale(10.0).calories(), 0.0);
    }

    #[test]
    fn test_sum_is_commutative() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let a = random_vector(&mut rng);
            let b = random_vector(&mut rng);
            assert_eq!(NutrientVector::sum([&a, &b]), NutrientVector::sum([&b, &a]));
        }
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let empty: Vec<NutrientVector> = Vec::new();
        assert!(NutrientVector::sum(&empty).is_zero());
    }

    #[test]
    fn test_with_rejects_negative() {
        let v = NutrientVector::zero().with(Nutrient::Iron, -0.5);
        assert_eq!(v.iron(), 0.0);
    }
}
