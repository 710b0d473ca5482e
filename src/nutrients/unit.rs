use crate::errors::{Result, TrackerError};

/// Dimensionless factor relating a used quantity to the quantity a nutrient
/// record is defined for (`used / defined`).
///
/// Both quantities are assumed to be in the same unit already; unit labels
/// are never converted. `defined` must be present, finite and positive,
/// otherwise the basis is rejected and callers skip the contribution.
pub fn scale_factor(defined: Option<f64>, used: f64) -> Result<f64> {
    match defined {
        Some(basis) if basis.is_finite() && basis > 0.0 => Ok(used / basis),
        other => Err(TrackerError::InvalidBasis(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_factor_divides() {
        assert_eq!(scale_factor(Some(100.0), 50.0), Ok(0.5));
        assert_eq!(scale_factor(Some(100.0), 200.0), Ok(2.0));
        assert_eq!(scale_factor(Some(2.0), 3.0), Ok(1.5));
    }

    #[test]
    fn test_scale_factor_rejects_bad_basis() {
        assert_eq!(scale_factor(Some(0.0), 10.0), Err(TrackerError::InvalidBasis(Some(0.0))));
        assert_eq!(scale_factor(Some(-5.0), 10.0), Err(TrackerError::InvalidBasis(Some(-5.0))));
        assert_eq!(scale_factor(None, 10.0), Err(TrackerError::InvalidBasis(None)));
        assert!(scale_factor(Some(f64::NAN), 10.0).is_err());
        assert!(scale_factor(Some(f64::INFINITY), 10.0).is_err());
    }
}
