//! Preparation rows
//!
//! Administered products with flow rate and duration, and the nutrition each
//! row delivers.

use serde::{Deserialize, Serialize};

use super::catalog::{NutrientProfile, ProductCatalog};
use super::totals::Nutrition;

/// Duration assumed when a row leaves it empty
pub const DEFAULT_DURATION_H: f64 = 24.0;
pub const MAX_DURATION_H: f64 = 24.0;

/// One administered nutrition product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparationRow {
    pub product: String,
    /// ml/h; ignored (solved) for the auto row
    pub flow_rate_ml_h: f64,
    pub duration_h: f64,
}

impl PreparationRow {
    pub fn new(product: impl Into<String>, flow_rate_ml_h: f64, duration_h: f64) -> Self {
        Self {
            product: product.into(),
            flow_rate_ml_h,
            duration_h,
        }
    }

    /// Flow rate with negative or non-finite values coerced to 0
    pub fn effective_rate(&self) -> f64 {
        sanitize_rate(self.flow_rate_ml_h)
    }

    /// Duration clamped to one day; non-finite values fall back to 24 h
    pub fn effective_duration(&self) -> f64 {
        sanitize_duration(self.duration_h)
    }
}

pub fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}

pub fn sanitize_duration(hours: f64) -> f64 {
    if hours.is_finite() {
        hours.clamp(0.0, MAX_DURATION_H)
    } else {
        DEFAULT_DURATION_H
    }
}

/// Resolve a row's product, falling back to the zero profile for unknown names
pub fn resolve_profile(catalog: &dyn ProductCatalog, product: &str) -> NutrientProfile {
    match catalog.lookup(product) {
        Some(profile) => profile,
        None => {
            if !product.trim().is_empty() {
                tracing::warn!("Unknown product '{}', counting it as zero nutrition", product);
            }
            NutrientProfile::zero()
        }
    }
}

/// Nutrition delivered by a row at a given rate
pub fn row_nutrition(rate_ml_h: f64, duration_h: f64, profile: &NutrientProfile) -> Nutrition {
    Nutrition::from_volume(rate_ml_h * duration_h, profile)
}

/// Energy and protein delivered by all rows except the auto row
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedContribution {
    pub kcal: f64,
    pub protein_g: f64,
}

/// Compute every row except `skip`. The skipped slot holds zero nutrition.
pub fn compute_fixed_rows(
    rows: &[PreparationRow],
    skip: Option<usize>,
    catalog: &dyn ProductCatalog,
) -> (Vec<Nutrition>, FixedContribution) {
    let mut fixed = FixedContribution::default();
    let computed = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            if Some(index) == skip {
                return Nutrition::zero();
            }
            let profile = resolve_profile(catalog, &row.product);
            let nutrition = row_nutrition(row.effective_rate(), row.effective_duration(), &profile);
            fixed.kcal += nutrition.kcal;
            fixed.protein_g += nutrition.protein_g;
            nutrition
        })
        .collect();
    (computed, fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::catalog::BuiltinCatalog;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_rate(-5.0), 0.0);
        assert_eq!(sanitize_rate(f64::NAN), 0.0);
        assert_eq!(sanitize_rate(42.5), 42.5);
        assert_eq!(sanitize_duration(30.0), 24.0);
        assert_eq!(sanitize_duration(-1.0), 0.0);
        assert_eq!(sanitize_duration(f64::NAN), 24.0);
        assert_eq!(sanitize_duration(12.0), 12.0);
    }

    #[test]
    fn test_row_nutrition() {
        let profile = NutrientProfile::new(1.0, 0.04, 0.039, 0.123);
        let n = row_nutrition(50.0, 24.0, &profile);
        assert_eq!(n.ml, 1200.0);
        assert!((n.kcal - 1200.0).abs() < 1e-9);
        assert!((n.protein_g - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_rows_skip_auto() {
        let rows = vec![
            PreparationRow::new("Nutrison", 50.0, 24.0),
            PreparationRow::new("Glucose 10%", 20.0, 12.0),
            PreparationRow::new("Aminoven 10%", 999.0, 24.0),
        ];
        let (computed, fixed) = compute_fixed_rows(&rows, Some(2), &BuiltinCatalog);
        assert_eq!(computed.len(), 3);
        assert_eq!(computed[2], Nutrition::zero());
        assert_eq!(computed[1].ml, 240.0);
        assert!((fixed.kcal - (1200.0 + 96.0)).abs() < 1e-9);
        assert!((fixed.protein_g - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_product_counts_volume_only() {
        let rows = vec![PreparationRow::new("Homemade broth", 10.0, 10.0)];
        let (computed, fixed) = compute_fixed_rows(&rows, None, &BuiltinCatalog);
        assert_eq!(computed[0].ml, 100.0);
        assert_eq!(computed[0].kcal, 0.0);
        assert_eq!(fixed, FixedContribution::default());
    }
}
