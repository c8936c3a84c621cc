//! Goal fulfillment
//!
//! Compares delivered totals against the goals and buckets each comparison
//! into deficit / optimal / excess.

use serde::{Deserialize, Serialize};

use super::goals::ProteinGoal;
use super::totals::Nutrition;

/// Tolerance for goal comparisons
pub const STATUS_EPSILON: f64 = 0.05;
/// Energy above the recommended goal by this many kcal counts as excess
pub const KCAL_EXCESS_THRESHOLD: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    Deficit,
    Optimal,
    Excess,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Deficit => "deficit",
            FulfillmentStatus::Optimal => "optimal",
            FulfillmentStatus::Excess => "excess",
        }
    }
}

/// Status of a value against an inclusive `[min, max]` range
pub fn range_status(value: f64, min: f64, max: f64, epsilon: f64) -> FulfillmentStatus {
    if value < min - epsilon {
        FulfillmentStatus::Deficit
    } else if value > max + epsilon {
        FulfillmentStatus::Excess
    } else {
        FulfillmentStatus::Optimal
    }
}

/// Status of an energy difference (delivered minus recommended)
pub fn kcal_status(diff_kcal: f64, epsilon: f64) -> FulfillmentStatus {
    if diff_kcal < -epsilon {
        FulfillmentStatus::Deficit
    } else if diff_kcal >= KCAL_EXCESS_THRESHOLD {
        FulfillmentStatus::Excess
    } else {
        FulfillmentStatus::Optimal
    }
}

/// Fluid is binary: within the limit or over it. Over the limit is reported
/// as `Deficit`. No status without a positive limit.
pub fn fluid_status(total_ml: f64, limit_ml: Option<f64>) -> Option<FulfillmentStatus> {
    match limit_ml {
        Some(limit) if limit > 0.0 => Some(if total_ml <= limit {
            FulfillmentStatus::Optimal
        } else {
            FulfillmentStatus::Deficit
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub diff_kcal: f64,
    pub diff_protein_min_g: f64,
    pub diff_protein_max_g: f64,
    pub kcal_status: FulfillmentStatus,
    pub protein_status: FulfillmentStatus,
    pub fluid_status: Option<FulfillmentStatus>,
}

impl Fulfillment {
    pub fn classify(
        totals: &Nutrition,
        recommended_goal_kcal: f64,
        protein_goal: &ProteinGoal,
        fluid_limit_ml: Option<f64>,
    ) -> Self {
        let diff_kcal = totals.kcal - recommended_goal_kcal;
        Self {
            diff_kcal,
            diff_protein_min_g: totals.protein_g - protein_goal.min_g,
            diff_protein_max_g: totals.protein_g - protein_goal.max_g,
            kcal_status: kcal_status(diff_kcal, STATUS_EPSILON),
            protein_status: range_status(
                totals.protein_g,
                protein_goal.min_g,
                protein_goal.max_g,
                STATUS_EPSILON,
            ),
            fluid_status: fluid_status(totals.ml, fluid_limit_ml),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(kcal: f64, protein_g: f64, ml: f64) -> Nutrition {
        Nutrition { ml, kcal, protein_g, ..Nutrition::zero() }
    }

    #[test]
    fn test_kcal_reference_cases() {
        let goal = ProteinGoal { min_g: 0.0, max_g: 0.0 };
        let on_target = Fulfillment::classify(&totals(1221.2, 0.0, 0.0), 1221.2, &goal, None);
        assert_eq!(on_target.diff_kcal, 0.0);
        assert_eq!(on_target.kcal_status, FulfillmentStatus::Optimal);

        let under = Fulfillment::classify(&totals(1021.2, 0.0, 0.0), 1221.2, &goal, None);
        assert!((under.diff_kcal + 200.0).abs() < 1e-9);
        assert_eq!(under.kcal_status, FulfillmentStatus::Deficit);

        let over = Fulfillment::classify(&totals(1450.0, 0.0, 0.0), 1221.2, &goal, None);
        assert!((over.diff_kcal - 228.8).abs() < 1e-9);
        assert_eq!(over.kcal_status, FulfillmentStatus::Excess);
    }

    #[test]
    fn test_kcal_thresholds() {
        assert_eq!(kcal_status(-0.05, STATUS_EPSILON), FulfillmentStatus::Optimal);
        assert_eq!(kcal_status(-0.06, STATUS_EPSILON), FulfillmentStatus::Deficit);
        assert_eq!(kcal_status(199.9, STATUS_EPSILON), FulfillmentStatus::Optimal);
        assert_eq!(kcal_status(200.0, STATUS_EPSILON), FulfillmentStatus::Excess);
    }

    #[test]
    fn test_protein_range() {
        assert_eq!(range_status(88.76, 88.8, 148.0, STATUS_EPSILON), FulfillmentStatus::Optimal);
        assert_eq!(range_status(88.7, 88.8, 148.0, STATUS_EPSILON), FulfillmentStatus::Deficit);
        assert_eq!(range_status(148.04, 88.8, 148.0, STATUS_EPSILON), FulfillmentStatus::Optimal);
        assert_eq!(range_status(148.1, 88.8, 148.0, STATUS_EPSILON), FulfillmentStatus::Excess);
    }

    #[test]
    fn test_fluid_is_binary() {
        assert_eq!(fluid_status(1900.0, Some(1900.0)), Some(FulfillmentStatus::Optimal));
        assert_eq!(fluid_status(1900.1, Some(1900.0)), Some(FulfillmentStatus::Deficit));
        assert_eq!(fluid_status(5000.0, None), None);
        assert_eq!(fluid_status(5000.0, Some(0.0)), None);
    }

    #[test]
    fn test_protein_diffs() {
        let goal = ProteinGoal { min_g: 80.0, max_g: 120.0 };
        let f = Fulfillment::classify(&totals(0.0, 100.0, 0.0), 0.0, &goal, None);
        assert_eq!(f.diff_protein_min_g, 20.0);
        assert_eq!(f.diff_protein_max_g, -20.0);
        assert_eq!(f.protein_status, FulfillmentStatus::Optimal);
    }
}
