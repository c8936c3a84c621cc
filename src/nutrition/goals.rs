//! Daily goals
//!
//! Energy goal, the refeeding ramp-up by hospitalization day, protein goal
//! range and the default fluid limit.

use serde::{Deserialize, Serialize};

/// Energy goal without a calorimeter measurement
pub const KCAL_PER_KG_ABW: f64 = 25.0;
/// Default fluid allowance per kg ABW, before rounding up to 100 ml
pub const FLUID_ML_PER_KG_ABW: f64 = 25.0;
/// Protein target used when the form leaves it empty
pub const DEFAULT_PROTEIN_G_PER_KG: f64 = 1.5;
/// Number of days shown on the ramp chart
pub const RAMP_CHART_DAYS: u32 = 10;

/// Full daily energy goal: measured REE when a calorimeter reading exists,
/// otherwise 25 kcal per kg ABW.
pub fn full_goal_kcal(abw_kg: f64, has_calorimeter: bool, measured_ree_kcal: f64) -> f64 {
    if has_calorimeter && measured_ree_kcal > 0.0 {
        measured_ree_kcal
    } else {
        KCAL_PER_KG_ABW * abw_kg
    }
}

/// Percentage of the full goal targeted on a hospitalization day.
///
/// Day 0 is treated as day 1. Days 4-7 reach 100% only with indirect
/// calorimetry, 70% with predictive equations.
pub fn ramp_percent(day: u32, has_calorimeter: bool) -> u32 {
    match day {
        0 | 1 => 0,
        2 => 33,
        3 => 66,
        4..=7 => {
            if has_calorimeter {
                100
            } else {
                70
            }
        }
        _ => 100,
    }
}

pub fn recommended_goal_kcal(full_goal_kcal: f64, ramp_percent: u32) -> f64 {
    full_goal_kcal * (ramp_percent as f64 / 100.0)
}

/// Protein goal range in grams per day
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProteinGoal {
    pub min_g: f64,
    pub max_g: f64,
}

/// Protein goal in grams from g/kg/day targets and ABW
pub fn protein_goal(min_g_per_kg: f64, max_g_per_kg: f64, abw_kg: f64) -> ProteinGoal {
    ProteinGoal {
        min_g: min_g_per_kg * abw_kg,
        max_g: max_g_per_kg * abw_kg,
    }
}

/// Put a protein target pair in order. Returns `(min, max, swapped)`.
pub fn ordered_protein_targets(min_g_per_kg: f64, max_g_per_kg: f64) -> (f64, f64, bool) {
    if min_g_per_kg > max_g_per_kg {
        (max_g_per_kg, min_g_per_kg, true)
    } else {
        (min_g_per_kg, max_g_per_kg, false)
    }
}

/// Default fluid limit: 25 ml/kg ABW rounded up to the next 100 ml.
/// `None` while ABW is unknown.
pub fn default_fluid_limit_ml(abw_kg: f64) -> Option<f64> {
    if abw_kg > 0.0 {
        Some((abw_kg * FLUID_ML_PER_KG_ABW / 100.0).ceil() * 100.0)
    } else {
        None
    }
}

/// Planned ramp percentages for days `1..=days`
pub fn ramp_curve(has_calorimeter: bool, days: u32) -> Vec<u32> {
    (1..=days).map(|d| ramp_percent(d, has_calorimeter)).collect()
}

/// Where the delivered energy stands against the full goal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampProgress {
    /// Delivered kcal as a percentage of the full (unramped) goal
    pub achieved_percent: f64,
    /// Zero-based position of the current day on the ramp chart
    pub chart_day_index: usize,
}

impl RampProgress {
    pub fn compute(total_kcal: f64, full_goal_kcal: f64, day: u32) -> Self {
        let achieved_percent = if full_goal_kcal > 0.0 {
            total_kcal / full_goal_kcal * 100.0
        } else {
            0.0
        };
        Self {
            achieved_percent,
            chart_day_index: (day.clamp(1, RAMP_CHART_DAYS) - 1) as usize,
        }
    }
}
