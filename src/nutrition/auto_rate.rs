//! Auto-rate solver
//!
//! Back-calculates the infusion rate of the single auto row so that total
//! delivered energy (or protein) meets the remaining goal.

use serde::{Deserialize, Serialize};

use super::catalog::NutrientProfile;
use super::engine::EngineError;
use super::preparations::FixedContribution;

/// What the auto row is solved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoKind {
    /// Fill the recommended (ramped) energy goal
    Kcal,
    /// Fill the upper protein goal
    Protein,
}

/// At most one auto row, identified by index into the preparation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "row", rename_all = "snake_case")]
pub enum AutoTarget {
    #[default]
    None,
    Kcal(usize),
    Protein(usize),
}

impl AutoTarget {
    /// Build from per-row `(auto_kcal, auto_protein)` flags as stored.
    ///
    /// More than one flagged row, or one row with both flags, is rejected.
    pub fn from_flags<I>(flags: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        let mut target = AutoTarget::None;
        let mut flagged = Vec::new();

        for (index, (auto_kcal, auto_protein)) in flags.into_iter().enumerate() {
            match (auto_kcal, auto_protein) {
                (false, false) => continue,
                (true, true) => flagged.push(index),
                (true, false) => {
                    flagged.push(index);
                    target = AutoTarget::Kcal(index);
                }
                (false, true) => {
                    flagged.push(index);
                    target = AutoTarget::Protein(index);
                }
            }
        }

        if flagged.len() > 1 || (flagged.len() == 1 && target == AutoTarget::None) {
            return Err(EngineError::AmbiguousAutoRows { rows: flagged });
        }
        Ok(target)
    }

    pub fn row(&self) -> Option<usize> {
        match self {
            AutoTarget::None => None,
            AutoTarget::Kcal(i) | AutoTarget::Protein(i) => Some(*i),
        }
    }

    pub fn kind(&self) -> Option<AutoKind> {
        match self {
            AutoTarget::None => None,
            AutoTarget::Kcal(_) => Some(AutoKind::Kcal),
            AutoTarget::Protein(_) => Some(AutoKind::Protein),
        }
    }

    /// The `(auto_kcal, auto_protein)` flags for a row, for storage
    pub fn flags_for(&self, index: usize) -> (bool, bool) {
        match self {
            AutoTarget::Kcal(i) if *i == index => (true, false),
            AutoTarget::Protein(i) if *i == index => (false, true),
            _ => (false, false),
        }
    }
}

/// Rate in ml/h that delivers `remaining` units at `per_ml` units per ml over
/// `duration_h` hours. Negative demand is treated as none.
pub fn required_rate(remaining: f64, per_ml: f64, duration_h: f64) -> f64 {
    if duration_h <= 0.0 || per_ml <= 0.0 {
        return 0.0;
    }
    let remaining = remaining.max(0.0);
    (remaining / per_ml) / duration_h
}

/// Goals the auto row can be solved against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoGoals {
    pub recommended_kcal: f64,
    pub protein_max_g: f64,
}

/// Solve the auto row's flow rate
pub fn solve_rate(
    kind: AutoKind,
    profile: &NutrientProfile,
    duration_h: f64,
    goals: &AutoGoals,
    fixed: &FixedContribution,
) -> f64 {
    let (remaining, per_ml) = match kind {
        AutoKind::Kcal => (goals.recommended_kcal - fixed.kcal, profile.kcal_per_ml),
        AutoKind::Protein => (goals.protein_max_g - fixed.protein_g, profile.protein_g_per_ml),
    };
    let rate = required_rate(remaining, per_ml, duration_h);
    tracing::debug!(?kind, remaining, per_ml, duration_h, rate, "solved auto rate");
    rate
}
