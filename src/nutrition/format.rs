//! Display formatting
//!
//! Rounding and string conventions for everything shown to the clinician
//! or stored alongside a patient day. All math happens on unrounded values;
//! these helpers only run at the output edge.

use serde::{Deserialize, Serialize};

use super::engine::{CalculationResult, ComputedRow};
use super::totals::Nutrition;

/// Whether `value` lies exactly halfway between two `decimals`-place numbers
fn is_exact_tie(value: f64, decimals: usize) -> bool {
    // An f64 has at most 1074 fractional digits, so this expansion is exact
    let exact = format!("{:.1074}", value.abs());
    let Some((_, fraction)) = exact.split_once('.') else {
        return false;
    };
    let tail = &fraction[decimals.min(fraction.len())..];
    tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0')
}

/// Round to `decimals` places and print without trailing zeros.
///
/// Exact ties round away from zero. Negative zero prints as `"0"`,
/// non-finite values as `"0"`.
pub fn format_num(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    // `{:.*}` breaks ties to even; step one ulp away from zero instead
    let value = if is_exact_tie(value, decimals) {
        f64::from_bits(value.to_bits() + 1)
    } else {
        value
    };
    let mut s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Signed one-decimal difference: `"+12.5"`, `"-3.1"`, or exactly `"0"`
pub fn format_signed(value: f64) -> String {
    let s = format_num(value, 1);
    if s == "0" {
        s
    } else if value >= 0.0 {
        format!("+{}", s)
    } else {
        s
    }
}

/// Solved infusion rate: six decimals with trailing zeros removed, empty for 0
pub fn format_rate(rate_ml_h: f64) -> String {
    if !(rate_ml_h.is_finite() && rate_ml_h > 0.0) {
        return String::new();
    }
    format_num(rate_ml_h, 6)
}

/// Nutrition block at one decimal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionDisplay {
    pub ml: String,
    pub kcal: String,
    pub protein: String,
    pub fat: String,
    pub carb: String,
}

impl From<&Nutrition> for NutritionDisplay {
    fn from(n: &Nutrition) -> Self {
        Self {
            ml: format_num(n.ml, 1),
            kcal: format_num(n.kcal, 1),
            protein: format_num(n.protein_g, 1),
            fat: format_num(n.fat_g, 1),
            carb: format_num(n.carb_g, 1),
        }
    }
}

/// Table footer: totals plus the status of each column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsDisplay {
    #[serde(flatten)]
    pub values: NutritionDisplay,
    /// Empty when no fluid limit is set
    pub ml_class: String,
    pub kcal_class: String,
    pub protein_class: String,
}

/// Rounded, string-valued view of a calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationDisplay {
    pub ibw: String,
    pub abw: String,
    pub bmi: String,
    pub full_goal_kcal: String,
    pub rec_goal_kcal: String,
    pub ramp_percent: u32,
    /// `"min - max"` in grams
    pub goal_protein: String,
    pub fluid_limit: String,
    pub total_ml: String,
    pub total_kcal: String,
    pub total_protein: String,
    pub total_fat: String,
    pub total_carb: String,
    pub ach_kcal_kg: String,
    pub ach_protein_kg: String,
    pub ach_fat_kg: String,
    pub ach_carb_kg: String,
    pub ach_protein_percent: String,
    pub ach_fat_percent: String,
    pub ach_carb_percent: String,
    pub ach_goal_percent: String,
    pub diff_kcal: String,
    pub diff_protein_min: String,
    pub diff_protein_max: String,
    pub diff_kcal_class: String,
    pub diff_protein_class: String,
    pub totals: TotalsDisplay,
}

impl CalculationResult {
    pub fn display(&self) -> CalculationDisplay {
        let f = &self.fulfillment;
        let totals = NutritionDisplay::from(&self.totals);
        CalculationDisplay {
            ibw: format_num(self.ibw_kg, 2),
            abw: format_num(self.abw_kg, 2),
            bmi: format_num(self.bmi, 1),
            full_goal_kcal: format_num(self.full_goal_kcal, 1),
            rec_goal_kcal: format_num(self.recommended_goal_kcal, 1),
            ramp_percent: self.ramp_percent,
            goal_protein: format!(
                "{} - {}",
                format_num(self.protein_goal.min_g, 1),
                format_num(self.protein_goal.max_g, 1)
            ),
            fluid_limit: self.fluid_limit_ml.map(|l| format_num(l, 0)).unwrap_or_default(),
            total_ml: totals.ml.clone(),
            total_kcal: totals.kcal.clone(),
            total_protein: totals.protein.clone(),
            total_fat: totals.fat.clone(),
            total_carb: totals.carb.clone(),
            ach_kcal_kg: format_num(self.per_kg.kcal, 2),
            ach_protein_kg: format_num(self.per_kg.protein_g, 3),
            ach_fat_kg: format_num(self.per_kg.fat_g, 3),
            ach_carb_kg: format_num(self.per_kg.carb_g, 3),
            ach_protein_percent: format_num(self.macro_share.protein, 0),
            ach_fat_percent: format_num(self.macro_share.fat, 0),
            ach_carb_percent: format_num(self.macro_share.carb, 0),
            ach_goal_percent: format_num(self.ramp_progress.achieved_percent, 1),
            diff_kcal: format_signed(f.diff_kcal),
            diff_protein_min: format_signed(f.diff_protein_min_g),
            diff_protein_max: format_signed(f.diff_protein_max_g),
            diff_kcal_class: f.kcal_status.as_str().to_string(),
            diff_protein_class: f.protein_status.as_str().to_string(),
            totals: TotalsDisplay {
                values: totals,
                ml_class: f.fluid_status.map(|s| s.as_str().to_string()).unwrap_or_default(),
                kcal_class: f.kcal_status.as_str().to_string(),
                protein_class: f.protein_status.as_str().to_string(),
            },
        }
    }
}

/// Rounded view of one preparation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDisplay {
    pub product: String,
    /// Rate as entered, or the trimmed solved rate for the auto row
    pub speed: String,
    pub hours: String,
    #[serde(flatten)]
    pub nutrition: NutritionDisplay,
}

impl ComputedRow {
    pub fn display(&self) -> RowDisplay {
        let speed = if self.auto.is_some() {
            format_rate(self.flow_rate_ml_h)
        } else {
            format_num(self.flow_rate_ml_h, 6)
        };
        RowDisplay {
            product: self.product.clone(),
            speed,
            hours: format_num(self.duration_h, 2),
            nutrition: NutritionDisplay::from(&self.nutrition),
        }
    }
}
