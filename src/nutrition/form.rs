//! Form input coercion
//!
//! Patient and preparation forms arrive half-filled: empty strings, numbers
//! typed as text, `"ÁNO"`/`"NIE"` toggles. These types accept all of that and
//! turn it into engine input with the documented defaults.

use rmcp::schemars;
use serde::{Deserialize, Serialize};

use super::auto_rate::AutoTarget;
use super::body_metrics::Gender;
use super::engine::{EngineError, PatientInput};
use super::goals::DEFAULT_PROTEIN_G_PER_KG;
use super::preparations::{PreparationRow, DEFAULT_DURATION_H};

/// A loosely typed form value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl FormValue {
    /// Numeric value, if there is a finite one. Text accepts a decimal comma.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            FormValue::Number(n) => *n,
            FormValue::Flag(_) => return None,
            FormValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.replace(',', ".").parse::<f64>().ok()?
            }
        };
        value.is_finite().then_some(value)
    }

    /// Yes/no toggle. Accepts booleans, `1`, and yes-words in Slovak or English.
    pub fn as_bool(&self) -> bool {
        match self {
            FormValue::Flag(b) => *b,
            FormValue::Number(n) => *n != 0.0,
            FormValue::Text(s) => matches!(
                s.trim().to_lowercase().as_str(),
                "áno" | "ano" | "yes" | "true" | "1"
            ),
        }
    }
}

fn number_or(value: &Option<FormValue>, default: f64) -> f64 {
    value.as_ref().and_then(FormValue::as_f64).unwrap_or(default)
}

fn flag(value: &Option<FormValue>) -> bool {
    value.as_ref().map(FormValue::as_bool).unwrap_or(false)
}

/// Patient section of the calculator form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PatientForm {
    /// Height in cm
    #[serde(default)]
    pub height: Option<FormValue>,
    /// Weight in kg
    #[serde(default)]
    pub weight: Option<FormValue>,
    /// "M" or "F"
    #[serde(default)]
    pub gender: Option<String>,
    /// Hospitalization day, 1-based
    #[serde(default)]
    pub day: Option<FormValue>,
    /// Whether indirect calorimetry is available ("ÁNO"/"NIE" or boolean)
    #[serde(default)]
    pub calorimeter: Option<FormValue>,
    /// Measured REE in kcal/day
    #[serde(default)]
    pub ree: Option<FormValue>,
    /// Protein target lower bound, g/kg/day
    #[serde(default)]
    pub protein_goal_min: Option<FormValue>,
    /// Protein target upper bound, g/kg/day
    #[serde(default)]
    pub protein_goal_max: Option<FormValue>,
    /// Fluid limit in ml/day; empty for the ABW-based default
    #[serde(default)]
    pub fluid_limit: Option<FormValue>,
}

impl PatientForm {
    pub fn to_input(&self) -> PatientInput {
        let has_calorimeter = flag(&self.calorimeter);
        // Day is an integer field; fractions truncate, anything below 1 is day 1
        let day = self
            .day
            .as_ref()
            .and_then(FormValue::as_f64)
            .map(|d| d.trunc())
            .filter(|d| *d >= 1.0)
            .map(|d| d.min(u32::MAX as f64) as u32)
            .unwrap_or(1);

        PatientInput {
            height_cm: number_or(&self.height, 0.0),
            weight_kg: number_or(&self.weight, 0.0),
            gender: self.gender.as_deref().map(Gender::from_str).unwrap_or_default(),
            day,
            has_calorimeter,
            measured_ree_kcal: if has_calorimeter { number_or(&self.ree, 0.0) } else { 0.0 },
            protein_min_g_per_kg: number_or(&self.protein_goal_min, DEFAULT_PROTEIN_G_PER_KG),
            protein_max_g_per_kg: number_or(&self.protein_goal_max, DEFAULT_PROTEIN_G_PER_KG),
            fluid_limit_ml: self
                .fluid_limit
                .as_ref()
                .and_then(FormValue::as_f64)
                .filter(|l| *l > 0.0),
        }
    }
}

/// One preparation row of the calculator form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PreparationForm {
    /// Product name as listed in the catalog
    #[serde(default)]
    pub name: String,
    /// Solve this row's rate to meet the energy goal
    #[serde(default)]
    pub auto_kcal: Option<FormValue>,
    /// Solve this row's rate to meet the upper protein goal
    #[serde(default)]
    pub auto_protein: Option<FormValue>,
    /// Flow rate in ml/h
    #[serde(default)]
    pub speed: Option<FormValue>,
    /// Duration in hours, default 24
    #[serde(default)]
    pub hours: Option<FormValue>,
}

impl PreparationForm {
    pub fn to_row(&self) -> PreparationRow {
        PreparationRow::new(
            self.name.trim(),
            number_or(&self.speed, 0.0),
            number_or(&self.hours, DEFAULT_DURATION_H),
        )
    }

    pub fn auto_flags(&self) -> (bool, bool) {
        (flag(&self.auto_kcal), flag(&self.auto_protein))
    }
}

/// Rows and the validated auto target for a list of preparation forms
pub fn preparation_rows(
    forms: &[PreparationForm],
) -> Result<(Vec<PreparationRow>, AutoTarget), EngineError> {
    let auto = AutoTarget::from_flags(forms.iter().map(PreparationForm::auto_flags))?;
    let rows = forms.iter().map(PreparationForm::to_row).collect();
    Ok((rows, auto))
}
