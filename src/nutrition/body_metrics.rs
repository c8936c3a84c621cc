//! Body metrics
//!
//! Ideal body weight (Devine), body mass index and adjusted body weight.

use serde::{Deserialize, Serialize};

/// Height at which the Devine formula adds nothing (60 inches)
const DEVINE_BASE_HEIGHT_CM: f64 = 152.4;
/// Devine increment per cm above the base height (2.3 kg per inch)
const DEVINE_KG_PER_CM: f64 = 0.91;
const DEVINE_BASE_MALE_KG: f64 = 50.0;
const DEVINE_BASE_FEMALE_KG: f64 = 45.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    #[serde(rename = "male", alias = "M", alias = "m")]
    Male,
    #[serde(rename = "female", alias = "F", alias = "f")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    /// Single-letter code used in stored records
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    /// Parse leniently; anything not recognisably female is male
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "f" | "female" | "w" | "woman" | "žena" => Gender::Female,
            _ => Gender::Male,
        }
    }
}

/// Ideal body weight in kg. Not clamped: very short heights give negative values.
pub fn ideal_body_weight(height_cm: f64, gender: Gender) -> f64 {
    if height_cm <= 0.0 {
        return 0.0;
    }
    let base = match gender {
        Gender::Male => DEVINE_BASE_MALE_KG,
        Gender::Female => DEVINE_BASE_FEMALE_KG,
    };
    base + DEVINE_KG_PER_CM * (height_cm - DEVINE_BASE_HEIGHT_CM)
}

pub fn body_mass_index(height_cm: f64, weight_kg: f64) -> f64 {
    if height_cm <= 0.0 {
        return 0.0;
    }
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

/// Adjusted body weight: `(weight + 2·IBW) / 3` when the patient is above IBW,
/// otherwise the actual weight.
pub fn adjusted_body_weight(weight_kg: f64, ibw_kg: f64) -> f64 {
    if ibw_kg > 0.0 && weight_kg > ibw_kg {
        (weight_kg + 2.0 * ibw_kg) / 3.0
    } else {
        weight_kg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyMetrics {
    pub ibw_kg: f64,
    pub bmi: f64,
    pub abw_kg: f64,
}

impl BodyMetrics {
    pub fn compute(height_cm: f64, weight_kg: f64, gender: Gender) -> Self {
        let ibw_kg = ideal_body_weight(height_cm, gender);
        Self {
            ibw_kg,
            bmi: body_mass_index(height_cm, weight_kg),
            abw_kg: adjusted_body_weight(weight_kg, ibw_kg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ibw_reference_patient() {
        let ibw = ideal_body_weight(170.0, Gender::Male);
        assert!((ibw - 66.016).abs() < 1e-9);
        let ibw_f = ideal_body_weight(170.0, Gender::Female);
        assert!((ibw_f - 61.516).abs() < 1e-9);
    }

    #[test]
    fn test_ibw_degenerate_height() {
        assert_eq!(ideal_body_weight(0.0, Gender::Male), 0.0);
        assert_eq!(ideal_body_weight(-10.0, Gender::Female), 0.0);
        // Short but positive heights are not clamped
        assert!(ideal_body_weight(50.0, Gender::Female) < 0.0);
    }

    #[test]
    fn test_bmi() {
        assert!((body_mass_index(170.0, 90.0) - 31.1418685).abs() < 1e-6);
        assert_eq!(body_mass_index(0.0, 90.0), 0.0);
    }

    #[test]
    fn test_abw() {
        let ibw = ideal_body_weight(170.0, Gender::Male);
        let abw = adjusted_body_weight(90.0, ibw);
        assert!((abw - 74.0106667).abs() < 1e-6);
        // At or below IBW the actual weight is used
        assert_eq!(adjusted_body_weight(60.0, ibw), 60.0);
        assert_eq!(adjusted_body_weight(ibw, ibw), ibw);
        // Unknown IBW leaves weight untouched
        assert_eq!(adjusted_body_weight(80.0, 0.0), 80.0);
    }

    #[test]
    fn test_gender_parsing() {
        assert_eq!(Gender::from_str("F"), Gender::Female);
        assert_eq!(Gender::from_str(" female "), Gender::Female);
        assert_eq!(Gender::from_str("M"), Gender::Male);
        assert_eq!(Gender::from_str(""), Gender::Male);
        let g: Gender = serde_json::from_str("\"F\"").unwrap();
        assert_eq!(g, Gender::Female);
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"male\"");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn male_ibw_exceeds_female_by_constant(height in 152.5f64..230.0) {
            let diff = ideal_body_weight(height, Gender::Male) - ideal_body_weight(height, Gender::Female);
            prop_assert!(diff > 0.0);
            prop_assert!((diff - 4.5).abs() < 1e-9);
        }

        #[test]
        fn abw_between_ibw_and_weight(height in 153.0f64..210.0, extra in 0.1f64..150.0) {
            let ibw = ideal_body_weight(height, Gender::Male);
            let weight = ibw + extra;
            let abw = adjusted_body_weight(weight, ibw);
            prop_assert!(abw > ibw && abw < weight, "abw {} not in ({}, {})", abw, ibw, weight);
        }

        #[test]
        fn abw_is_weight_when_not_above_ibw(height in 153.0f64..210.0, deficit in 0.0f64..40.0) {
            let ibw = ideal_body_weight(height, Gender::Female);
            let weight = ibw - deficit;
            prop_assert_eq!(adjusted_body_weight(weight, ibw), weight);
        }
    }
}
