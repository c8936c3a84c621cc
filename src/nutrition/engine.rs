//! Calculation engine
//!
//! One pure pass from patient input and preparation rows to every derived
//! quantity: body metrics, goals, per-row and total nutrition, the solved
//! auto row and goal fulfillment. Input corrections (reordered protein
//! targets, default fluid limit, clamped day) are returned to the caller
//! instead of being written back anywhere.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::auto_rate::{solve_rate, AutoGoals, AutoKind, AutoTarget};
use super::body_metrics::{BodyMetrics, Gender};
use super::catalog::ProductCatalog;
use super::fulfillment::Fulfillment;
use super::goals::{
    default_fluid_limit_ml, full_goal_kcal, ordered_protein_targets, protein_goal, ramp_percent,
    recommended_goal_kcal, ProteinGoal, RampProgress, DEFAULT_PROTEIN_G_PER_KG,
};
use super::preparations::{compute_fixed_rows, resolve_profile, row_nutrition, PreparationRow};
use super::totals::Nutrition;

/// Energy per gram of macronutrient, for the energy-share breakdown
const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;
const KCAL_PER_G_CARB: f64 = 4.0;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("More than one preparation row is marked auto (rows {rows:?})")]
    AmbiguousAutoRows { rows: Vec<usize> },

    #[error("Auto row {index} does not exist ({rows} preparation rows)")]
    AutoRowOutOfRange { index: usize, rows: usize },
}

/// Patient measurements and targets for one calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    pub height_cm: f64,
    pub weight_kg: f64,
    pub gender: Gender,
    /// Hospitalization day, 1-based
    pub day: u32,
    pub has_calorimeter: bool,
    /// Measured resting energy expenditure; only used with a calorimeter
    pub measured_ree_kcal: f64,
    pub protein_min_g_per_kg: f64,
    pub protein_max_g_per_kg: f64,
    /// Manually set fluid ceiling; `None` uses the ABW-based default
    pub fluid_limit_ml: Option<f64>,
}

impl Default for PatientInput {
    fn default() -> Self {
        Self {
            height_cm: 0.0,
            weight_kg: 0.0,
            gender: Gender::Male,
            day: 1,
            has_calorimeter: false,
            measured_ree_kcal: 0.0,
            protein_min_g_per_kg: DEFAULT_PROTEIN_G_PER_KG,
            protein_max_g_per_kg: DEFAULT_PROTEIN_G_PER_KG,
            fluid_limit_ml: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluidLimitSource {
    /// Entered by the caller
    Manual,
    /// Derived from ABW
    Auto,
    /// No limit could be determined
    Unset,
}

/// Inputs as the engine actually used them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputCorrections {
    pub day: u32,
    pub protein_min_g_per_kg: f64,
    pub protein_max_g_per_kg: f64,
    /// The caller's min/max were reversed and have been swapped
    pub protein_swapped: bool,
    pub fluid_limit_ml: Option<f64>,
    pub fluid_limit_source: FluidLimitSource,
}

/// A preparation row after the engine pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedRow {
    pub product: String,
    /// Entered rate, or the solved rate for the auto row
    pub flow_rate_ml_h: f64,
    pub duration_h: f64,
    pub auto: Option<AutoKind>,
    pub nutrition: Nutrition,
}

/// Delivered amounts per kg ABW
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerKgAchieved {
    pub kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carb_g: f64,
}

/// Share of delivered energy from each macronutrient, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroEnergyShare {
    pub protein: f64,
    pub fat: f64,
    pub carb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub ibw_kg: f64,
    pub bmi: f64,
    pub abw_kg: f64,
    pub full_goal_kcal: f64,
    pub ramp_percent: u32,
    pub recommended_goal_kcal: f64,
    pub protein_goal: ProteinGoal,
    pub fluid_limit_ml: Option<f64>,
    pub totals: Nutrition,
    pub per_kg: PerKgAchieved,
    pub macro_share: MacroEnergyShare,
    pub fulfillment: Fulfillment,
    pub ramp_progress: RampProgress,
}

/// Full engine output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub corrections: InputCorrections,
    pub result: CalculationResult,
    pub rows: Vec<ComputedRow>,
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn protein_target(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        DEFAULT_PROTEIN_G_PER_KG
    }
}

fn per_kg(totals: &Nutrition, abw_kg: f64) -> (PerKgAchieved, MacroEnergyShare) {
    if abw_kg <= 0.0 {
        return (PerKgAchieved::default(), MacroEnergyShare::default());
    }
    let achieved = PerKgAchieved {
        kcal: totals.kcal / abw_kg,
        protein_g: totals.protein_g / abw_kg,
        fat_g: totals.fat_g / abw_kg,
        carb_g: totals.carb_g / abw_kg,
    };
    if achieved.kcal <= 0.0 {
        return (achieved, MacroEnergyShare::default());
    }
    let share = MacroEnergyShare {
        protein: achieved.protein_g * KCAL_PER_G_PROTEIN / achieved.kcal * 100.0,
        fat: achieved.fat_g * KCAL_PER_G_FAT / achieved.kcal * 100.0,
        carb: achieved.carb_g * KCAL_PER_G_CARB / achieved.kcal * 100.0,
    };
    (achieved, share)
}

/// Run the full calculation.
///
/// Fails only when `auto` points past the end of `rows`.
pub fn calculate(
    input: &PatientInput,
    rows: &[PreparationRow],
    auto: AutoTarget,
    catalog: &dyn ProductCatalog,
) -> Result<Calculation, EngineError> {
    if let Some(index) = auto.row() {
        if index >= rows.len() {
            return Err(EngineError::AutoRowOutOfRange { index, rows: rows.len() });
        }
    }

    let height_cm = non_negative(input.height_cm);
    let weight_kg = non_negative(input.weight_kg);
    let day = input.day.max(1);

    let (protein_min, protein_max, protein_swapped) = ordered_protein_targets(
        protein_target(input.protein_min_g_per_kg),
        protein_target(input.protein_max_g_per_kg),
    );
    if protein_swapped {
        tracing::warn!(
            min = protein_min,
            max = protein_max,
            "Protein targets were reversed, swapped them"
        );
    }

    let metrics = BodyMetrics::compute(height_cm, weight_kg, input.gender);
    let abw = metrics.abw_kg;

    let (fluid_limit_ml, fluid_limit_source) = match input.fluid_limit_ml {
        Some(limit) if limit.is_finite() && limit > 0.0 => (Some(limit), FluidLimitSource::Manual),
        _ => match default_fluid_limit_ml(abw) {
            Some(limit) => (Some(limit), FluidLimitSource::Auto),
            None => (None, FluidLimitSource::Unset),
        },
    };

    let full_goal = full_goal_kcal(
        abw,
        input.has_calorimeter,
        non_negative(input.measured_ree_kcal),
    );
    let ramp = ramp_percent(day, input.has_calorimeter);
    let recommended = recommended_goal_kcal(full_goal, ramp);
    let protein = protein_goal(protein_min, protein_max, abw);

    let (mut nutrition, fixed) = compute_fixed_rows(rows, auto.row(), catalog);
    let mut rates: Vec<f64> = rows.iter().map(|r| r.effective_rate()).collect();

    if let (Some(index), Some(kind)) = (auto.row(), auto.kind()) {
        let row = &rows[index];
        let profile = resolve_profile(catalog, &row.product);
        let duration = row.effective_duration();
        let goals = AutoGoals {
            recommended_kcal: recommended,
            protein_max_g: protein.max_g,
        };
        let rate = solve_rate(kind, &profile, duration, &goals, &fixed);
        rates[index] = rate;
        nutrition[index] = row_nutrition(rate, duration, &profile);
    }

    let computed_rows: Vec<ComputedRow> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| ComputedRow {
            product: row.product.clone(),
            flow_rate_ml_h: rates[index],
            duration_h: row.effective_duration(),
            auto: if auto.row() == Some(index) { auto.kind() } else { None },
            nutrition: nutrition[index],
        })
        .collect();

    let totals: Nutrition = computed_rows.iter().map(|r| &r.nutrition).sum();
    let (per_kg, macro_share) = per_kg(&totals, abw);
    let fulfillment = Fulfillment::classify(&totals, recommended, &protein, fluid_limit_ml);

    tracing::debug!(
        day,
        abw,
        recommended,
        total_kcal = totals.kcal,
        total_protein = totals.protein_g,
        "nutrition calculated"
    );

    Ok(Calculation {
        corrections: InputCorrections {
            day,
            protein_min_g_per_kg: protein_min,
            protein_max_g_per_kg: protein_max,
            protein_swapped,
            fluid_limit_ml,
            fluid_limit_source,
        },
        result: CalculationResult {
            ibw_kg: metrics.ibw_kg,
            bmi: metrics.bmi,
            abw_kg: abw,
            full_goal_kcal: full_goal,
            ramp_percent: ramp,
            recommended_goal_kcal: recommended,
            protein_goal: protein,
            fluid_limit_ml,
            totals,
            per_kg,
            macro_share,
            fulfillment,
            ramp_progress: RampProgress::compute(totals.kcal, full_goal, day),
        },
        rows: computed_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::catalog::{BuiltinCatalog, NutrientProfile, Product, Route};
    use crate::nutrition::fulfillment::FulfillmentStatus;
    use proptest::prelude::*;

    struct TestCatalog(Vec<Product>);

    impl ProductCatalog for TestCatalog {
        fn products(&self) -> &[Product] {
            &self.0
        }
    }

    fn test_catalog() -> TestCatalog {
        TestCatalog(vec![
            Product { name: "Standard 1.0", route: Route::Enteral, profile: NutrientProfile::new(1.0, 0.04, 0.035, 0.13) },
            Product { name: "Amino 10", route: Route::Parenteral, profile: NutrientProfile::new(0.4, 0.1, 0.0, 0.0) },
            Product { name: "Water", route: Route::Enteral, profile: NutrientProfile::zero() },
        ])
    }

    fn reference_patient() -> PatientInput {
        PatientInput {
            height_cm: 170.0,
            weight_kg: 90.0,
            gender: Gender::Male,
            day: 3,
            protein_min_g_per_kg: 1.2,
            protein_max_g_per_kg: 2.0,
            ..PatientInput::default()
        }
    }

    #[test]
    fn test_reference_patient_goals() {
        let calc = calculate(&reference_patient(), &[], AutoTarget::None, &test_catalog()).unwrap();
        let r = &calc.result;
        assert!((r.ibw_kg - 66.016).abs() < 1e-9);
        assert!((r.abw_kg - 74.0106667).abs() < 1e-6);
        assert!((r.full_goal_kcal - 1850.2666667).abs() < 1e-6);
        assert_eq!(r.ramp_percent, 66);
        assert!((r.recommended_goal_kcal - 1221.176).abs() < 1e-6);
        assert!((r.protein_goal.min_g - 88.8128).abs() < 1e-6);
        assert!((r.protein_goal.max_g - 148.0213333).abs() < 1e-6);
        assert_eq!(r.totals, Nutrition::zero());
        assert_eq!(r.fulfillment.kcal_status, FulfillmentStatus::Deficit);
        assert_eq!(r.fulfillment.protein_status, FulfillmentStatus::Deficit);
    }

    #[test]
    fn test_auto_kcal_row_hits_recommended_goal() {
        let rows = vec![PreparationRow::new("Standard 1.0", 0.0, 24.0)];
        let calc = calculate(&reference_patient(), &rows, AutoTarget::Kcal(0), &test_catalog()).unwrap();
        let solved = &calc.rows[0];
        assert_eq!(solved.auto, Some(AutoKind::Kcal));
        assert!((solved.flow_rate_ml_h - 1221.176 / 24.0).abs() < 1e-6);
        assert!((calc.result.totals.kcal - calc.result.recommended_goal_kcal).abs() < 1e-6);
        assert_eq!(calc.result.fulfillment.kcal_status, FulfillmentStatus::Optimal);
    }

    #[test]
    fn test_auto_protein_row_fills_upper_goal() {
        let rows = vec![
            PreparationRow::new("Standard 1.0", 40.0, 24.0),
            PreparationRow::new("Amino 10", 0.0, 24.0),
        ];
        let calc = calculate(&reference_patient(), &rows, AutoTarget::Protein(1), &test_catalog()).unwrap();
        let r = &calc.result;
        assert!((r.totals.protein_g - r.protein_goal.max_g).abs() < 1e-6);
        assert_eq!(r.fulfillment.protein_status, FulfillmentStatus::Optimal);
        // Fixed row: 960 ml × 0.04 g/ml
        assert!((calc.rows[0].nutrition.protein_g - 38.4).abs() < 1e-9);
    }

    #[test]
    fn test_totals_include_all_rows() {
        let rows = vec![
            PreparationRow::new("Standard 1.0", 30.0, 24.0),
            PreparationRow::new("Amino 10", 0.0, 12.0),
            PreparationRow::new("Water", 20.0, 10.0),
            PreparationRow::new("Unknown", 5.0, 4.0),
        ];
        let calc = calculate(&reference_patient(), &rows, AutoTarget::Kcal(1), &test_catalog()).unwrap();
        let summed: Nutrition = calc.rows.iter().map(|r| &r.nutrition).sum();
        assert_eq!(calc.result.totals, summed);
        assert_eq!(calc.rows[2].nutrition.ml, 200.0);
        assert_eq!(calc.rows[3].nutrition.ml, 20.0);
        assert_eq!(calc.rows[3].nutrition.kcal, 0.0);
    }

    #[test]
    fn test_auto_row_without_energy_content_stays_zero() {
        let rows = vec![PreparationRow::new("Water", 80.0, 24.0)];
        let calc = calculate(&reference_patient(), &rows, AutoTarget::Kcal(0), &test_catalog()).unwrap();
        assert_eq!(calc.rows[0].flow_rate_ml_h, 0.0);
        assert_eq!(calc.rows[0].nutrition, Nutrition::zero());
    }

    #[test]
    fn test_auto_row_out_of_range() {
        let rows = vec![PreparationRow::new("Standard 1.0", 10.0, 24.0)];
        let err = calculate(&reference_patient(), &rows, AutoTarget::Protein(1), &test_catalog()).unwrap_err();
        assert_eq!(err, EngineError::AutoRowOutOfRange { index: 1, rows: 1 });
    }

    #[test]
    fn test_protein_targets_swapped_and_reported() {
        let input = PatientInput {
            protein_min_g_per_kg: 2.0,
            protein_max_g_per_kg: 1.2,
            ..reference_patient()
        };
        let calc = calculate(&input, &[], AutoTarget::None, &test_catalog()).unwrap();
        assert!(calc.corrections.protein_swapped);
        assert_eq!(calc.corrections.protein_min_g_per_kg, 1.2);
        assert_eq!(calc.corrections.protein_max_g_per_kg, 2.0);
        assert!(calc.result.protein_goal.min_g < calc.result.protein_goal.max_g);
    }

    #[test]
    fn test_fluid_limit_sources() {
        let auto = calculate(&reference_patient(), &[], AutoTarget::None, &test_catalog()).unwrap();
        assert_eq!(auto.corrections.fluid_limit_source, FluidLimitSource::Auto);
        assert_eq!(auto.result.fluid_limit_ml, Some(1900.0));

        let manual_input = PatientInput { fluid_limit_ml: Some(1500.0), ..reference_patient() };
        let manual = calculate(&manual_input, &[], AutoTarget::None, &test_catalog()).unwrap();
        assert_eq!(manual.corrections.fluid_limit_source, FluidLimitSource::Manual);
        assert_eq!(manual.result.fluid_limit_ml, Some(1500.0));

        let empty = calculate(&PatientInput::default(), &[], AutoTarget::None, &test_catalog()).unwrap();
        assert_eq!(empty.corrections.fluid_limit_source, FluidLimitSource::Unset);
        assert_eq!(empty.result.fulfillment.fluid_status, None);
    }

    #[test]
    fn test_fluid_over_limit_is_deficit() {
        let input = PatientInput { fluid_limit_ml: Some(1000.0), ..reference_patient() };
        let rows = vec![PreparationRow::new("Water", 50.0, 24.0)];
        let calc = calculate(&input, &rows, AutoTarget::None, &test_catalog()).unwrap();
        assert_eq!(calc.result.fulfillment.fluid_status, Some(FulfillmentStatus::Deficit));
    }

    #[test]
    fn test_empty_form_degrades_to_zero() {
        let input = PatientInput {
            height_cm: f64::NAN,
            weight_kg: -4.0,
            day: 0,
            protein_min_g_per_kg: f64::NAN,
            ..PatientInput::default()
        };
        let calc = calculate(&input, &[], AutoTarget::None, &test_catalog()).unwrap();
        let r = &calc.result;
        assert_eq!(r.ibw_kg, 0.0);
        assert_eq!(r.bmi, 0.0);
        assert_eq!(r.abw_kg, 0.0);
        assert_eq!(r.full_goal_kcal, 0.0);
        assert_eq!(r.per_kg, PerKgAchieved::default());
        assert_eq!(calc.corrections.day, 1);
        assert_eq!(calc.corrections.protein_min_g_per_kg, DEFAULT_PROTEIN_G_PER_KG);
    }

    #[test]
    fn test_per_kg_and_macro_share() {
        let rows = vec![PreparationRow::new("Standard 1.0", 50.0, 24.0)];
        let calc = calculate(&reference_patient(), &rows, AutoTarget::None, &test_catalog()).unwrap();
        let r = &calc.result;
        let abw = r.abw_kg;
        assert!((r.per_kg.kcal - 1200.0 / abw).abs() < 1e-9);
        assert!((r.per_kg.protein_g - 48.0 / abw).abs() < 1e-9);
        // 48 g × 4 / 1200 kcal
        assert!((r.macro_share.protein - 16.0).abs() < 1e-9);
        assert!((r.macro_share.fat - 42.0 * 9.0 / 1200.0 * 100.0).abs() < 1e-9);
        assert!((r.macro_share.carb - 156.0 * 4.0 / 1200.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_calorimeter_ree_drives_goal() {
        let input = PatientInput {
            has_calorimeter: true,
            measured_ree_kcal: 1700.0,
            day: 5,
            ..reference_patient()
        };
        let calc = calculate(&input, &[], AutoTarget::None, &BuiltinCatalog).unwrap();
        assert_eq!(calc.result.full_goal_kcal, 1700.0);
        assert_eq!(calc.result.ramp_percent, 100);
        assert_eq!(calc.result.recommended_goal_kcal, 1700.0);
    }

    #[test]
    fn test_calculation_is_idempotent() {
        let rows = vec![
            PreparationRow::new("Standard 1.0", 25.0, 24.0),
            PreparationRow::new("Amino 10", 0.0, 24.0),
        ];
        let first = calculate(&reference_patient(), &rows, AutoTarget::Kcal(1), &test_catalog()).unwrap();
        let second = calculate(&reference_patient(), &rows, AutoTarget::Kcal(1), &test_catalog()).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn solved_kcal_row_reproduces_goal(
            height in 150.0f64..200.0,
            weight in 40.0f64..150.0,
            day in 2u32..12,
            fixed_rate in 0.0f64..20.0,
            duration in 1.0f64..24.0,
        ) {
            let input = PatientInput { height_cm: height, weight_kg: weight, day, ..PatientInput::default() };
            let rows = vec![
                PreparationRow::new("Standard 1.0", fixed_rate, 24.0),
                PreparationRow::new("Standard 1.0", 0.0, duration),
            ];
            let calc = calculate(&input, &rows, AutoTarget::Kcal(1), &test_catalog()).unwrap();
            let fixed_kcal = calc.rows[0].nutrition.kcal;
            prop_assume!(calc.result.recommended_goal_kcal >= fixed_kcal);

            // Feed the solved rate back in as a plain row
            let replay = vec![
                rows[0].clone(),
                PreparationRow::new("Standard 1.0", calc.rows[1].flow_rate_ml_h, duration),
            ];
            let again = calculate(&input, &replay, AutoTarget::None, &test_catalog()).unwrap();
            prop_assert!((again.result.totals.kcal - calc.result.recommended_goal_kcal).abs() < 0.05);
        }
    }
}
