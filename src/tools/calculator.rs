//! Calculator MCP Tools
//!
//! Stateless tools around the calculation engine and the product catalog.

use serde::Serialize;

use crate::nutrition::catalog::{protein_preset, PROTEIN_PRESETS};
use crate::nutrition::goals::{ramp_curve, RAMP_CHART_DAYS};
use crate::nutrition::{
    calculate, preparation_rows, Calculation, CalculationDisplay, CalculationResult, ComputedRow,
    InputCorrections, PatientForm, PatientInput, PreparationForm, ProductCatalog, RowDisplay,
};

/// A computed row with its display strings
#[derive(Debug, Serialize)]
pub struct RowResult {
    #[serde(flatten)]
    pub row: ComputedRow,
    pub display: RowDisplay,
}

/// Response for calculate_nutrition
#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub corrections: InputCorrections,
    pub result: CalculationResult,
    pub display: CalculationDisplay,
    pub rows: Vec<RowResult>,
    /// Planned ramp percentages for the first days, for the ramp chart
    pub ramp_curve: Vec<u32>,
}

impl CalculateResponse {
    pub fn new(calc: Calculation, has_calorimeter: bool) -> Self {
        let display = calc.result.display();
        Self {
            corrections: calc.corrections,
            result: calc.result,
            display,
            rows: calc
                .rows
                .into_iter()
                .map(|row| RowResult {
                    display: row.display(),
                    row,
                })
                .collect(),
            ramp_curve: ramp_curve(has_calorimeter, RAMP_CHART_DAYS),
        }
    }
}

/// Product entry for listing
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub name: String,
    pub route: String,
    pub kcal_per_ml: f64,
    pub protein_g_per_ml: f64,
    pub fat_g_per_ml: f64,
    pub carb_g_per_ml: f64,
}

/// Response for list_products and search_products
#[derive(Debug, Serialize)]
pub struct ListProductsResponse {
    pub products: Vec<ProductSummary>,
    pub total: usize,
}

/// Protein preset entry
#[derive(Debug, Serialize)]
pub struct ProteinPresetSummary {
    pub label: String,
    pub min_g_per_kg: f64,
    pub max_g_per_kg: f64,
}

/// Response for list_protein_presets
#[derive(Debug, Serialize)]
pub struct ListProteinPresetsResponse {
    pub presets: Vec<ProteinPresetSummary>,
}

/// One day of the ramp chart
#[derive(Debug, Serialize)]
pub struct RampPoint {
    pub day: u32,
    pub percent: u32,
}

/// Response for get_ramp_curve
#[derive(Debug, Serialize)]
pub struct RampCurveResponse {
    pub has_calorimeter: bool,
    pub points: Vec<RampPoint>,
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Coerce the patient form, applying a named protein preset if given
pub fn patient_input(patient: &PatientForm, preset: Option<&str>) -> Result<PatientInput, String> {
    let mut input = patient.to_input();
    if let Some(label) = preset.map(str::trim).filter(|l| !l.is_empty()) {
        let preset = protein_preset(label)
            .ok_or_else(|| format!("Unknown protein preset: {}", label))?;
        input.protein_min_g_per_kg = preset.min_g_per_kg;
        input.protein_max_g_per_kg = preset.max_g_per_kg;
    }
    Ok(input)
}

/// Run the calculation engine on form values
pub fn calculate_nutrition(
    catalog: &dyn ProductCatalog,
    patient: &PatientForm,
    preparations: &[PreparationForm],
    preset: Option<&str>,
) -> Result<CalculateResponse, String> {
    let input = patient_input(patient, preset)?;
    let (rows, auto) = preparation_rows(preparations).map_err(|e| e.to_string())?;
    let calc = calculate(&input, &rows, auto, catalog).map_err(|e| e.to_string())?;
    Ok(CalculateResponse::new(calc, input.has_calorimeter))
}

fn summarize(catalog: &dyn ProductCatalog, query: Option<&str>) -> ListProductsResponse {
    let products: Vec<ProductSummary> = catalog
        .search(query.unwrap_or(""))
        .into_iter()
        .map(|p| ProductSummary {
            name: p.name.to_string(),
            route: p.route.as_str().to_string(),
            kcal_per_ml: p.profile.kcal_per_ml,
            protein_g_per_ml: p.profile.protein_g_per_ml,
            fat_g_per_ml: p.profile.fat_g_per_ml,
            carb_g_per_ml: p.profile.carb_g_per_ml,
        })
        .collect();
    let total = products.len();
    ListProductsResponse { products, total }
}

/// List all products, optionally only one route
pub fn list_products(catalog: &dyn ProductCatalog, route: Option<&str>) -> Result<ListProductsResponse, String> {
    let mut response = summarize(catalog, None);
    if let Some(route) = route.map(|r| r.trim().to_lowercase()).filter(|r| !r.is_empty()) {
        if route != "enteral" && route != "parenteral" {
            return Err(format!("Unknown route '{}', expected enteral or parenteral", route));
        }
        response.products.retain(|p| p.route == route);
        response.total = response.products.len();
    }
    Ok(response)
}

/// Search products by name
pub fn search_products(catalog: &dyn ProductCatalog, query: &str) -> ListProductsResponse {
    summarize(catalog, Some(query))
}

pub fn list_protein_presets() -> ListProteinPresetsResponse {
    ListProteinPresetsResponse {
        presets: PROTEIN_PRESETS
            .iter()
            .map(|p| ProteinPresetSummary {
                label: p.label.to_string(),
                min_g_per_kg: p.min_g_per_kg,
                max_g_per_kg: p.max_g_per_kg,
            })
            .collect(),
    }
}

/// Planned ramp percentages for days 1..=days (default 10)
pub fn get_ramp_curve(has_calorimeter: bool, days: Option<u32>) -> RampCurveResponse {
    let days = days.unwrap_or(RAMP_CHART_DAYS).clamp(1, 60);
    RampCurveResponse {
        has_calorimeter,
        points: ramp_curve(has_calorimeter, days)
            .into_iter()
            .zip(1..)
            .map(|(percent, day)| RampPoint { day, percent })
            .collect(),
    }
}
