//! NutriCalc MCP Server Implementation
//!
//! Implements the MCP server with all calculator and patient-day tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;

use crate::db::Database;
use crate::nutrition::{BuiltinCatalog, PatientForm, PreparationForm, ProductCatalog};
use crate::tools::calculator;
use crate::tools::patient_days;
use crate::tools::patients;
use crate::tools::status::StatusTracker;

/// NutriCalc MCP Service
#[derive(Clone)]
pub struct NutriCalcService {
    status_tracker: Arc<StatusTracker>,
    database: Database,
    catalog: Arc<dyn ProductCatalog + Send + Sync>,
    tool_router: ToolRouter<NutriCalcService>,
}

impl NutriCalcService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self::with_catalog(database_path, database, Arc::new(BuiltinCatalog))
    }

    pub fn with_catalog(
        database_path: PathBuf,
        database: Database,
        catalog: Arc<dyn ProductCatalog + Send + Sync>,
    ) -> Self {
        Self {
            status_tracker: Arc::new(StatusTracker::new(database_path)),
            database,
            catalog,
            tool_router: Self::tool_router(),
        }
    }
}

// ============================================================================
// Calculator Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateNutritionParams {
    /// Patient form values
    #[serde(default)]
    pub patient: PatientForm,
    /// Preparation rows in form order
    #[serde(default)]
    pub preparations: Vec<PreparationForm>,
    /// Apply a named protein range instead of the form's min/max
    pub protein_preset: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListProductsParams {
    /// "enteral" or "parenteral"
    pub route: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchProductsParams {
    pub query: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetRampCurveParams {
    #[serde(default)]
    pub has_calorimeter: bool,
    /// Number of days, default 10
    pub days: Option<u32>,
}

// ============================================================================
// Patient Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreatePatientParams {
    pub patient_code: String,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    /// "M" or "F", default "M"
    pub gender: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListPatientsParams {
    /// Matches patient code, gender or number of saved days
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PatientLookupParams {
    pub id: Option<i64>,
    pub patient_code: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeletePatientParams {
    pub id: i64,
    /// Required when the patient has saved days
    #[serde(default)]
    pub force: bool,
}

// ============================================================================
// Patient Day Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SavePatientDayParams {
    pub patient_code: String,
    #[serde(default)]
    pub patient: PatientForm,
    #[serde(default)]
    pub preparations: Vec<PreparationForm>,
    pub protein_preset: Option<String>,
    /// Replace an existing record for the same day
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetPatientDayParams {
    pub id: Option<i64>,
    pub patient_id: Option<i64>,
    pub day: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PatientDayIdParams {
    pub id: i64,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NutriCalcService {
    // --- Status ---

    #[tool(description = "Get the current status of the NutriCalc service including build info, database counts, and process information")]
    async fn nutricalc_status(&self) -> Result<CallToolResult, McpError> {
        let status = self.status_tracker.get_status(&self.database);
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get instructions for the nutrition calculator: form fields, auto rows, energy ramp, result classes and saving. Call this before the first calculation.")]
    fn calculator_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::CALCULATOR_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(CALCULATOR_INSTRUCTIONS)]))
    }

    // --- Calculator ---

    #[tool(description = "Calculate body metrics, energy and protein goals, preparation totals, the auto row's rate and goal fulfillment. Does not save anything.")]
    fn calculate_nutrition(&self, Parameters(p): Parameters<CalculateNutritionParams>) -> Result<CallToolResult, McpError> {
        let result = calculator::calculate_nutrition(&*self.catalog, &p.patient, &p.preparations, p.protein_preset.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "List nutrition products with their content per ml, optionally only enteral or parenteral")]
    fn list_products(&self, Parameters(p): Parameters<ListProductsParams>) -> Result<CallToolResult, McpError> {
        let result = calculator::list_products(&*self.catalog, p.route.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Search nutrition products by name")]
    fn search_products(&self, Parameters(p): Parameters<SearchProductsParams>) -> Result<CallToolResult, McpError> {
        let result = calculator::search_products(&*self.catalog, &p.query);
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "List named protein target ranges (g/kg/day) usable as protein_preset")]
    fn list_protein_presets(&self) -> Result<CallToolResult, McpError> {
        let result = calculator::list_protein_presets();
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get the planned energy ramp (percent of full goal) per hospitalization day")]
    fn get_ramp_curve(&self, Parameters(p): Parameters<GetRampCurveParams>) -> Result<CallToolResult, McpError> {
        let result = calculator::get_ramp_curve(p.has_calorimeter, p.days);
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Patients ---

    #[tool(description = "Register a new patient by code")]
    fn create_patient(&self, Parameters(p): Parameters<CreatePatientParams>) -> Result<CallToolResult, McpError> {
        let result = patients::create_patient(&self.database, &p.patient_code, p.height_cm, p.weight_kg, p.gender.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "List patients with their number of saved days and last day, optionally filtered")]
    fn list_patients(&self, Parameters(p): Parameters<ListPatientsParams>) -> Result<CallToolResult, McpError> {
        let result = patients::list_patients(&self.database, p.search.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get a patient by id or patient_code, with a summary of saved days")]
    fn get_patient(&self, Parameters(p): Parameters<PatientLookupParams>) -> Result<CallToolResult, McpError> {
        let result = patients::get_patient(&self.database, p.id, p.patient_code.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Some(patient) => serde_json::to_string_pretty(&patient),
            None => Ok(serde_json::json!({"error": "Patient not found", "id": p.id, "patient_code": p.patient_code}).to_string()),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Delete a patient. Requires force=true when the patient has saved days, which are deleted too.")]
    fn delete_patient(&self, Parameters(p): Parameters<DeletePatientParams>) -> Result<CallToolResult, McpError> {
        let result = patients::delete_patient(&self.database, p.id, p.force)
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Ok(success) => serde_json::to_string_pretty(&success),
            Err(blocked) => serde_json::to_string_pretty(&blocked),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get a patient's day-by-day history: recommended kcal, totals and fulfillment percentages")]
    fn get_patient_history(&self, Parameters(p): Parameters<PatientLookupParams>) -> Result<CallToolResult, McpError> {
        let result = patients::get_patient_history(&self.database, p.id, p.patient_code.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Some(history) => serde_json::to_string_pretty(&history),
            None => Ok(serde_json::json!({"error": "Patient not found", "id": p.id, "patient_code": p.patient_code}).to_string()),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Patient Days ---

    #[tool(description = "Calculate and save a hospitalization day for a patient code. Registers the patient if new. An existing day is only replaced with overwrite=true; ask the user first.")]
    fn save_patient_day(&self, Parameters(p): Parameters<SavePatientDayParams>) -> Result<CallToolResult, McpError> {
        let result = patient_days::save_patient_day(
            &self.database,
            &*self.catalog,
            &p.patient_code,
            &p.patient,
            &p.preparations,
            p.protein_preset.as_deref(),
            p.overwrite,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Ok(success) => serde_json::to_string_pretty(&success),
            Err(blocked) => serde_json::to_string_pretty(&blocked),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get a saved day with its preparations, by id or by patient_id and day")]
    fn get_patient_day(&self, Parameters(p): Parameters<GetPatientDayParams>) -> Result<CallToolResult, McpError> {
        let result = patient_days::get_patient_day(&self.database, p.id, p.patient_id, p.day)
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Some(day) => serde_json::to_string_pretty(&day),
            None => Ok(serde_json::json!({"error": "Patient day not found", "id": p.id, "patient_id": p.patient_id, "day": p.day}).to_string()),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Recompute a saved day from its stored inputs with the current product table and store the result")]
    fn recalculate_patient_day(&self, Parameters(p): Parameters<PatientDayIdParams>) -> Result<CallToolResult, McpError> {
        let result = patient_days::recalculate_patient_day(&self.database, &*self.catalog, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Some(recalculated) => serde_json::to_string_pretty(&recalculated),
            None => Ok(format!(r#"{{"error": "Patient day not found", "id": {}}}"#, p.id)),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Delete a saved day and its preparations")]
    fn delete_patient_day(&self, Parameters(p): Parameters<PatientDayIdParams>) -> Result<CallToolResult, McpError> {
        let result = patient_days::delete_patient_day(&self.database, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for NutriCalcService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutricalc".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Clinical Nutrition Calculator".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Clinical Nutrition Calculator (NutriCalc) - energy, protein and fluid goals for hospitalized patients \
                 on enteral and parenteral nutrition. \
                 IMPORTANT: Call calculator_instructions before the first calculation. \
                 Calculator: calculate_nutrition, list_products, search_products, list_protein_presets, get_ramp_curve. \
                 Patients: create/list/get/delete_patient, get_patient_history. \
                 Days: save/get/delete_patient_day, recalculate_patient_day. \
                 save_patient_day requires overwrite=true to replace a saved day; delete_patient requires force=true when days exist."
                    .into(),
            ),
        }
    }
}
