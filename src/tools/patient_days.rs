//! Patient Day MCP Tools
//!
//! Save, load, recalculate and delete the calculator state of one
//! hospitalization day.

use serde::Serialize;

use crate::db::Database;
use crate::models::{
    to_engine_rows, Patient, PatientCreate, PatientDay, PatientDayDetail, PatientDaySave,
    SaveOutcome,
};
use crate::nutrition::{calculate, preparation_rows, PatientForm, PreparationForm, ProductCatalog};

use super::calculator::{patient_input, CalculateResponse};

/// Response for save_patient_day
#[derive(Debug, Serialize)]
pub struct SavePatientDaySuccessResponse {
    pub success: bool,
    /// "created" or "updated"
    pub action: String,
    pub patient_created: bool,
    pub patient_id: i64,
    pub patient_day_id: i64,
    pub day: u32,
    pub calculation: CalculateResponse,
}

/// Response for save_patient_day when the day already exists
#[derive(Debug, Serialize)]
pub struct SavePatientDayBlockedResponse {
    pub error: String,
    pub requires_overwrite: bool,
    pub patient_day_id: i64,
    pub day: u32,
    pub updated_at: String,
}

/// Response for recalculate_patient_day
#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub patient_day_id: i64,
    /// Whether the stored display values differed from the fresh ones
    pub changed: bool,
    pub detail: PatientDayDetail,
}

/// Response for delete_patient_day
#[derive(Debug, Serialize)]
pub struct DeletePatientDayResponse {
    pub success: bool,
    pub deleted_id: i64,
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Calculate and save a day for a patient code, registering the patient if
/// needed. An existing day is only replaced with `overwrite`.
pub fn save_patient_day(
    db: &Database,
    catalog: &dyn ProductCatalog,
    patient_code: &str,
    patient: &PatientForm,
    preparations: &[PreparationForm],
    preset: Option<&str>,
    overwrite: bool,
) -> Result<Result<SavePatientDaySuccessResponse, SavePatientDayBlockedResponse>, String> {
    let code = patient_code.trim();
    if code.is_empty() {
        return Err("Patient code is required to save".to_string());
    }

    let input = patient_input(patient, preset)?;
    // Rows without a product are not stored
    let named: Vec<PreparationForm> = preparations
        .iter()
        .filter(|p| !p.name.trim().is_empty())
        .cloned()
        .collect();
    let (rows, auto) = preparation_rows(&named).map_err(|e| e.to_string())?;
    let calculation = calculate(&input, &rows, auto, catalog).map_err(|e| e.to_string())?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let registration = PatientCreate {
        patient_code: code.to_string(),
        height_cm: Some(input.height_cm).filter(|h| *h > 0.0),
        weight_kg: Some(input.weight_kg).filter(|w| *w > 0.0),
        gender: input.gender,
    };
    let (record, patient_created) = Patient::get_or_create(&conn, &registration)
        .map_err(|e| format!("Failed to register patient: {}", e))?;

    let data = PatientDaySave {
        patient_id: record.id,
        input: &input,
        auto,
        calculation: &calculation,
    };
    let outcome = PatientDay::save(&conn, &data, overwrite)
        .map_err(|e| format!("Failed to save patient day: {}", e))?;

    let (action, detail) = match outcome {
        SaveOutcome::Created(detail) => ("created", detail),
        SaveOutcome::Updated(detail) => ("updated", detail),
        SaveOutcome::AlreadyExists(existing) => {
            return Ok(Err(SavePatientDayBlockedResponse {
                error: format!(
                    "Day {} is already saved for patient {}. Confirm with overwrite=true to replace it",
                    existing.day, code
                ),
                requires_overwrite: true,
                patient_day_id: existing.id,
                day: existing.day,
                updated_at: existing.updated_at,
            }));
        }
    };

    Ok(Ok(SavePatientDaySuccessResponse {
        success: true,
        action: action.to_string(),
        patient_created,
        patient_id: record.id,
        patient_day_id: detail.day.id,
        day: detail.day.day,
        calculation: CalculateResponse::new(calculation, input.has_calorimeter),
    }))
}

/// Get a saved day by ID, or by patient ID and day number
pub fn get_patient_day(
    db: &Database,
    id: Option<i64>,
    patient_id: Option<i64>,
    day: Option<u32>,
) -> Result<Option<PatientDayDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let id = match (id, patient_id, day) {
        (Some(id), _, _) => id,
        (None, Some(patient_id), Some(day)) => {
            match PatientDay::get_for_day(&conn, patient_id, day)
                .map_err(|e| format!("Failed to get patient day: {}", e))?
            {
                Some(found) => found.id,
                None => return Ok(None),
            }
        }
        _ => return Err("Either id, or patient_id and day, are required".to_string()),
    };

    PatientDay::get_detail(&conn, id).map_err(|e| format!("Failed to get patient day: {}", e))
}

/// Recompute a saved day from its stored inputs and store the fresh result
pub fn recalculate_patient_day(
    db: &Database,
    catalog: &dyn ProductCatalog,
    id: i64,
) -> Result<Option<RecalculateResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(saved) = PatientDay::get_detail(&conn, id)
        .map_err(|e| format!("Failed to get patient day: {}", e))?
    else {
        return Ok(None);
    };
    let (rows, auto) = to_engine_rows(&saved.preparations).map_err(|e| e.to_string())?;
    let calculation =
        calculate(&saved.day.to_input(), &rows, auto, catalog).map_err(|e| e.to_string())?;
    let changed = saved.day.calculations.display != calculation.result.display();

    let detail = PatientDay::update_calculation(&conn, id, &calculation, auto)
        .map_err(|e| format!("Failed to store recalculation: {}", e))?;
    if changed {
        tracing::info!(id, day = detail.day.day, "Recalculated patient day changed");
    }

    Ok(Some(RecalculateResponse {
        patient_day_id: id,
        changed,
        detail,
    }))
}

/// Delete a saved day
pub fn delete_patient_day(db: &Database, id: i64) -> Result<DeletePatientDayResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = PatientDay::delete(&conn, id)
        .map_err(|e| format!("Failed to delete patient day: {}", e))?;
    if !deleted {
        return Err(format!("Patient day not found with id: {}", id));
    }
    tracing::info!(id, "Deleted patient day");

    Ok(DeletePatientDayResponse {
        success: true,
        deleted_id: id,
    })
}
