//! Patient MCP Tools
//!
//! Register, list, inspect and delete patients.

use serde::Serialize;

use crate::db::Database;
use crate::models::{DayHistoryEntry, Patient, PatientCreate, PatientDay, PatientSummary};
use crate::nutrition::format::format_num;
use crate::nutrition::Gender;

/// Response for create_patient
#[derive(Debug, Serialize)]
pub struct CreatePatientResponse {
    pub id: i64,
    pub patient_code: String,
    pub gender: String,
    pub created_at: String,
}

/// Response for list_patients
#[derive(Debug, Serialize)]
pub struct ListPatientsResponse {
    pub patients: Vec<PatientSummary>,
    pub total: usize,
}

/// Patient with their saved days
#[derive(Debug, Serialize)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub history: Vec<DayHistoryEntry>,
}

/// History line with display strings
#[derive(Debug, Serialize)]
pub struct HistoryLine {
    #[serde(flatten)]
    pub entry: DayHistoryEntry,
    pub rec_goal_kcal: String,
    pub total_kcal_display: String,
    pub total_protein: String,
    /// Delivered kcal as a percentage of the recommended goal
    pub kcal_fulfillment_percent: String,
    /// Delivered protein as a percentage of the lower protein goal
    pub protein_fulfillment_percent: String,
}

/// Response for get_patient_history
#[derive(Debug, Serialize)]
pub struct PatientHistoryResponse {
    pub patient_id: i64,
    pub patient_code: String,
    pub days: Vec<HistoryLine>,
}

/// Response for delete_patient when blocked
#[derive(Debug, Serialize)]
pub struct DeletePatientBlockedResponse {
    pub error: String,
    pub requires_force: bool,
    pub days_count: usize,
}

/// Response for successful delete_patient
#[derive(Debug, Serialize)]
pub struct DeletePatientSuccessResponse {
    pub success: bool,
    pub deleted_id: i64,
    pub deleted_days: usize,
}

fn percent_of(value: f64, goal: f64) -> String {
    if goal > 0.0 {
        format_num(value / goal * 100.0, 0)
    } else {
        String::new()
    }
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Register a new patient
pub fn create_patient(
    db: &Database,
    patient_code: &str,
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    gender: Option<&str>,
) -> Result<CreatePatientResponse, String> {
    let code = patient_code.trim();
    if code.is_empty() {
        return Err("Patient code cannot be empty".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = Patient::get_by_code(&conn, code)
        .map_err(|e| format!("Database error: {}", e))?;
    if existing.is_some() {
        return Err(format!("Patient already exists with code: {}", code));
    }

    let data = PatientCreate {
        patient_code: code.to_string(),
        height_cm: height_cm.filter(|h| h.is_finite() && *h > 0.0),
        weight_kg: weight_kg.filter(|w| w.is_finite() && *w > 0.0),
        gender: gender.map(Gender::from_str).unwrap_or_default(),
    };
    let patient = Patient::create(&conn, &data)
        .map_err(|e| format!("Failed to create patient: {}", e))?;
    tracing::info!(id = patient.id, code = %patient.patient_code, "Created patient");

    Ok(CreatePatientResponse {
        id: patient.id,
        patient_code: patient.patient_code,
        gender: patient.gender.to_db_str().to_string(),
        created_at: patient.created_at,
    })
}

/// List patients, optionally filtered by a search string
pub fn list_patients(db: &Database, search: Option<&str>) -> Result<ListPatientsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let patients = Patient::list(&conn, search)
        .map_err(|e| format!("Failed to list patients: {}", e))?;
    let total = patients.len();

    Ok(ListPatientsResponse { patients, total })
}

fn find_patient(
    conn: &rusqlite::Connection,
    id: Option<i64>,
    patient_code: Option<&str>,
) -> Result<Option<Patient>, String> {
    let result = match (id, patient_code) {
        (Some(id), _) => Patient::get_by_id(conn, id),
        (None, Some(code)) => Patient::get_by_code(conn, code),
        (None, None) => return Err("Either id or patient_code is required".to_string()),
    };
    result.map_err(|e| format!("Failed to get patient: {}", e))
}

/// Get a patient by ID or code, with their day history
pub fn get_patient(
    db: &Database,
    id: Option<i64>,
    patient_code: Option<&str>,
) -> Result<Option<PatientDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(patient) = find_patient(&conn, id, patient_code)? else {
        return Ok(None);
    };
    let history = PatientDay::history(&conn, patient.id)
        .map_err(|e| format!("Failed to load patient days: {}", e))?;

    Ok(Some(PatientDetail { patient, history }))
}

/// Day-by-day history with fulfillment percentages
pub fn get_patient_history(
    db: &Database,
    id: Option<i64>,
    patient_code: Option<&str>,
) -> Result<Option<PatientHistoryResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(patient) = find_patient(&conn, id, patient_code)? else {
        return Ok(None);
    };
    let history = PatientDay::history(&conn, patient.id)
        .map_err(|e| format!("Failed to load patient days: {}", e))?;

    let days = history
        .into_iter()
        .map(|entry| HistoryLine {
            rec_goal_kcal: format_num(entry.recommended_goal_kcal, 1),
            total_kcal_display: format_num(entry.total_kcal, 1),
            total_protein: format_num(entry.total_protein_g, 1),
            kcal_fulfillment_percent: percent_of(entry.total_kcal, entry.recommended_goal_kcal),
            protein_fulfillment_percent: percent_of(entry.total_protein_g, entry.protein_goal_min_g),
            entry,
        })
        .collect();

    Ok(Some(PatientHistoryResponse {
        patient_id: patient.id,
        patient_code: patient.patient_code,
        days,
    }))
}

/// Delete a patient. Patients with saved days require force.
pub fn delete_patient(
    db: &Database,
    id: i64,
    force: bool,
) -> Result<Result<DeletePatientSuccessResponse, DeletePatientBlockedResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Patient::get_by_id(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Patient not found with id: {}", id));
    }

    let days_count = PatientDay::list_for_patient(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?
        .len();

    if days_count > 0 && !force {
        return Ok(Err(DeletePatientBlockedResponse {
            error: format!(
                "Patient has {} saved day(s); deleting removes them too. Confirm with force=true",
                days_count
            ),
            requires_force: true,
            days_count,
        }));
    }

    let deleted = Patient::delete(&conn, id)
        .map_err(|e| format!("Failed to delete patient: {}", e))?;
    if !deleted {
        return Err("Patient not found or delete failed".to_string());
    }
    tracing::info!(id, days_count, "Deleted patient");

    Ok(Ok(DeletePatientSuccessResponse {
        success: true,
        deleted_id: id,
        deleted_days: days_count,
    }))
}
