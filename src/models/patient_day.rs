//! Patient day model
//!
//! Form inputs for one hospitalization day of a patient, the preparations
//! administered, and the calculation they produced.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::preparation::Preparation;
use crate::db::{DbError, DbResult};
use crate::nutrition::{
    AutoTarget, Calculation, CalculationDisplay, CalculationResult, FulfillmentStatus, Gender,
    PatientInput,
};

/// Calculation blob stored with a patient day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCalculations {
    pub result: CalculationResult,
    pub display: CalculationDisplay,
}

impl From<&CalculationResult> for DayCalculations {
    fn from(result: &CalculationResult) -> Self {
        Self {
            result: result.clone(),
            display: result.display(),
        }
    }
}

/// A saved patient day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDay {
    pub id: i64,
    pub patient_id: i64,
    pub day: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub gender: Gender,
    pub has_calorimeter: bool,
    pub ree_kcal: Option<f64>,
    pub protein_goal_min: f64,
    pub protein_goal_max: f64,
    /// As entered; `None` means the ABW-based default was used
    pub fluid_limit_ml: Option<f64>,
    pub calculations: DayCalculations,
    pub created_at: String,
    pub updated_at: String,
}

/// A patient day with its preparations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDayDetail {
    #[serde(flatten)]
    pub day: PatientDay,
    pub preparations: Vec<Preparation>,
}

/// One line of a patient's day-by-day history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayHistoryEntry {
    pub id: i64,
    pub day: u32,
    pub created_at: String,
    pub updated_at: String,
    pub recommended_goal_kcal: f64,
    pub total_kcal: f64,
    pub protein_goal_min_g: f64,
    pub protein_goal_max_g: f64,
    pub total_protein_g: f64,
    pub total_ml: f64,
    pub kcal_status: FulfillmentStatus,
    pub protein_status: FulfillmentStatus,
}

/// Everything needed to store one day
#[derive(Debug, Clone)]
pub struct PatientDaySave<'a> {
    pub patient_id: i64,
    pub input: &'a PatientInput,
    pub auto: AutoTarget,
    pub calculation: &'a Calculation,
}

/// Result of a save attempt
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Created(PatientDayDetail),
    Updated(PatientDayDetail),
    /// A record for this day exists and overwriting was not confirmed
    AlreadyExists(PatientDay),
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl PatientDay {
    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            day: row.get("day")?,
            height_cm: row.get("height_cm")?,
            weight_kg: row.get("weight_kg")?,
            gender: Gender::from_str(&row.get::<_, String>("gender")?),
            has_calorimeter: row.get::<_, i32>("has_calorimeter")? != 0,
            ree_kcal: row.get("ree_kcal")?,
            protein_goal_min: row.get("protein_goal_min")?,
            protein_goal_max: row.get("protein_goal_max")?,
            fluid_limit_ml: row.get("fluid_limit_ml")?,
            calculations: json_column(row, "calculations")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Get a patient day by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM patient_days WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    /// Get a patient's record for a hospitalization day
    pub fn get_for_day(conn: &Connection, patient_id: i64, day: u32) -> DbResult<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM patient_days WHERE patient_id = ?1 AND day = ?2")?;
        Ok(stmt.query_row(params![patient_id, day], Self::from_row).optional()?)
    }

    /// Get a patient day together with its preparations
    pub fn get_detail(conn: &Connection, id: i64) -> DbResult<Option<PatientDayDetail>> {
        match Self::get_by_id(conn, id)? {
            Some(day) => {
                let preparations = Preparation::list_for_day(conn, day.id)?;
                Ok(Some(PatientDayDetail { day, preparations }))
            }
            None => Ok(None),
        }
    }

    /// All days of a patient, by day number
    pub fn list_for_patient(conn: &Connection, patient_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM patient_days WHERE patient_id = ?1 ORDER BY day")?;
        let days = stmt
            .query_map([patient_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(days)
    }

    /// Day-by-day history of a patient
    pub fn history(conn: &Connection, patient_id: i64) -> DbResult<Vec<DayHistoryEntry>> {
        Ok(Self::list_for_patient(conn, patient_id)?
            .into_iter()
            .map(|d| {
                let r = &d.calculations.result;
                DayHistoryEntry {
                    id: d.id,
                    day: d.day,
                    created_at: d.created_at.clone(),
                    updated_at: d.updated_at.clone(),
                    recommended_goal_kcal: r.recommended_goal_kcal,
                    total_kcal: r.totals.kcal,
                    protein_goal_min_g: r.protein_goal.min_g,
                    protein_goal_max_g: r.protein_goal.max_g,
                    total_protein_g: r.totals.protein_g,
                    total_ml: r.totals.ml,
                    kcal_status: r.fulfillment.kcal_status,
                    protein_status: r.fulfillment.protein_status,
                }
            })
            .collect())
    }

    /// Save a day. An existing record for the same patient and day is only
    /// overwritten when `overwrite` is set.
    pub fn save(conn: &Connection, data: &PatientDaySave, overwrite: bool) -> DbResult<SaveOutcome> {
        let corrections = &data.calculation.corrections;
        let day = corrections.day;

        let existing = Self::get_for_day(conn, data.patient_id, day)?;
        if let Some(existing) = &existing {
            if !overwrite {
                return Ok(SaveOutcome::AlreadyExists(existing.clone()));
            }
        }

        let calculations =
            serde_json::to_string(&DayCalculations::from(&data.calculation.result))?;
        let ree_kcal = data.input.has_calorimeter.then_some(data.input.measured_ree_kcal);

        let tx = conn.unchecked_transaction()?;
        let id = match &existing {
            Some(existing) => {
                tx.execute(
                    r#"
                    UPDATE patient_days SET
                        height_cm = ?1, weight_kg = ?2, gender = ?3, has_calorimeter = ?4,
                        ree_kcal = ?5, protein_goal_min = ?6, protein_goal_max = ?7,
                        fluid_limit_ml = ?8, calculations = ?9, updated_at = datetime('now')
                    WHERE id = ?10
                    "#,
                    params![
                        data.input.height_cm,
                        data.input.weight_kg,
                        data.input.gender.to_db_str(),
                        data.input.has_calorimeter,
                        ree_kcal,
                        corrections.protein_min_g_per_kg,
                        corrections.protein_max_g_per_kg,
                        data.input.fluid_limit_ml,
                        calculations,
                        existing.id,
                    ],
                )?;
                existing.id
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO patient_days (
                        patient_id, day, height_cm, weight_kg, gender, has_calorimeter,
                        ree_kcal, protein_goal_min, protein_goal_max, fluid_limit_ml, calculations
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    "#,
                    params![
                        data.patient_id,
                        day,
                        data.input.height_cm,
                        data.input.weight_kg,
                        data.input.gender.to_db_str(),
                        data.input.has_calorimeter,
                        ree_kcal,
                        corrections.protein_min_g_per_kg,
                        corrections.protein_max_g_per_kg,
                        data.input.fluid_limit_ml,
                        calculations,
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };
        Preparation::replace_for_day(&tx, id, &data.calculation.rows, data.auto)?;
        tx.commit()?;

        tracing::info!(
            patient_id = data.patient_id,
            day,
            overwritten = existing.is_some(),
            "Saved patient day"
        );

        let detail = Self::get_detail(conn, id)?
            .ok_or_else(|| DbError::NotFound(format!("patient day {}", id)))?;
        Ok(if existing.is_some() {
            SaveOutcome::Updated(detail)
        } else {
            SaveOutcome::Created(detail)
        })
    }

    /// Store a recomputed calculation for an existing day
    pub fn update_calculation(
        conn: &Connection,
        id: i64,
        calculation: &Calculation,
        auto: AutoTarget,
    ) -> DbResult<PatientDayDetail> {
        let calculations = serde_json::to_string(&DayCalculations::from(&calculation.result))?;

        let tx = conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE patient_days SET calculations = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![calculations, id],
        )?;
        if rows == 0 {
            return Err(DbError::NotFound(format!("patient day {}", id)));
        }
        Preparation::replace_for_day(&tx, id, &calculation.rows, auto)?;
        tx.commit()?;

        Self::get_detail(conn, id)?.ok_or_else(|| DbError::NotFound(format!("patient day {}", id)))
    }

    /// Delete a patient day and its preparations
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM patient_days WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Rebuild the engine input stored for this day
    pub fn to_input(&self) -> PatientInput {
        PatientInput {
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            gender: self.gender,
            day: self.day,
            has_calorimeter: self.has_calorimeter,
            measured_ree_kcal: self.ree_kcal.unwrap_or(0.0),
            protein_min_g_per_kg: self.protein_goal_min,
            protein_max_g_per_kg: self.protein_goal_max,
            fluid_limit_ml: self.fluid_limit_ml,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::preparation::to_engine_rows;
    use crate::models::{Patient, PatientCreate};
    use crate::nutrition::{calculate, BuiltinCatalog, PreparationRow};

    fn setup() -> (Connection, Patient) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        let patient = Patient::create(
            &conn,
            &PatientCreate {
                patient_code: "ICU-1".to_string(),
                height_cm: Some(170.0),
                weight_kg: Some(90.0),
                gender: Gender::Male,
            },
        )
        .unwrap();
        (conn, patient)
    }

    fn input(day: u32) -> PatientInput {
        PatientInput {
            height_cm: 170.0,
            weight_kg: 90.0,
            gender: Gender::Male,
            day,
            protein_min_g_per_kg: 2.0,
            protein_max_g_per_kg: 1.2,
            ..PatientInput::default()
        }
    }

    fn rows() -> Vec<PreparationRow> {
        vec![
            PreparationRow::new("Nutrison", 0.0, 24.0),
            PreparationRow::new("Aminoven 10%", 10.0, 20.0),
        ]
    }

    fn save(conn: &Connection, patient: &Patient, day: u32, overwrite: bool) -> SaveOutcome {
        let input = input(day);
        let auto = AutoTarget::Kcal(0);
        let calculation = calculate(&input, &rows(), auto, &BuiltinCatalog).unwrap();
        let data = PatientDaySave {
            patient_id: patient.id,
            input: &input,
            auto,
            calculation: &calculation,
        };
        PatientDay::save(conn, &data, overwrite).unwrap()
    }

    #[test]
    fn test_save_creates_then_requires_confirmation() {
        let (conn, patient) = setup();
        let created = match save(&conn, &patient, 3, false) {
            SaveOutcome::Created(detail) => detail,
            other => panic!("expected Created, got {:?}", other),
        };
        assert_eq!(created.day.day, 3);
        assert_eq!(created.preparations.len(), 2);
        // Protein targets are stored in corrected order
        assert_eq!(created.day.protein_goal_min, 1.2);
        assert_eq!(created.day.protein_goal_max, 2.0);
        assert_eq!(created.day.fluid_limit_ml, None);
        assert_eq!(created.day.gender, Gender::Male);

        assert!(matches!(save(&conn, &patient, 3, false), SaveOutcome::AlreadyExists(_)));
        match save(&conn, &patient, 3, true) {
            SaveOutcome::Updated(detail) => assert_eq!(detail.day.id, created.day.id),
            other => panic!("expected Updated, got {:?}", other),
        }
        assert_eq!(PatientDay::list_for_patient(&conn, patient.id).unwrap().len(), 1);
    }

    #[test]
    fn test_round_trip_recomputes_same_result() {
        let (conn, patient) = setup();
        let detail = match save(&conn, &patient, 3, false) {
            SaveOutcome::Created(detail) => detail,
            other => panic!("expected Created, got {:?}", other),
        };

        let loaded = PatientDay::get_detail(&conn, detail.day.id).unwrap().unwrap();
        let (engine_rows, auto) = to_engine_rows(&loaded.preparations).unwrap();
        assert_eq!(auto, AutoTarget::Kcal(0));
        let recomputed = calculate(
            &loaded.day.to_input(),
            &engine_rows,
            auto,
            &BuiltinCatalog,
        )
        .unwrap();

        let stored = &loaded.day.calculations.result;
        let fresh = &recomputed.result;
        assert!((stored.totals.kcal - fresh.totals.kcal).abs() < 1e-6);
        assert!((stored.totals.protein_g - fresh.totals.protein_g).abs() < 1e-6);
        assert!((stored.recommended_goal_kcal - fresh.recommended_goal_kcal).abs() < 1e-6);
        assert_eq!(stored.fulfillment.kcal_status, fresh.fulfillment.kcal_status);
        assert_eq!(loaded.day.calculations.display, fresh.display());
    }

    #[test]
    fn test_history_and_delete_cascade() {
        let (conn, patient) = setup();
        save(&conn, &patient, 2, false);
        save(&conn, &patient, 5, false);

        let history = PatientDay::history(&conn, patient.id).unwrap();
        assert_eq!(history.iter().map(|h| h.day).collect::<Vec<_>>(), vec![2, 5]);
        assert!(history[1].recommended_goal_kcal > history[0].recommended_goal_kcal);

        let day = PatientDay::get_for_day(&conn, patient.id, 2).unwrap().unwrap();
        assert!(PatientDay::delete(&conn, day.id).unwrap());
        let orphans: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM preparations WHERE patient_day_id = ?1",
                [day.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);

        assert!(Patient::delete(&conn, patient.id).unwrap());
        assert!(PatientDay::list_for_patient(&conn, patient.id).unwrap().is_empty());
    }

    #[test]
    fn test_update_calculation_missing_day() {
        let (conn, _) = setup();
        let calculation = calculate(&input(1), &[], AutoTarget::None, &BuiltinCatalog).unwrap();
        let err = PatientDay::update_calculation(&conn, 999, &calculation, AutoTarget::None).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
