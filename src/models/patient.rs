//! Patient model
//!
//! One record per patient code. Height, weight and gender are the values the
//! patient was registered with; each patient day carries its own copy.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::nutrition::Gender;

/// A patient record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub patient_code: String,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub gender: Gender,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientCreate {
    pub patient_code: String,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub gender: Gender,
}

/// Patient list entry with day statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    #[serde(flatten)]
    pub patient: Patient,
    pub days_count: i64,
    pub last_day: Option<u32>,
}

impl Patient {
    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            patient_code: row.get("patient_code")?,
            height_cm: row.get("height_cm")?,
            weight_kg: row.get("weight_kg")?,
            gender: Gender::from_str(&row.get::<_, String>("gender")?),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Create a new patient
    pub fn create(conn: &Connection, data: &PatientCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO patients (patient_code, height_cm, weight_kg, gender)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                data.patient_code.trim(),
                data.height_cm,
                data.weight_kg,
                data.gender.to_db_str(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a patient by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM patients WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(patient) => Ok(Some(patient)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a patient by their code
    pub fn get_by_code(conn: &Connection, patient_code: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM patients WHERE patient_code = ?1")?;

        let result = stmt.query_row([patient_code.trim()], Self::from_row);
        match result {
            Ok(patient) => Ok(Some(patient)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the patient with this code, registering it first if needed.
    /// Returns the patient and whether it was created.
    pub fn get_or_create(conn: &Connection, data: &PatientCreate) -> DbResult<(Self, bool)> {
        if let Some(existing) = Self::get_by_code(conn, &data.patient_code)? {
            return Ok((existing, false));
        }
        Ok((Self::create(conn, data)?, true))
    }

    /// List patients with day counts, newest first.
    ///
    /// `search` matches the patient code, gender or number of saved days.
    pub fn list(conn: &Connection, search: Option<&str>) -> DbResult<Vec<PatientSummary>> {
        let sql = r#"
            SELECT p.*,
                   COUNT(d.id) AS days_count,
                   MAX(d.day) AS last_day
            FROM patients p
            LEFT JOIN patient_days d ON d.patient_id = p.id
            GROUP BY p.id
            ORDER BY p.created_at DESC, p.id DESC
        "#;

        let mut stmt = conn.prepare(sql)?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(PatientSummary {
                    patient: Self::from_row(row)?,
                    days_count: row.get("days_count")?,
                    last_day: row.get("last_day")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let query = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        Ok(match query {
            Some(q) => summaries.into_iter().filter(|s| s.matches(&q)).collect(),
            None => summaries,
        })
    }

    /// Delete a patient and, by cascade, all their days
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM patients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

impl PatientSummary {
    fn matches(&self, query: &str) -> bool {
        self.patient.patient_code.to_lowercase().contains(query)
            || self.patient.gender.to_db_str().to_lowercase().contains(query)
            || self.days_count.to_string().contains(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn new_patient(code: &str, gender: Gender) -> PatientCreate {
        PatientCreate {
            patient_code: code.to_string(),
            height_cm: Some(170.0),
            weight_kg: Some(90.0),
            gender,
        }
    }

    #[test]
    fn test_create_and_get() {
        let conn = setup();
        let created = Patient::create(&conn, &new_patient("  P-001 ", Gender::Female)).unwrap();
        assert_eq!(created.patient_code, "P-001");
        assert_eq!(created.gender, Gender::Female);

        let by_code = Patient::get_by_code(&conn, "P-001").unwrap().unwrap();
        assert_eq!(by_code.id, created.id);
        assert!(Patient::get_by_id(&conn, created.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let conn = setup();
        Patient::create(&conn, &new_patient("P-001", Gender::Male)).unwrap();
        assert!(Patient::create(&conn, &new_patient("P-001", Gender::Male)).is_err());
    }

    #[test]
    fn test_get_or_create() {
        let conn = setup();
        let (first, created) = Patient::get_or_create(&conn, &new_patient("P-002", Gender::Male)).unwrap();
        assert!(created);
        let (second, created) = Patient::get_or_create(&conn, &new_patient("P-002", Gender::Female)).unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(second.gender, Gender::Male);
    }

    #[test]
    fn test_list_with_search_and_day_stats() {
        let conn = setup();
        let a = Patient::create(&conn, &new_patient("ICU-17", Gender::Male)).unwrap();
        Patient::create(&conn, &new_patient("WARD-3", Gender::Female)).unwrap();
        for day in [1, 4] {
            conn.execute(
                "INSERT INTO patient_days (patient_id, day, calculations) VALUES (?1, ?2, '{}')",
                params![a.id, day],
            )
            .unwrap();
        }

        let all = Patient::list(&conn, None).unwrap();
        assert_eq!(all.len(), 2);
        let icu = all.iter().find(|s| s.patient.id == a.id).unwrap();
        assert_eq!(icu.days_count, 2);
        assert_eq!(icu.last_day, Some(4));

        let found = Patient::list(&conn, Some("icu")).unwrap();
        assert_eq!(found.len(), 1);
        let by_gender = Patient::list(&conn, Some("F")).unwrap();
        assert_eq!(by_gender.len(), 1);
        assert_eq!(by_gender[0].patient.patient_code, "WARD-3");
        assert_eq!(by_gender[0].last_day, None);
    }

    #[test]
    fn test_delete() {
        let conn = setup();
        let p = Patient::create(&conn, &new_patient("P-9", Gender::Male)).unwrap();
        assert!(Patient::delete(&conn, p.id).unwrap());
        assert!(!Patient::delete(&conn, p.id).unwrap());
    }
}
