//! Preparation model
//!
//! Administered products saved with a patient day, in form order.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::nutrition::{AutoTarget, ComputedRow, EngineError, Nutrition, PreparationRow};

/// A saved preparation row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preparation {
    pub id: i64,
    pub patient_day_id: i64,
    pub product: String,
    pub auto_kcal: bool,
    pub auto_protein: bool,
    /// Entered rate, or the solved rate for the auto row
    pub flow_rate_ml_h: f64,
    pub duration_h: f64,
    pub sort_order: i32,
    pub calculations: Nutrition,
}

impl Preparation {
    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let calculations: String = row.get("calculations")?;
        Ok(Self {
            id: row.get("id")?,
            patient_day_id: row.get("patient_day_id")?,
            product: row.get("product")?,
            auto_kcal: row.get::<_, i32>("auto_kcal")? != 0,
            auto_protein: row.get::<_, i32>("auto_protein")? != 0,
            flow_rate_ml_h: row.get("flow_rate_ml_h")?,
            duration_h: row.get("duration_h")?,
            sort_order: row.get("sort_order")?,
            calculations: serde_json::from_str(&calculations).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })?,
        })
    }

    /// Replace all rows of a patient day with freshly computed ones
    pub fn replace_for_day(
        conn: &Connection,
        patient_day_id: i64,
        rows: &[ComputedRow],
        auto: AutoTarget,
    ) -> DbResult<Vec<Self>> {
        conn.execute("DELETE FROM preparations WHERE patient_day_id = ?1", [patient_day_id])?;

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO preparations (
                patient_day_id, product, auto_kcal, auto_protein,
                flow_rate_ml_h, duration_h, sort_order, calculations
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )?;

        for (index, row) in rows.iter().enumerate() {
            let (auto_kcal, auto_protein) = auto.flags_for(index);
            stmt.execute(params![
                patient_day_id,
                row.product,
                auto_kcal,
                auto_protein,
                row.flow_rate_ml_h,
                row.duration_h,
                index as i32,
                serde_json::to_string(&row.nutrition)?,
            ])?;
        }

        Self::list_for_day(conn, patient_day_id)
    }

    /// Rows of a patient day in form order
    pub fn list_for_day(conn: &Connection, patient_day_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM preparations WHERE patient_day_id = ?1 ORDER BY sort_order, id",
        )?;
        let preparations = stmt
            .query_map([patient_day_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(preparations)
    }

    pub fn to_row(&self) -> PreparationRow {
        PreparationRow::new(self.product.clone(), self.flow_rate_ml_h, self.duration_h)
    }
}

/// Engine rows and auto target for a saved list of preparations
pub fn to_engine_rows(
    preparations: &[Preparation],
) -> Result<(Vec<PreparationRow>, AutoTarget), EngineError> {
    let auto = AutoTarget::from_flags(preparations.iter().map(|p| (p.auto_kcal, p.auto_protein)))?;
    Ok((preparations.iter().map(Preparation::to_row).collect(), auto))
}
