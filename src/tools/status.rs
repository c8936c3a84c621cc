//! NutriCalc Status Tool
//!
//! Provides runtime status information about the service, and the usage
//! guide handed to assistants.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::Database;

/// Calculator usage instructions for AI assistants
pub const CALCULATOR_INSTRUCTIONS: &str = r#"
# NutriCalc Instructions

This guide explains how to run the nutrition calculator and keep patient
days on record.

## Patient Form

All fields are optional and accept numbers or numeric text:

| Field | Meaning | Empty means |
|-------|---------|-------------|
| `height` | cm | 0 (no metrics) |
| `weight` | kg | 0 (no metrics) |
| `gender` | "M" or "F" | "M" |
| `day` | hospitalization day, 1-based | 1 |
| `calorimeter` | "ÁNO"/"NIE" or true/false | no |
| `ree` | measured REE, kcal/day (calorimeter only) | 0 |
| `protein_goal_min` / `protein_goal_max` | g/kg/day | 1.5 |
| `fluid_limit` | ml/day | 25 ml/kg ABW rounded up to 100 ml |

A reversed protein range is swapped and reported in `corrections`.
Use `list_protein_presets` and pass `protein_preset` to apply a named range.

## Preparations

Each row: `name` (see `list_products` / `search_products`), `speed` (ml/h),
`hours` (default 24, at most 24).

Mark at most ONE row with `auto_kcal` or `auto_protein`. Its speed is solved:
- `auto_kcal`: fills the recommended energy goal for the day
- `auto_protein`: fills the upper protein goal

Two marked rows are rejected.

## Energy Ramp

| Day | Without calorimeter | With calorimeter |
|-----|---------------------|------------------|
| 1 | 0% | 0% |
| 2 | 33% | 33% |
| 3 | 66% | 66% |
| 4-7 | 70% | 100% |
| 8+ | 100% | 100% |

## Reading Results

- `diff_kcal_class`: deficit below goal, excess from 200 kcal over
- `diff_protein_class`: against the min-max protein range
- `totals.ml_class`: "optimal" within the fluid limit, "deficit" over it

## Saving

`save_patient_day` registers the patient code on first use. Saving a day that
already exists returns `requires_overwrite`; ask the clinician before calling
again with `overwrite: true`.
"#;

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct NutriCalcStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub catalog_products: usize,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,
    pub patient_count: Option<i64>,
    pub patient_day_count: Option<i64>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
    pub checked_at: String,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, db: &Database) -> NutriCalcStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        // Counts are best effort; a broken database still reports process info
        let counts = db
            .with_conn(|conn| {
                let version = crate::db::migrations::get_schema_version(conn)?;
                let patients: i64 =
                    conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
                let days: i64 =
                    conn.query_row("SELECT COUNT(*) FROM patient_days", [], |row| row.get(0))?;
                Ok((version, patients, days))
            })
            .map_err(|e| tracing::warn!("Status query failed: {}", e))
            .ok();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutriCalcStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            catalog_products: build_info.catalog_products,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version: counts.map(|c| c.0),
            patient_count: counts.map(|c| c.1),
            patient_day_count: counts.map(|c| c.2),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
            checked_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    #[test]
    fn test_status_counts() {
        let db = Database::in_memory().unwrap();
        db.with_conn(run_migrations).unwrap();
        let tracker = StatusTracker::new(PathBuf::from(":memory:"));
        let status = tracker.get_status(&db);
        assert_eq!(status.schema_version, Some(1));
        assert_eq!(status.patient_count, Some(0));
        assert_eq!(status.database_size_bytes, None);
        assert_eq!(status.process_id, std::process::id());
        assert!(status.catalog_products > 0);
    }

    #[test]
    fn test_status_without_schema() {
        let db = Database::in_memory().unwrap();
        let status = StatusTracker::new(PathBuf::from(":memory:")).get_status(&db);
        assert_eq!(status.patient_count, None);
    }
}
