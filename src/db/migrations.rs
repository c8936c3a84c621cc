//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: patients, patient days and their preparations
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- PATIENTS
        -- One record per patient code
        -- ============================================
        CREATE TABLE patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_code TEXT NOT NULL UNIQUE,
            height_cm REAL,
            weight_kg REAL,
            gender TEXT NOT NULL CHECK(gender IN ('M', 'F')) DEFAULT 'M',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- PATIENT DAYS
        -- Form inputs for one hospitalization day and the
        -- calculation they produced
        -- ============================================
        CREATE TABLE patient_days (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            day INTEGER NOT NULL CHECK(day >= 1),
            height_cm REAL NOT NULL DEFAULT 0,
            weight_kg REAL NOT NULL DEFAULT 0,
            gender TEXT NOT NULL CHECK(gender IN ('M', 'F')) DEFAULT 'M',
            has_calorimeter INTEGER NOT NULL DEFAULT 0,
            ree_kcal REAL,
            protein_goal_min REAL NOT NULL DEFAULT 1.5,
            protein_goal_max REAL NOT NULL DEFAULT 1.5,
            fluid_limit_ml REAL,                 -- NULL: ABW-based default
            calculations TEXT NOT NULL,          -- JSON CalculationResult
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(patient_id, day)
        );

        CREATE INDEX idx_patient_days_patient ON patient_days(patient_id);

        -- ============================================
        -- PREPARATIONS
        -- Administered products for a patient day, in form order
        -- ============================================
        CREATE TABLE preparations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_day_id INTEGER NOT NULL REFERENCES patient_days(id) ON DELETE CASCADE,
            product TEXT NOT NULL,
            auto_kcal INTEGER NOT NULL DEFAULT 0,
            auto_protein INTEGER NOT NULL DEFAULT 0,
            flow_rate_ml_h REAL NOT NULL DEFAULT 0,
            duration_h REAL NOT NULL DEFAULT 24,
            sort_order INTEGER NOT NULL DEFAULT 0,
            calculations TEXT NOT NULL,          -- JSON Nutrition
            CHECK(NOT (auto_kcal AND auto_protein))
        );

        CREATE INDEX idx_preparations_day ON preparations(patient_day_id, sort_order);
        "#,
    )?;
    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    Ok(get_schema_version(conn)? < SCHEMA_VERSION)
}
