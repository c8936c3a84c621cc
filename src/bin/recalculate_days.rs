//! Recompute stored patient days with the current product table
//! Usage: cargo run --bin recalculate_days -- [patient_code]

use nutricalc::models::{Patient, PatientDay};
use nutricalc::nutrition::BuiltinCatalog;
use nutricalc::tools::patient_days::recalculate_patient_day;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let patient_code = args.get(1).map(|s| s.as_str());

    let db_path = nutricalc::config::database_path();
    println!("Database: {}", db_path.display());

    let database = nutricalc::db::Database::new(&db_path)?;
    database.with_conn(nutricalc::db::migrations::run_migrations)?;

    let patients = database.with_conn(|conn| match patient_code {
        Some(code) => Ok(Patient::get_by_code(conn, code)?.into_iter().collect()),
        None => Ok(Patient::list(conn, None)?.into_iter().map(|s| s.patient).collect::<Vec<_>>()),
    })?;

    if patients.is_empty() {
        println!("No patients found{}", patient_code.map(|c| format!(" for code: {}", c)).unwrap_or_default());
        return Ok(());
    }

    let mut total = 0;
    let mut changed = 0;
    for patient in &patients {
        let days = database.with_conn(|conn| PatientDay::list_for_patient(conn, patient.id))?;
        println!("\nPatient {} ({} days)", patient.patient_code, days.len());

        for day in &days {
            let old = &day.calculations.display;
            let Some(result) = recalculate_patient_day(&database, &BuiltinCatalog, day.id)? else {
                continue;
            };
            let new = &result.detail.day.calculations.display;
            total += 1;

            if result.changed {
                changed += 1;
                println!(
                    "  Day {}: kcal {} -> {} (goal {} -> {}), protein {} -> {}",
                    day.day,
                    old.total_kcal,
                    new.total_kcal,
                    old.rec_goal_kcal,
                    new.rec_goal_kcal,
                    old.total_protein,
                    new.total_protein
                );
            } else {
                println!("  Day {}: unchanged", day.day);
            }
        }
    }

    println!("\nRecalculated {} days, {} changed", total, changed);
    Ok(())
}
