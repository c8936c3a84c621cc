//! Data models
//!
//! Rust structs representing database entities.

mod patient;
mod patient_day;
mod preparation;

pub use patient::{Patient, PatientCreate, PatientSummary};
pub use patient_day::{
    DayCalculations, DayHistoryEntry, PatientDay, PatientDayDetail, PatientDaySave, SaveOutcome,
};
pub use preparation::{to_engine_rows, Preparation};
