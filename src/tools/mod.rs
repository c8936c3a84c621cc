//! NutriCalc Tools module
//!
//! MCP tool implementations for the clinical nutrition calculator.

pub mod calculator;
pub mod patient_days;
pub mod patients;
pub mod status;
