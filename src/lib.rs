//! Clinical Nutrition Calculator (NutriCalc) Library
//!
//! Nutrition goal calculation for hospitalized patients, and the patient-day
//! store and MCP tools around it.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
