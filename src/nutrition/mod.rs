//! Nutrition calculation module
//!
//! Body metrics, daily goals, preparation totals, the auto-rate solver and
//! goal fulfillment, plus the product catalog and display formatting.

pub mod auto_rate;
pub mod body_metrics;
pub mod catalog;
pub mod engine;
pub mod form;
pub mod format;
pub mod fulfillment;
pub mod goals;
pub mod preparations;
pub mod totals;

pub use auto_rate::{AutoKind, AutoTarget};
pub use body_metrics::{BodyMetrics, Gender};
pub use catalog::{BuiltinCatalog, NutrientProfile, Product, ProductCatalog, ProteinPreset, Route};
pub use engine::{
    calculate, Calculation, CalculationResult, ComputedRow, EngineError, FluidLimitSource,
    InputCorrections, PatientInput,
};
pub use form::{preparation_rows, FormValue, PatientForm, PreparationForm};
pub use format::{format_num, format_rate, format_signed, CalculationDisplay, RowDisplay};
pub use fulfillment::{Fulfillment, FulfillmentStatus};
pub use goals::{ProteinGoal, RampProgress};
pub use preparations::PreparationRow;
pub use totals::Nutrition;
