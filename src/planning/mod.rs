// src/planning/mod.rs

pub mod config;
pub mod pipeline;

pub use config::PlanningConfig;
pub use pipeline::{DemandPlanner, PlanOutcome};
