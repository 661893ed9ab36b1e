// src/planning/config.rs

use crate::error::{PlanningError, Result};
use crate::preparation::Aggregation;
use crate::strategy::ForecastModel;
use serde::{Deserialize, Serialize};

/// Every caller-facing knob of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    pub date_column: String,
    pub value_column: String,
    pub aggregation: Aggregation,
    pub model: ForecastModel,
    /// Number of periods to forecast.
    pub horizon: usize,
    /// Replenishment lead time in periods.
    pub lead_time: usize,
    pub service_level: f64,
    pub ordering_cost: Option<f64>,
    pub holding_cost: Option<f64>,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            date_column: "date".to_string(),
            value_column: "demand".to_string(),
            aggregation: Aggregation::Sum,
            model: ForecastModel::default(),
            horizon: 30,
            lead_time: 7,
            service_level: 0.95,
            ordering_cost: None,
            holding_cost: None,
        }
    }
}

impl PlanningConfig {
    /// Checks ranges before any data is touched.
    pub fn validate(&self) -> Result<()> {
        if self.date_column.is_empty() {
            return Err(PlanningError::invalid_parameter("date_column", "must not be empty"));
        }
        if self.value_column.is_empty() {
            return Err(PlanningError::invalid_parameter("value_column", "must not be empty"));
        }
        if self.horizon == 0 {
            return Err(PlanningError::invalid_parameter("horizon", "must be at least 1 period"));
        }
        if self.lead_time == 0 {
            return Err(PlanningError::invalid_parameter("lead_time", "must be at least 1 period"));
        }
        if self.lead_time > self.horizon {
            return Err(PlanningError::InsufficientForecastHorizon {
                lead_time: self.lead_time,
                available: self.horizon,
            });
        }
        if !(self.service_level > 0.0 && self.service_level < 1.0) {
            return Err(PlanningError::invalid_parameter(
                "service_level",
                format!("must be strictly between 0 and 1, got {}", self.service_level),
            ));
        }
        for (name, cost) in [
            ("ordering_cost", self.ordering_cost),
            ("holding_cost", self.holding_cost),
        ] {
            if let Some(value) = cost.filter(|v| !v.is_finite()) {
                return Err(PlanningError::invalid_parameter(
                    name,
                    format!("must be a finite number, got {value}"),
                ));
            }
        }
        Ok(())
    }
}
