// src/strategy/traits.rs

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Estimated parameters and in-sample error of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Human-readable model label, e.g. `ARIMA(1,1,0)`.
    pub model: String,
    /// Named estimates in a stable order.
    pub parameters: Vec<(String, f64)>,
    /// Sum of squared one-step errors over the points the model reconstructs.
    pub sse: f64,
}

/// What a strategy hands back: plain values, no timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFit {
    /// Point forecasts for the requested number of future steps.
    pub forecast: Vec<f64>,
    /// One value per historical observation; `None` for warm-up points.
    pub fitted: Vec<Option<f64>>,
    pub summary: FitSummary,
}

/// Fits a forecasting model to a history and projects it forward.
///
/// Implementations only see the values; indexing the output in time is the
/// caller's job. We require `Send + Sync` so independent datasets can be
/// forecast in parallel.
pub trait ForecastStrategy: Debug + Send + Sync {
    /// Short model family name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Fits the model to `history` and forecasts `horizon` steps.
    ///
    /// # Arguments
    /// * `history` - Regularly spaced observations, oldest first.
    /// * `horizon` - Number of future steps to forecast (at least 1).
    fn fit(&self, history: &[f64], horizon: usize) -> Result<ModelFit>;
}
