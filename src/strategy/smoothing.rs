// src/strategy/smoothing.rs

use crate::error::{PlanningError, Result};
use crate::strategy::traits::{FitSummary, ForecastStrategy, ModelFit};
use augurs_core::{Fit, Predict};
use augurs_ets::AutoETS;
use serde::{Deserialize, Serialize};

const MODEL: &str = "exponential smoothing";

/// Non-seasonal fits need a first trend estimate plus one update.
const MIN_NON_SEASONAL_POINTS: usize = 3;

/// Point forecasts only.
const NO_INTERVALS: Option<f64> = None;

/// Additive-trend exponential smoothing (Holt), optionally with additive
/// seasonality (Holt-Winters).
///
/// The smoothing weights are not supplied by the caller; `augurs-ets`
/// estimates them together with the initial states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentialSmoothingParams {
    /// Season length in periods. `None` or `Some(0)` disables seasonality.
    pub seasonal_periods: Option<usize>,
}

impl ExponentialSmoothingParams {
    pub fn non_seasonal() -> Self {
        Self {
            seasonal_periods: None,
        }
    }

    pub fn seasonal(periods: usize) -> Self {
        Self {
            seasonal_periods: Some(periods),
        }
    }

    /// The effective season length, if seasonality is enabled.
    pub fn period(&self) -> Option<usize> {
        self.seasonal_periods.filter(|&p| p > 0)
    }

    fn label(&self) -> String {
        match self.period() {
            Some(m) => format!("Holt-Winters additive (period {m})"),
            None => "Holt additive trend".to_string(),
        }
    }

    /// Additive error and trend, undamped; additive season when periodic.
    fn model(&self) -> Result<AutoETS> {
        let (season_length, components) = match self.period() {
            Some(m) => (m, "AAA"),
            None => (1, "AAN"),
        };
        let model = AutoETS::new(season_length, components)
            .map_err(|e| PlanningError::model_fit(MODEL, e.to_string()))?;
        model
            .damped(false)
            .map_err(|e| PlanningError::model_fit(MODEL, e.to_string()))
    }
}

fn sum_of_squares(history: &[f64], fitted: &[f64]) -> f64 {
    history
        .iter()
        .zip(fitted)
        .map(|(y, f)| (y - f).powi(2))
        .sum()
}

impl ForecastStrategy for ExponentialSmoothingParams {
    fn name(&self) -> &'static str {
        MODEL
    }

    fn fit(&self, history: &[f64], horizon: usize) -> Result<ModelFit> {
        let period = match self.seasonal_periods {
            Some(1) => {
                return Err(PlanningError::invalid_parameter(
                    "seasonal_periods",
                    "a season must span at least 2 periods",
                ))
            }
            _ => self.period(),
        };

        let required = period.map_or(MIN_NON_SEASONAL_POINTS, |m| 2 * m);
        if history.len() < required {
            return Err(PlanningError::model_fit(
                MODEL,
                format!(
                    "need at least {required} observations, got {}",
                    history.len()
                ),
            ));
        }
        if history.iter().any(|v| !v.is_finite()) {
            return Err(PlanningError::model_fit(MODEL, "history contains non-finite values"));
        }

        // A flat history has no error variance to estimate weights from.
        let first = history[0];
        if history.iter().all(|v| *v == first) {
            return Ok(ModelFit {
                forecast: vec![first; horizon],
                fitted: vec![Some(first); history.len()],
                summary: FitSummary {
                    model: self.label(),
                    parameters: vec![("sigma".to_string(), 0.0)],
                    sse: 0.0,
                },
            });
        }

        let fitted_model = self
            .model()?
            .fit(history)
            .map_err(|e| PlanningError::model_fit(MODEL, e.to_string()))?;
        let forecast = fitted_model
            .predict(horizon, NO_INTERVALS)
            .map_err(|e| PlanningError::model_fit(MODEL, e.to_string()))?
            .point;
        let fitted = fitted_model
            .predict_in_sample(NO_INTERVALS)
            .map_err(|e| PlanningError::model_fit(MODEL, e.to_string()))?
            .point;

        let sse = sum_of_squares(history, &fitted);
        let sigma = (sse / history.len() as f64).sqrt();

        Ok(ModelFit {
            forecast,
            fitted: fitted.into_iter().map(Some).collect(),
            summary: FitSummary {
                model: self.label(),
                parameters: vec![("sigma".to_string(), sigma)],
                sse,
            },
        })
    }
}
