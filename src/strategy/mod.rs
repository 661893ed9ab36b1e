// src/strategy/mod.rs

pub mod arima;
pub mod optimization;
pub mod smoothing;
pub mod traits;

pub use arima::{ArimaOrder, ArimaParams};
pub use smoothing::ExponentialSmoothingParams;
pub use traits::{FitSummary, ForecastStrategy, ModelFit};

use crate::error::{PlanningError, Result};
use crate::model::{FittedSeries, TimeSeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// The closed set of forecasting models a plan can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ForecastModel {
    ExponentialSmoothing(ExponentialSmoothingParams),
    Arima(ArimaParams),
}

impl Default for ForecastModel {
    fn default() -> Self {
        ForecastModel::ExponentialSmoothing(ExponentialSmoothingParams::default())
    }
}

impl ForecastModel {
    pub fn strategy(&self) -> &dyn ForecastStrategy {
        match self {
            ForecastModel::ExponentialSmoothing(params) => params,
            ForecastModel::Arima(params) => params,
        }
    }
}

impl fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastModel::ExponentialSmoothing(_) => write!(f, "exponential-smoothing"),
            ForecastModel::Arima(_) => write!(f, "arima"),
        }
    }
}

/// Forecast and in-sample fit, both indexed in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastOutput {
    /// `horizon` points starting one step after the last historical timestamp.
    pub forecast: TimeSeries,
    /// One point per historical timestamp.
    pub fitted: FittedSeries,
    pub summary: FitSummary,
}

/// Fits `model` to `series` and forecasts `horizon` steps ahead.
///
/// Fails with `InvalidParameter` for a zero horizon and with `ModelFit` when
/// the model cannot be estimated or produces non-finite output.
pub fn forecast(series: &TimeSeries, horizon: usize, model: &ForecastModel) -> Result<ForecastOutput> {
    if horizon == 0 {
        return Err(PlanningError::invalid_parameter(
            "horizon",
            "must be at least 1 period",
        ));
    }

    let strategy = model.strategy();
    let history = series.values();
    let fit = strategy.fit(&history, horizon)?;

    if fit.forecast.len() != horizon || fit.fitted.len() != history.len() {
        return Err(PlanningError::model_fit(
            strategy.name(),
            format!(
                "produced {} forecast and {} fitted values for horizon {} and {} observations",
                fit.forecast.len(),
                fit.fitted.len(),
                horizon,
                history.len()
            ),
        ));
    }
    let non_finite = fit.forecast.iter().any(|v| !v.is_finite())
        || fit.fitted.iter().flatten().any(|v| !v.is_finite());
    if non_finite {
        return Err(PlanningError::model_fit(
            strategy.name(),
            "produced non-finite values",
        ));
    }

    let index = series.future_index(horizon)?;
    let start = index[0];
    let forecast = TimeSeries::from_values(series.frequency(), start, &fit.forecast)?;
    let fitted = FittedSeries::aligned_with(series, fit.fitted);

    debug!(
        model = %fit.summary.model,
        parameters = ?fit.summary.parameters,
        "Estimated model parameters"
    );
    info!(
        model = %fit.summary.model,
        observations = history.len(),
        horizon,
        sse = fit.summary.sse,
        "Forecast fitted"
    );

    Ok(ForecastOutput {
        forecast,
        fitted,
        summary: fit.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Frequency;
    use chrono::{NaiveDate, NaiveDateTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn weekly_trend() -> TimeSeries {
        let values: Vec<f64> = (0..20).map(|i| i as f64 + 0.3 * ((i * 7) % 5) as f64).collect();
        TimeSeries::from_values(Frequency::days(7), start(), &values).unwrap()
    }

    #[test]
    fn test_smoothing_forecast_is_indexed_after_history() {
        let series = weekly_trend();
        let output = forecast(&series, 4, &ForecastModel::default()).unwrap();
        assert_eq!(output.forecast.len(), 4);
        assert_eq!(output.fitted.len(), series.len());
        let expected_start = Frequency::days(7)
            .advance(series.last_timestamp().unwrap(), 1)
            .unwrap();
        assert_eq!(output.forecast.first_timestamp(), Some(expected_start));
        assert_eq!(output.forecast.frequency(), Frequency::days(7));
    }

    #[test]
    fn test_arima_forecast_is_indexed_after_history() {
        let series = weekly_trend();
        let model = ForecastModel::Arima(ArimaParams::default());
        let output = forecast(&series, 6, &model).unwrap();
        assert_eq!(output.forecast.len(), 6);
        assert_eq!(output.fitted.defined_count(), series.len() - 2);
        assert_eq!(output.summary.model, "ARIMA(1,1,0)");
    }

    #[test]
    fn test_monthly_history_forecasts_month_starts() {
        let values = [5.0, 6.5, 6.8, 8.1, 9.4, 9.9, 11.2, 12.4, 12.9, 14.3, 15.1, 16.0];
        let series =
            TimeSeries::from_values(Frequency::MonthStart { months: 1 }, start(), &values).unwrap();
        let output = forecast(&series, 2, &ForecastModel::default()).unwrap();
        let expected = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(output.forecast.first_timestamp(), Some(expected));
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let err = forecast(&weekly_trend(), 0, &ForecastModel::default()).unwrap_err();
        assert!(matches!(
            err,
            PlanningError::InvalidParameter { name: "horizon", .. }
        ));
    }

    #[test]
    fn test_empty_series_is_a_fit_error() {
        let series = TimeSeries::empty(Frequency::days(1));
        let err = forecast(&series, 3, &ForecastModel::default()).unwrap_err();
        assert!(matches!(err, PlanningError::ModelFit { .. }));
    }

    #[test]
    fn test_model_labels() {
        assert_eq!(ForecastModel::default().to_string(), "exponential-smoothing");
        assert_eq!(
            ForecastModel::Arima(ArimaParams::default()).to_string(),
            "arima"
        );
    }
}
