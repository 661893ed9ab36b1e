// src/inventory/metrics.rs

use crate::error::{PlanningError, Result};
use crate::model::TimeSeries;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, warn};

/// Annualization factor for the EOQ demand rate. Assumes one period per day.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Safety stock, reorder point and optional EOQ for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InventoryMetrics {
    /// Mean historical demand per period.
    pub average_demand: f64,
    /// Forecast demand summed over the lead time.
    pub demand_during_lead: f64,
    /// Sample standard deviation of historical demand.
    pub sigma: f64,
    /// Standard normal quantile of the service level.
    pub z_score: f64,
    pub safety_stock: f64,
    pub reorder_point: f64,
    /// Present only when both costs are positive and demand is positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eoq: Option<f64>,
}

impl InventoryMetrics {
    /// Metrics as ordered `(key, value)` pairs; `eoq` only when present.
    pub fn to_map(&self) -> Vec<(&'static str, f64)> {
        let mut entries = vec![
            ("average_demand", self.average_demand),
            ("demand_during_lead", self.demand_during_lead),
            ("sigma", self.sigma),
            ("z_score", self.z_score),
            ("safety_stock", self.safety_stock),
            ("reorder_point", self.reorder_point),
        ];
        if let Some(eoq) = self.eoq {
            entries.push(("eoq", eoq));
        }
        entries
    }

    /// Display rows with human labels, rounded to two decimals.
    ///
    /// Non-finite values are skipped.
    pub fn labeled_rows(&self) -> Vec<(&'static str, f64)> {
        self.to_map()
            .into_iter()
            .filter(|(_, value)| value.is_finite())
            .map(|(key, value)| (label(key), (value * 100.0).round() / 100.0))
            .collect()
    }
}

fn label(key: &str) -> &'static str {
    match key {
        "average_demand" => "Average demand per period",
        "demand_during_lead" => "Expected demand during lead time",
        "sigma" => "Standard deviation of demand",
        "z_score" => "Z-score",
        "safety_stock" => "Safety stock",
        "reorder_point" => "Reorder point",
        "eoq" => "Economic Order Quantity",
        _ => "Unknown metric",
    }
}

/// Derives inventory-control parameters from a demand history and its forecast.
///
/// # Arguments
/// * `history` - Normalized demand history (at least two observations).
/// * `forecast` - Forecast following the history; must cover `lead_time`.
/// * `lead_time` - Replenishment lead time in periods (at least 1).
/// * `service_level` - Target probability of no stockout, strictly in (0, 1).
/// * `ordering_cost` / `holding_cost` - Optional per-order and per-unit-year
///   costs. Both must be positive for `eoq` to be computed.
pub fn calculate_inventory_metrics(
    history: &TimeSeries,
    forecast: &TimeSeries,
    lead_time: usize,
    service_level: f64,
    ordering_cost: Option<f64>,
    holding_cost: Option<f64>,
) -> Result<InventoryMetrics> {
    if lead_time == 0 {
        return Err(PlanningError::invalid_parameter(
            "lead_time",
            "must be at least 1 period",
        ));
    }
    if !(service_level > 0.0 && service_level < 1.0) {
        return Err(PlanningError::invalid_parameter(
            "service_level",
            format!("must be strictly between 0 and 1, got {service_level}"),
        ));
    }
    if history.len() < 2 {
        return Err(PlanningError::invalid_parameter(
            "history",
            format!(
                "at least 2 observations are needed for a standard deviation, got {}",
                history.len()
            ),
        ));
    }
    check_cost("ordering_cost", ordering_cost)?;
    check_cost("holding_cost", holding_cost)?;
    if lead_time > forecast.len() {
        return Err(PlanningError::InsufficientForecastHorizon {
            lead_time,
            available: forecast.len(),
        });
    }

    let demand = history.values();
    let average_demand = demand.iter().sum::<f64>() / demand.len() as f64;
    let sigma = sample_std_dev(&demand, average_demand);
    let demand_during_lead: f64 = forecast.observations()[..lead_time]
        .iter()
        .map(|o| o.value)
        .sum();

    let standard_normal = Normal::new(0.0, 1.0)
        .map_err(|e| PlanningError::invalid_parameter("service_level", e.to_string()))?;
    let z_score = standard_normal.inverse_cdf(service_level);
    let safety_stock = z_score * sigma * (lead_time as f64).sqrt();
    let reorder_point = demand_during_lead + safety_stock;

    let eoq = match (ordering_cost, holding_cost) {
        (Some(ordering), Some(holding)) if ordering > 0.0 && holding > 0.0 && average_demand > 0.0 => {
            if !history.frequency().is_daily() {
                warn!(
                    frequency = %history.frequency(),
                    "EOQ annualizes demand as {} periods per year; history is not daily",
                    DAYS_PER_YEAR
                );
            }
            let annual_demand = average_demand * DAYS_PER_YEAR;
            Some((2.0 * annual_demand * ordering / holding).sqrt())
        }
        _ => None,
    };

    debug!(
        average_demand,
        sigma,
        z_score,
        safety_stock,
        reorder_point,
        eoq = ?eoq,
        "Inventory metrics calculated"
    );

    Ok(InventoryMetrics {
        average_demand,
        demand_during_lead,
        sigma,
        z_score,
        safety_stock,
        reorder_point,
        eoq,
    })
}

/// Two-pass sample standard deviation (N - 1). Exactly zero for constant data.
fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (squares / (values.len() - 1) as f64).sqrt()
}

fn check_cost(name: &'static str, cost: Option<f64>) -> Result<()> {
    match cost {
        Some(value) if !value.is_finite() => Err(PlanningError::invalid_parameter(
            name,
            format!("must be a finite number, got {value}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Frequency;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn daily(values: &[f64]) -> TimeSeries {
        TimeSeries::from_values(Frequency::days(1), day(1), values).unwrap()
    }

    fn following(history: &TimeSeries, values: &[f64]) -> TimeSeries {
        let start = history.future_index(1).unwrap()[0];
        TimeSeries::from_values(history.frequency(), start, values).unwrap()
    }

    fn ramp() -> TimeSeries {
        let values: Vec<f64> = (0..30).map(|i| 50.0 + 50.0 * i as f64 / 29.0).collect();
        daily(&values)
    }

    #[test]
    fn test_constant_demand_has_no_safety_stock() {
        let history = daily(&[10.0; 30]);
        let forecast = following(&history, &[10.0; 7]);
        let metrics = calculate_inventory_metrics(&history, &forecast, 3, 0.95, None, None).unwrap();
        assert_eq!(metrics.average_demand, 10.0);
        assert_relative_eq!(metrics.demand_during_lead, 30.0);
        assert_eq!(metrics.sigma, 0.0);
        assert_eq!(metrics.safety_stock, 0.0);
        assert_eq!(metrics.reorder_point, metrics.demand_during_lead);
        assert_eq!(metrics.eoq, None);
    }

    #[test]
    fn test_average_is_plain_sum_over_count() {
        let history = daily(&[20.2, 6.2, 93.6, 43.3, 19.4]);
        let forecast = following(&history, &[30.0; 3]);
        let metrics = calculate_inventory_metrics(&history, &forecast, 2, 0.9, None, None).unwrap();
        assert_eq!(metrics.average_demand, 36.540000000000006);
        let squares: f64 = [20.2, 6.2, 93.6, 43.3, 19.4]
            .iter()
            .map(|v| (v - 36.540000000000006f64).powi(2))
            .sum();
        assert_eq!(metrics.sigma, (squares / 4.0).sqrt());
    }

    #[test]
    fn test_safety_stock_formula() {
        let history = daily(&[8.0, 12.0, 10.0, 14.0, 6.0]);
        let forecast = following(&history, &[10.0, 11.0, 12.0, 13.0]);
        let metrics = calculate_inventory_metrics(&history, &forecast, 4, 0.95, None, None).unwrap();
        // Sample variance: (4 + 4 + 0 + 16 + 16) / 4 = 10
        assert_relative_eq!(metrics.sigma, 10f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(metrics.z_score, 1.6448536269514722, epsilon = 1e-6);
        assert_relative_eq!(
            metrics.safety_stock,
            metrics.z_score * 10f64.sqrt() * 2.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(metrics.reorder_point, 46.0 + metrics.safety_stock, epsilon = 1e-9);
    }

    #[test]
    fn test_eoq_on_rising_demand() {
        let history = ramp();
        let forecast = following(&history, &[75.0; 5]);
        let metrics =
            calculate_inventory_metrics(&history, &forecast, 2, 0.9, Some(100.0), Some(5.0)).unwrap();
        let eoq = metrics.eoq.unwrap();
        assert!(eoq > 0.0);
        assert_relative_eq!(eoq, (2.0 * 75.0 * 365.0 * 100.0 / 5.0f64).sqrt(), epsilon = 1e-6);
        assert_relative_eq!(metrics.demand_during_lead, 150.0);
    }

    #[test]
    fn test_non_positive_or_missing_cost_suppresses_eoq() {
        let history = ramp();
        let forecast = following(&history, &[75.0; 5]);
        for (ordering, holding) in [
            (None, Some(5.0)),
            (Some(100.0), None),
            (Some(0.0), Some(5.0)),
            (Some(100.0), Some(-1.0)),
        ] {
            let metrics =
                calculate_inventory_metrics(&history, &forecast, 2, 0.9, ordering, holding).unwrap();
            assert_eq!(metrics.eoq, None);
            assert!(metrics.to_map().iter().all(|(key, _)| *key != "eoq"));
        }
    }

    #[test]
    fn test_identical_inputs_give_identical_outputs() {
        let history = ramp();
        let forecast = following(&history, &[75.0; 5]);
        let a = calculate_inventory_metrics(&history, &forecast, 3, 0.9, Some(10.0), Some(2.0)).unwrap();
        let b = calculate_inventory_metrics(&history, &forecast, 3, 0.9, Some(10.0), Some(2.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_inputs() {
        let history = ramp();
        let forecast = following(&history, &[75.0; 5]);
        let cases = [
            calculate_inventory_metrics(&history, &forecast, 0, 0.9, None, None),
            calculate_inventory_metrics(&history, &forecast, 2, 1.0, None, None),
            calculate_inventory_metrics(&history, &forecast, 2, 0.0, None, None),
            calculate_inventory_metrics(&history, &forecast, 2, f64::NAN, None, None),
            calculate_inventory_metrics(&history, &forecast, 2, 0.9, Some(f64::INFINITY), Some(1.0)),
            calculate_inventory_metrics(&daily(&[5.0]), &forecast, 2, 0.9, None, None),
        ];
        for result in cases {
            assert!(matches!(result, Err(PlanningError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn test_lead_time_beyond_forecast() {
        let history = ramp();
        let forecast = following(&history, &[75.0; 5]);
        let err = calculate_inventory_metrics(&history, &forecast, 6, 0.9, None, None).unwrap_err();
        assert!(matches!(
            err,
            PlanningError::InsufficientForecastHorizon {
                lead_time: 6,
                available: 5
            }
        ));
    }

    #[test]
    fn test_serialization_omits_absent_eoq() {
        let history = daily(&[10.0; 5]);
        let forecast = following(&history, &[10.0; 2]);
        let metrics = calculate_inventory_metrics(&history, &forecast, 1, 0.5, None, None).unwrap();
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(metrics).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = text.lines().next().unwrap();
        assert!(!header.contains("eoq"));
        assert!(header.starts_with("average_demand,"));
    }

    #[test]
    fn test_labeled_rows_are_rounded() {
        let metrics = InventoryMetrics {
            average_demand: 10.126,
            demand_during_lead: 30.0,
            sigma: f64::NAN,
            z_score: 1.6448,
            safety_stock: 0.0,
            reorder_point: 30.0,
            eoq: Some(12.346),
        };
        let rows = metrics.labeled_rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], ("Average demand per period", 10.13));
        assert_eq!(rows[2], ("Z-score", 1.64));
        assert_eq!(rows[5], ("Economic Order Quantity", 12.35));
    }
}
