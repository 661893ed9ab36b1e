// src/io/reporting.rs

use crate::error::Result;
use crate::inventory::InventoryMetrics;
use crate::model::TimeSeries;
use crate::strategy::ForecastOutput;
use serde::Serialize;
use std::path::Path;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the forecast export. Historical rows carry `observed` and
/// `fitted`; future rows carry `forecast`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    pub timestamp: String,
    pub observed: Option<f64>,
    pub fitted: Option<f64>,
    pub forecast: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub metric: &'static str,
    pub value: f64,
}

/// Joins the history, the in-sample fit and the forecast into export rows.
pub fn forecast_records(history: &TimeSeries, output: &ForecastOutput) -> Vec<ForecastRecord> {
    let fitted = output.fitted.points();
    let past = history.observations().iter().enumerate().map(|(i, o)| ForecastRecord {
        timestamp: o.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        observed: Some(o.value),
        fitted: fitted.get(i).and_then(|p| p.value),
        forecast: None,
    });
    let future = output.forecast.observations().iter().map(|o| ForecastRecord {
        timestamp: o.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        observed: None,
        fitted: None,
        forecast: Some(o.value),
    });
    past.chain(future).collect()
}

/// Writes a demand series as a `date,<value_column>` CSV.
pub fn write_series<P: AsRef<Path>>(path: P, series: &TimeSeries, value_column: &str) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["date", value_column])?;
    for observation in series.observations() {
        wtr.write_record([
            observation.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            observation.value.to_string(),
        ])?;
    }
    wtr.flush()?;

    info!(rows = series.len(), path = %path.display(), "Exported demand series");
    Ok(())
}

/// Writes history, fitted values and forecast to one CSV file.
pub fn write_forecast<P: AsRef<Path>>(
    path: P,
    history: &TimeSeries,
    output: &ForecastOutput,
) -> Result<()> {
    let path = path.as_ref();
    let records = forecast_records(history, output);
    write_records(path, &records)?;

    info!(rows = records.len(), path = %path.display(), "Exported forecast");
    Ok(())
}

/// Writes the labelled, rounded inventory metrics as `metric,value` rows.
pub fn write_metrics<P: AsRef<Path>>(path: P, metrics: &InventoryMetrics) -> Result<()> {
    let path = path.as_ref();
    let records: Vec<MetricRecord> = metrics
        .labeled_rows()
        .into_iter()
        .map(|(metric, value)| MetricRecord { metric, value })
        .collect();
    write_records(path, &records)?;

    info!(rows = records.len(), path = %path.display(), "Exported inventory metrics");
    Ok(())
}

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Frequency;
    use crate::strategy::{forecast, ForecastModel};
    use chrono::NaiveDate;

    fn history() -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let values: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
        TimeSeries::from_values(Frequency::days(1), start, &values).unwrap()
    }

    #[test]
    fn test_forecast_records_cover_history_and_horizon() {
        let history = history();
        let output = forecast(&history, 3, &ForecastModel::default()).unwrap();
        let records = forecast_records(&history, &output);
        assert_eq!(records.len(), 13);
        assert_eq!(records[0].timestamp, "2025-01-01 00:00:00");
        assert_eq!(records[9].observed, Some(19.0));
        assert!(records[9].forecast.is_none());
        assert_eq!(records[10].timestamp, "2025-01-11 00:00:00");
        assert!(records[10].forecast.is_some());
        assert!(records[10].observed.is_none());
    }

    #[test]
    fn test_write_forecast_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let history = history();
        let output = forecast(&history, 3, &ForecastModel::default()).unwrap();
        let forecast_path = dir.path().join("forecast.csv");
        write_forecast(&forecast_path, &history, &output).unwrap();

        let text = std::fs::read_to_string(&forecast_path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("timestamp,observed,fitted,forecast"));
        assert_eq!(text.lines().count(), 14);

        let metrics = InventoryMetrics {
            average_demand: 14.5,
            demand_during_lead: 60.0,
            sigma: 3.03,
            z_score: 1.64,
            safety_stock: 9.97,
            reorder_point: 69.97,
            eoq: None,
        };
        let metrics_path = dir.path().join("metrics.csv");
        write_metrics(&metrics_path, &metrics).unwrap();
        let text = std::fs::read_to_string(&metrics_path).unwrap();
        assert_eq!(text.lines().next(), Some("metric,value"));
        assert_eq!(text.lines().nth(1), Some("Average demand per period,14.5"));
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn test_write_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        write_series(&path, &history(), "demand").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("date,demand"));
        assert_eq!(text.lines().nth(1), Some("2025-01-01 00:00:00,10"));
    }
}
