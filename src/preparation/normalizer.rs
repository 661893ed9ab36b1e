// src/preparation/normalizer.rs

//! Turns a raw table into a regular, gap-filled demand series.
//!
//! The steps are:
//! 1. Parse the date column; unparsable dates become missing.
//! 2. Drop rows whose date or value is missing.
//! 3. Group rows by exact timestamp and combine values (`sum` or `mean`).
//! 4. Sort by timestamp and infer the sampling frequency.
//! 5. Re-index onto every step between the first and last timestamp,
//!    forward-filling the new points.

use crate::error::{PlanningError, Result};
use crate::model::{Frequency, RawTable, RawValue, TimeSeries};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// How rows sharing a timestamp are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Sum => write!(f, "sum"),
            Aggregation::Mean => write!(f, "mean"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            other => Err(PlanningError::invalid_parameter(
                "aggregation",
                format!("expected 'sum' or 'mean', got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn finish(self, aggregation: Aggregation) -> f64 {
        match aggregation {
            Aggregation::Sum => self.sum,
            Aggregation::Mean => self.sum / self.count as f64,
        }
    }
}

enum CellValue {
    Value(f64),
    Missing,
    NonNumeric,
}

/// Builds a regular time series from `table`.
///
/// Fails with `InvalidColumn` when either column is absent. A table whose
/// rows are all dropped yields an empty series.
pub fn normalize(
    table: &RawTable,
    date_column: &str,
    value_column: &str,
    aggregation: Aggregation,
) -> Result<TimeSeries> {
    let date_idx = table.column_index(date_column)?;
    let value_idx = table.column_index(value_column)?;

    let mut groups: BTreeMap<NaiveDateTime, Accumulator> = BTreeMap::new();
    let mut dropped = 0usize;
    let mut non_numeric = 0usize;

    for row in 0..table.len() {
        let timestamp = parse_timestamp(table.cell(row, date_idx));
        let value = parse_value(table.cell(row, value_idx));
        match (timestamp, value) {
            (Some(ts), CellValue::Value(v)) => groups.entry(ts).or_default().push(v),
            (_, CellValue::NonNumeric) => {
                non_numeric += 1;
                dropped += 1;
            }
            _ => dropped += 1,
        }
    }

    if non_numeric > 0 {
        warn!(
            column = value_column,
            rows = non_numeric,
            "Dropped rows with non-numeric demand values"
        );
    }

    let points: Vec<(NaiveDateTime, f64)> = groups
        .into_iter()
        .map(|(ts, acc)| (ts, acc.finish(aggregation)))
        .collect();
    let timestamps: Vec<NaiveDateTime> = points.iter().map(|(ts, _)| *ts).collect();
    let frequency = Frequency::infer(&timestamps);

    let series = TimeSeries::reindex_forward_fill(&points, frequency)?;
    debug!(
        rows = table.len(),
        dropped,
        distinct_timestamps = points.len(),
        points = series.len(),
        %frequency,
        %aggregation,
        "Normalized demand series"
    );
    Ok(series)
}

/// Interprets a cell as a calendar timestamp. Numbers are not dates.
pub fn parse_timestamp(value: &RawValue) -> Option<NaiveDateTime> {
    match value {
        RawValue::Timestamp(ts) => Some(*ts),
        RawValue::Text(text) => parse_timestamp_text(text.trim()),
        RawValue::Number(_) | RawValue::Missing => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_value(value: &RawValue) -> CellValue {
    match value {
        RawValue::Number(n) if n.is_nan() => CellValue::Missing,
        RawValue::Number(n) => CellValue::Value(*n),
        RawValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return CellValue::Missing;
            }
            match text.parse::<f64>() {
                Ok(v) if v.is_nan() => CellValue::Missing,
                Ok(v) => CellValue::Value(v),
                Err(_) => CellValue::NonNumeric,
            }
        }
        RawValue::Missing => CellValue::Missing,
        RawValue::Timestamp(_) => CellValue::NonNumeric,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn table(rows: &[(RawValue, RawValue)]) -> RawTable {
        let mut table = RawTable::new(["date", "demand"]);
        for (d, v) in rows {
            table.push_row(vec![d.clone(), v.clone()]).unwrap();
        }
        table
    }

    #[test]
    fn test_sum_and_forward_fill() {
        let data = table(&[
            ("2025-01-01".into(), 10.0.into()),
            ("2025-01-02".into(), 12.0.into()),
            ("2025-01-04".into(), 8.0.into()),
            ("2025-01-04".into(), 7.0.into()),
        ]);
        let series = normalize(&data, "date", "demand", Aggregation::Sum).unwrap();

        assert_eq!(series.frequency(), Frequency::days(1));
        assert_eq!(series.len(), 4);
        assert_eq!(series.value_at(day("2025-01-01")), Some(10.0));
        assert_eq!(series.value_at(day("2025-01-02")), Some(12.0));
        assert_eq!(series.value_at(day("2025-01-03")), Some(12.0));
        assert_eq!(series.value_at(day("2025-01-04")), Some(15.0));
    }

    #[test]
    fn test_business_day_rows_keep_weekends_out() {
        let mut rows = Vec::new();
        for week in 0..3 {
            for weekday in 0..5 {
                let date = day("2025-01-06") + chrono::TimeDelta::days(7 * week + weekday);
                rows.push((RawValue::Timestamp(date), RawValue::Number(10.0 + weekday as f64)));
            }
        }
        let series = normalize(&table(&rows), "date", "demand", Aggregation::Sum).unwrap();
        assert_eq!(series.len(), 15);
        assert_eq!(series.frequency(), Frequency::BusinessDay { days: 1 });
        assert_eq!(series.value_at(day("2025-01-11")), None);
        assert_eq!(series.value_at(day("2025-01-13")), Some(10.0));
        assert_eq!(series.last_timestamp(), Some(day("2025-01-24")));
    }

    #[test]
    fn test_mean_aggregation() {
        let data = table(&[
            ("2025-01-01".into(), 4.0.into()),
            ("2025-01-01".into(), 6.0.into()),
            ("2025-01-02".into(), 1.0.into()),
        ]);
        let series = normalize(&data, "date", "demand", Aggregation::Mean).unwrap();
        assert_eq!(series.values(), vec![5.0, 1.0]);
    }

    #[test]
    fn test_unparsable_and_missing_rows_dropped() {
        let data = table(&[
            ("not a date".into(), 99.0.into()),
            ("2025-01-01".into(), RawValue::Missing),
            ("2025-01-02".into(), "3".into()),
            ("2025-01-03".into(), "n/a".into()),
            (RawValue::Number(20250104.0), 5.0.into()),
            ("2025-01-04".into(), 4.0.into()),
            ("2025-01-05".into(), 6.0.into()),
        ]);
        let series = normalize(&data, "date", "demand", Aggregation::Sum).unwrap();
        assert_eq!(series.first_timestamp(), Some(day("2025-01-02")));
        assert_eq!(series.values(), vec![3.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn test_all_rows_dropped_gives_empty_series() {
        let data = table(&[("garbage".into(), 1.0.into())]);
        let series = normalize(&data, "date", "demand", Aggregation::Sum).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_missing_column() {
        let data = table(&[]);
        let err = normalize(&data, "date", "qty", Aggregation::Sum).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidColumn { column } if column == "qty"));
        let err = normalize(&data, "when", "demand", Aggregation::Sum).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidColumn { column } if column == "when"));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let data = table(&[
            ("2025-01-03".into(), 3.0.into()),
            ("2025-01-01".into(), 1.0.into()),
            ("2025-01-02".into(), 2.0.into()),
        ]);
        let series = normalize(&data, "date", "demand", Aggregation::Sum).unwrap();
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_timestamp(&"2025/01/05".into()), Some(day("2025-01-05")));
        assert_eq!(parse_timestamp(&"01/05/2025".into()), Some(day("2025-01-05")));
        assert_eq!(parse_timestamp(&"05.01.2025".into()), Some(day("2025-01-05")));
        assert_eq!(
            parse_timestamp(&"2025-01-05T06:30:00".into()),
            Some(day("2025-01-05") + chrono::TimeDelta::minutes(390))
        );
        assert_eq!(
            parse_timestamp(&"2025-01-05T06:30:00Z".into()),
            Some(day("2025-01-05") + chrono::TimeDelta::minutes(390))
        );
        assert_eq!(parse_timestamp(&RawValue::Number(1.0)), None);
    }

    #[test]
    fn test_aggregation_from_str() {
        assert_eq!("SUM".parse::<Aggregation>().unwrap(), Aggregation::Sum);
        assert_eq!("mean".parse::<Aggregation>().unwrap(), Aggregation::Mean);
        assert!("median".parse::<Aggregation>().is_err());
    }
}
