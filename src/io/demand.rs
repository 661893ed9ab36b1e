// src/io/demand.rs

//! Synthetic demand histories for demos and tests.

use crate::error::{PlanningError, Result};
use crate::model::{Frequency, RawTable, RawValue, TimeSeries};
use chrono::NaiveDateTime;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Shape of a generated demand history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "lowercase")]
pub enum DemandPattern {
    /// Every period has the same demand.
    Constant { value: f64 },
    /// Independent draws from a Normal distribution, rounded and clamped at zero.
    Normal { mean: f64, std_dev: f64 },
    /// `before` until period `at`, then `after` for the rest.
    Step { before: f64, after: f64, at: usize },
    /// Evenly spaced values from `from` to `to` inclusive.
    Ramp { from: f64, to: f64 },
}

/// Generates one demand value per period.
///
/// # Arguments
/// * `pattern` - Shape of the history.
/// * `periods` - Number of values to produce.
/// * `rng` - Randomness source; only `Normal` draws from it.
pub fn generate_values<R: Rng + ?Sized>(
    pattern: DemandPattern,
    periods: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let values = match pattern {
        DemandPattern::Constant { value } => vec![value; periods],
        DemandPattern::Normal { mean, std_dev } => {
            let normal = Normal::new(mean, std_dev)
                .map_err(|e| PlanningError::invalid_parameter("std_dev", e.to_string()))?;
            (0..periods)
                .map(|_| normal.sample(rng).round().max(0.0))
                .collect()
        }
        DemandPattern::Step { before, after, at } => (0..periods)
            .map(|p| if p < at { before } else { after })
            .collect(),
        DemandPattern::Ramp { from, to } => {
            let span = periods.saturating_sub(1).max(1) as f64;
            (0..periods)
                .map(|p| from + (to - from) * p as f64 / span)
                .collect()
        }
    };
    Ok(values)
}

/// Generates a daily demand series starting at `start`.
pub fn generate_series<R: Rng + ?Sized>(
    pattern: DemandPattern,
    periods: usize,
    start: NaiveDateTime,
    rng: &mut R,
) -> Result<TimeSeries> {
    let values = generate_values(pattern, periods, rng)?;
    TimeSeries::from_values(Frequency::days(1), start, &values)
}

/// Lays a series out as a two-column raw table, as if read from a file.
pub fn series_to_table(
    series: &TimeSeries,
    date_column: &str,
    value_column: &str,
) -> Result<RawTable> {
    let mut table = RawTable::new([date_column, value_column]);
    for observation in series.observations() {
        table.push_row(vec![
            RawValue::Timestamp(observation.timestamp),
            RawValue::Number(observation.value),
        ])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_step_pattern() {
        let mut rng = StdRng::seed_from_u64(1);
        let values = generate_values(
            DemandPattern::Step {
                before: 4.0,
                after: 8.0,
                at: 4,
            },
            6,
            &mut rng,
        )
        .unwrap();
        assert_eq!(values, vec![4.0, 4.0, 4.0, 4.0, 8.0, 8.0]);
    }

    #[test]
    fn test_ramp_hits_both_ends() {
        let mut rng = StdRng::seed_from_u64(1);
        let values =
            generate_values(DemandPattern::Ramp { from: 50.0, to: 100.0 }, 30, &mut rng).unwrap();
        assert_eq!(values.len(), 30);
        assert_eq!(values[0], 50.0);
        assert_eq!(values[29], 100.0);
    }

    #[test]
    fn test_normal_is_seeded_and_non_negative() {
        let pattern = DemandPattern::Normal {
            mean: 2.0,
            std_dev: 3.0,
        };
        let a = generate_values(pattern, 50, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = generate_values(pattern, 50, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| *v >= 0.0 && v.fract() == 0.0));
    }

    #[test]
    fn test_invalid_std_dev() {
        let pattern = DemandPattern::Normal {
            mean: 2.0,
            std_dev: -1.0,
        };
        let result = generate_values(pattern, 5, &mut StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(PlanningError::InvalidParameter { .. })));
    }

    #[test]
    fn test_series_to_table() {
        let mut rng = StdRng::seed_from_u64(1);
        let series =
            generate_series(DemandPattern::Constant { value: 3.0 }, 4, start(), &mut rng).unwrap();
        let table = series_to_table(&series, "date", "demand").unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.cell(3, 1), &RawValue::Number(3.0));
        assert_eq!(table.cell(0, 0), &RawValue::Timestamp(start()));
    }
}
