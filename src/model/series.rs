// src/model/series.rs

use crate::error::{PlanningError, Result};
use crate::model::frequency::Frequency;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One (timestamp, value) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// A regularly spaced, gap-free series of observations.
///
/// Invariant: timestamps are strictly increasing and each one is exactly one
/// `frequency` step after its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    frequency: Frequency,
    observations: Vec<Observation>,
}

impl TimeSeries {
    pub fn empty(frequency: Frequency) -> Self {
        Self {
            frequency,
            observations: Vec::new(),
        }
    }

    /// Builds a series from observations, checking the spacing invariant.
    pub fn new(frequency: Frequency, observations: Vec<Observation>) -> Result<Self> {
        for (i, pair) in observations.windows(2).enumerate() {
            if frequency.advance(pair[0].timestamp, 1) != Some(pair[1].timestamp) {
                return Err(PlanningError::invalid_parameter(
                    "observations",
                    format!(
                        "observation {} at {} is not one {} step after {}",
                        i + 1,
                        pair[1].timestamp,
                        frequency,
                        pair[0].timestamp
                    ),
                ));
            }
        }
        Ok(Self {
            frequency,
            observations,
        })
    }

    /// Lays `values` out on consecutive steps starting at `start`.
    pub fn from_values(frequency: Frequency, start: NaiveDateTime, values: &[f64]) -> Result<Self> {
        let timestamps = step_index(frequency, start, 0, values.len())?;
        let observations = timestamps
            .into_iter()
            .zip(values)
            .map(|(timestamp, &value)| Observation { timestamp, value })
            .collect();
        Ok(Self {
            frequency,
            observations,
        })
    }

    /// Re-indexes sorted, unique points onto every step from the first to the
    /// last timestamp. Each grid timestamp takes the value of the latest point
    /// at or before it.
    pub fn reindex_forward_fill(points: &[(NaiveDateTime, f64)], frequency: Frequency) -> Result<Self> {
        let (Some(&(first, _)), Some(&(last, _))) = (points.first(), points.last()) else {
            return Ok(Self::empty(frequency));
        };

        let mut observations = Vec::with_capacity(points.len());
        let mut cursor = 0usize;
        let mut current = first;
        loop {
            while cursor + 1 < points.len() && points[cursor + 1].0 <= current {
                cursor += 1;
            }
            observations.push(Observation {
                timestamp: current,
                value: points[cursor].1,
            });
            current = match frequency.advance(current, 1) {
                Some(next) if next <= current => {
                    return Err(PlanningError::invalid_parameter(
                        "frequency",
                        format!("{frequency} does not move forward in time"),
                    ))
                }
                Some(next) if next <= last => next,
                Some(_) => break,
                None => {
                    return Err(PlanningError::invalid_parameter(
                        "frequency",
                        format!("stepping {frequency} past {current} overflows the calendar"),
                    ))
                }
            };
        }

        Ok(Self {
            frequency,
            observations,
        })
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.observations.iter().map(|o| o.timestamp).collect()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.first().map(|o| o.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.last().map(|o| o.timestamp)
    }

    /// Value recorded at exactly `timestamp`, if any.
    pub fn value_at(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.observations
            .binary_search_by(|o| o.timestamp.cmp(&timestamp))
            .ok()
            .map(|i| self.observations[i].value)
    }

    /// The `horizon` timestamps following the last observation.
    pub fn future_index(&self, horizon: usize) -> Result<Vec<NaiveDateTime>> {
        let last = self.last_timestamp().ok_or_else(|| {
            PlanningError::invalid_parameter("series", "cannot extend an empty series")
        })?;
        step_index(self.frequency, last, 1, horizon)
    }
}

fn step_index(
    frequency: Frequency,
    origin: NaiveDateTime,
    offset: usize,
    count: usize,
) -> Result<Vec<NaiveDateTime>> {
    (offset..offset + count)
        .map(|step| {
            u32::try_from(step)
                .ok()
                .and_then(|s| frequency.advance(origin, s))
                .ok_or_else(|| {
                    PlanningError::invalid_parameter(
                        "horizon",
                        format!("step {step} from {origin} overflows the calendar"),
                    )
                })
        })
        .collect()
}

/// A model's in-sample reconstruction, indexed like the history it was fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedPoint {
    pub timestamp: NaiveDateTime,
    /// `None` for warm-up points the model cannot reconstruct.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittedSeries {
    points: Vec<FittedPoint>,
}

impl FittedSeries {
    /// Pairs `values` with the timestamps of `history`. Lengths must match.
    pub(crate) fn aligned_with(history: &TimeSeries, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(history.len(), values.len());
        let points = history
            .observations()
            .iter()
            .zip(values)
            .map(|(o, value)| FittedPoint {
                timestamp: o.timestamp,
                value,
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[FittedPoint] {
        &self.points
    }

    /// Number of points the model produced a value for.
    pub fn defined_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }

    /// Observed minus fitted at each history timestamp; `None` where either
    /// side is undefined.
    pub fn residuals(&self, history: &TimeSeries) -> Vec<(NaiveDateTime, Option<f64>)> {
        self.points
            .iter()
            .map(|p| {
                let residual = p
                    .value
                    .zip(history.value_at(p.timestamp))
                    .map(|(fitted, observed)| observed - fitted);
                (p.timestamp, residual)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn day(s: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_reindex_forward_fill() {
        let points = vec![
            (day("2025-01-01"), 10.0),
            (day("2025-01-02"), 12.0),
            (day("2025-01-04"), 15.0),
        ];
        let series = TimeSeries::reindex_forward_fill(&points, Frequency::days(1)).unwrap();
        assert_eq!(series.values(), vec![10.0, 12.0, 12.0, 15.0]);
        assert_eq!(series.last_timestamp(), Some(day("2025-01-04")));
    }

    #[test]
    fn test_reindex_drops_off_grid_points() {
        // Grid is every 2 days; the 01-02 point is only used as a fill source.
        let points = vec![
            (day("2025-01-01"), 1.0),
            (day("2025-01-02"), 2.0),
            (day("2025-01-03"), 3.0),
        ];
        let series = TimeSeries::reindex_forward_fill(&points, Frequency::days(2)).unwrap();
        assert_eq!(series.values(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_reindex_empty() {
        let series = TimeSeries::reindex_forward_fill(&[], Frequency::days(1)).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_new_rejects_gaps() {
        let observations = vec![
            Observation {
                timestamp: day("2025-01-01"),
                value: 1.0,
            },
            Observation {
                timestamp: day("2025-01-03"),
                value: 2.0,
            },
        ];
        assert!(TimeSeries::new(Frequency::days(1), observations).is_err());
    }

    #[test]
    fn test_future_index() {
        let series =
            TimeSeries::from_values(Frequency::days(7), day("2025-01-05"), &[1.0, 2.0]).unwrap();
        let future = series.future_index(2).unwrap();
        assert_eq!(future, vec![day("2025-01-19"), day("2025-01-26")]);
    }

    #[test]
    fn test_residuals() {
        let history =
            TimeSeries::from_values(Frequency::days(1), day("2025-01-01"), &[5.0, 7.0]).unwrap();
        let fitted = FittedSeries::aligned_with(&history, vec![None, Some(6.0)]);
        let residuals = fitted.residuals(&history);
        assert_eq!(residuals[0].1, None);
        assert_eq!(residuals[1].1, Some(1.0));
        assert_eq!(fitted.defined_count(), 1);
    }
}
