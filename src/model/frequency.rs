// src/model/frequency.rs

//! Sampling frequency of a time series, inferred from the timestamps
//! themselves rather than imposed by the caller.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_DAY: i64 = 86_400;

/// Step between consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// A fixed elapsed duration (1 day, 7 days, 1 hour, ...).
    Fixed { seconds: i64 },
    /// Midnight on the first day of every `months`-th month.
    MonthStart { months: u32 },
    /// Midnight on the last day of every `months`-th month.
    MonthEnd { months: u32 },
    /// Every `days`-th weekday, skipping Saturdays and Sundays.
    BusinessDay { days: u32 },
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::days(1)
    }
}

impl Frequency {
    pub fn days(days: i64) -> Self {
        Frequency::Fixed {
            seconds: days * SECONDS_PER_DAY,
        }
    }

    pub fn is_daily(&self) -> bool {
        *self == Frequency::days(1)
    }

    /// Moves `timestamp` forward by `steps` periods. `None` on calendar overflow.
    pub fn advance(&self, timestamp: NaiveDateTime, steps: u32) -> Option<NaiveDateTime> {
        match *self {
            Frequency::Fixed { seconds } => {
                let delta = TimeDelta::try_seconds(seconds.checked_mul(i64::from(steps))?)?;
                timestamp.checked_add_signed(delta)
            }
            Frequency::MonthStart { months } => {
                let first = month_start(timestamp.date())?;
                let target = first.checked_add_months(Months::new(months.checked_mul(steps)?))?;
                Some(target.and_time(NaiveTime::MIN))
            }
            Frequency::MonthEnd { months } => {
                let first = month_start(timestamp.date())?;
                let target = first.checked_add_months(Months::new(months.checked_mul(steps)?))?;
                Some(last_day_of_month(target)?.and_time(NaiveTime::MIN))
            }
            Frequency::BusinessDay { days } => {
                let offset = i64::from(days.checked_mul(steps)?);
                let target = business_day_from_ordinal(business_day_ordinal(timestamp.date()) + offset)?;
                Some(target.and_time(timestamp.time()))
            }
        }
    }

    /// Infers the frequency of sorted, unique timestamps.
    ///
    /// A regular calendar frequency (uniform step, business days, month
    /// starts, month ends) needs at least three points. Otherwise the most common whole-day gap is
    /// used, defaulting to one day.
    pub fn infer(timestamps: &[NaiveDateTime]) -> Frequency {
        detect_calendar_frequency(timestamps).unwrap_or_else(|| Frequency::days(mode_day_step(timestamps)))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let with_count = |f: &mut fmt::Formatter<'_>, n: i64, unit: &str| {
            if n == 1 {
                write!(f, "{unit}")
            } else {
                write!(f, "{n}{unit}")
            }
        };
        match *self {
            Frequency::Fixed { seconds } if seconds % SECONDS_PER_DAY == 0 => {
                with_count(f, seconds / SECONDS_PER_DAY, "D")
            }
            Frequency::Fixed { seconds } if seconds % 3600 == 0 => with_count(f, seconds / 3600, "h"),
            Frequency::Fixed { seconds } if seconds % 60 == 0 => with_count(f, seconds / 60, "min"),
            Frequency::Fixed { seconds } => with_count(f, seconds, "s"),
            Frequency::MonthStart { months } => with_count(f, i64::from(months), "MS"),
            Frequency::MonthEnd { months } => with_count(f, i64::from(months), "ME"),
            Frequency::BusinessDay { days } => with_count(f, i64::from(days), "B"),
        }
    }
}

fn month_start(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date)?.checked_add_months(Months::new(1))?.pred_opt()
}

fn month_ordinal(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Weekdays counted from Monday 0001-01-01. Weekends map to the Friday before.
fn business_day_ordinal(date: NaiveDate) -> i64 {
    let since_epoch = i64::from(date.num_days_from_ce()) - 1;
    let weeks = since_epoch.div_euclid(7);
    let weekday = since_epoch.rem_euclid(7).min(4);
    weeks * 5 + weekday
}

fn business_day_from_ordinal(ordinal: i64) -> Option<NaiveDate> {
    let days = ordinal.div_euclid(5) * 7 + ordinal.rem_euclid(5) + 1;
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(days).ok()?)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekday-only timestamps at one time of day, a uniform number of
/// business days apart.
fn uniform_business_day_gap(timestamps: &[NaiveDateTime]) -> Option<u32> {
    let time = timestamps[0].time();
    if timestamps
        .iter()
        .any(|ts| ts.time() != time || is_weekend(ts.date()))
    {
        return None;
    }
    let ordinals: Vec<i64> = timestamps
        .iter()
        .map(|ts| business_day_ordinal(ts.date()))
        .collect();
    let gap = ordinals[1] - ordinals[0];
    if gap <= 0 || !ordinals.windows(2).all(|w| w[1] - w[0] == gap) {
        return None;
    }
    u32::try_from(gap).ok()
}

fn detect_calendar_frequency(timestamps: &[NaiveDateTime]) -> Option<Frequency> {
    if timestamps.len() < 3 {
        return None;
    }

    let first_gap = (timestamps[1] - timestamps[0]).num_seconds();
    if first_gap > 0
        && timestamps
            .windows(2)
            .all(|w| (w[1] - w[0]).num_seconds() == first_gap)
    {
        return Some(Frequency::Fixed { seconds: first_gap });
    }

    if let Some(days) = uniform_business_day_gap(timestamps) {
        return Some(Frequency::BusinessDay { days });
    }

    if timestamps.iter().any(|ts| ts.time() != NaiveTime::MIN) {
        return None;
    }

    let months = uniform_month_gap(timestamps)?;
    if timestamps.iter().all(|ts| ts.day() == 1) {
        return Some(Frequency::MonthStart { months });
    }
    if timestamps
        .iter()
        .all(|ts| last_day_of_month(ts.date()) == Some(ts.date()))
    {
        return Some(Frequency::MonthEnd { months });
    }
    None
}

fn uniform_month_gap(timestamps: &[NaiveDateTime]) -> Option<u32> {
    let gap = month_ordinal(timestamps[1].date()) - month_ordinal(timestamps[0].date());
    if gap <= 0 {
        return None;
    }
    let uniform = timestamps
        .windows(2)
        .all(|w| month_ordinal(w[1].date()) - month_ordinal(w[0].date()) == gap);
    if uniform {
        u32::try_from(gap).ok()
    } else {
        None
    }
}

/// Most common gap in whole days between consecutive timestamps.
/// Ties go to the smaller gap; fewer than two points or a sub-day mode give 1.
fn mode_day_step(timestamps: &[NaiveDateTime]) -> i64 {
    if timestamps.len() < 2 {
        return 1;
    }

    let mut diffs: Vec<i64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .collect();
    diffs.sort_unstable();

    let mut best_val = diffs[0];
    let mut best_count = 0usize;
    let mut current_val = diffs[0];
    let mut current_count = 0usize;

    for &d in &diffs {
        if d == current_val {
            current_count += 1;
        } else {
            if current_count > best_count {
                best_count = current_count;
                best_val = current_val;
            }
            current_val = d;
            current_count = 1;
        }
    }
    if current_count > best_count {
        best_val = current_val;
    }

    if best_val < 1 {
        1
    } else {
        best_val
    }
}
