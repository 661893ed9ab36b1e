// src/model/mod.rs

pub mod frequency;
pub mod series;
pub mod table;

pub use frequency::Frequency;
pub use series::{FittedPoint, FittedSeries, Observation, TimeSeries};
pub use table::{RawTable, RawValue};
