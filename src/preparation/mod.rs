// src/preparation/mod.rs

pub mod cache;
pub mod normalizer;

pub use cache::SeriesCache;
pub use normalizer::{normalize, Aggregation};
