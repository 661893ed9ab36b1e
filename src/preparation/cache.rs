// src/preparation/cache.rs

use crate::error::Result;
use crate::model::{RawTable, RawValue, TimeSeries};
use crate::preparation::normalizer::{normalize, Aggregation};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Number of series a cache holds unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 16;

/// Memoizes `normalize` results for repeated runs over the same data.
///
/// Entries are keyed by a SHA-256 digest of the column names, the
/// aggregation mode and the content of the two referenced columns, so an
/// edited table never hits a stale entry. Failed normalizations are not
/// cached. When full, the least recently used entry is evicted.
#[derive(Debug)]
pub struct SeriesCache {
    entries: HashMap<String, TimeSeries>,
    /// Keys from least to most recently used.
    recency: VecDeque<String>,
    capacity: usize,
    hits: usize,
    misses: usize,
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` series (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: VecDeque::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn normalize(
        &mut self,
        table: &RawTable,
        date_column: &str,
        value_column: &str,
        aggregation: Aggregation,
    ) -> Result<TimeSeries> {
        let key = cache_key(table, date_column, value_column, aggregation)?;
        if let Some(series) = self.entries.get(&key) {
            let series = series.clone();
            self.hits += 1;
            self.touch(&key);
            debug!(key = &key[..12], "Series cache hit");
            return Ok(series);
        }

        self.misses += 1;
        let series = normalize(table, date_column, value_column, aggregation)?;
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.recency.pop_front() {
                self.entries.remove(&oldest);
                debug!(key = &oldest[..12], "Series cache eviction");
            }
        }
        self.recency.push_back(key.clone());
        self.entries.insert(key, series.clone());
        Ok(series)
    }

    fn touch(&mut self, key: &str) {
        if let Some(position) = self.recency.iter().position(|k| k == key) {
            if let Some(entry) = self.recency.remove(position) {
                self.recency.push_back(entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Hex digest identifying one normalization request.
///
/// Fails with `InvalidColumn` for absent columns, exactly like `normalize`.
pub fn cache_key(
    table: &RawTable,
    date_column: &str,
    value_column: &str,
    aggregation: Aggregation,
) -> Result<String> {
    let date_idx = table.column_index(date_column)?;
    let value_idx = table.column_index(value_column)?;

    let mut hasher = Sha256::new();
    hash_str(&mut hasher, date_column);
    hash_str(&mut hasher, value_column);
    hash_str(&mut hasher, &aggregation.to_string());
    hasher.update((table.len() as u64).to_le_bytes());
    for row in 0..table.len() {
        hash_cell(&mut hasher, table.cell(row, date_idx));
        hash_cell(&mut hasher, table.cell(row, value_idx));
    }
    Ok(hex::encode(hasher.finalize()))
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn hash_cell(hasher: &mut Sha256, value: &RawValue) {
    match value {
        RawValue::Text(text) => {
            hasher.update([0u8]);
            hash_str(hasher, text);
        }
        RawValue::Number(n) => {
            hasher.update([1u8]);
            hasher.update(n.to_bits().to_le_bytes());
        }
        RawValue::Timestamp(ts) => {
            hasher.update([2u8]);
            let utc = ts.and_utc();
            hasher.update(utc.timestamp().to_le_bytes());
            hasher.update(utc.timestamp_subsec_nanos().to_le_bytes());
        }
        RawValue::Missing => hasher.update([3u8]),
    }
}
