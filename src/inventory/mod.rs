// src/inventory/mod.rs

pub mod metrics;

pub use metrics::{calculate_inventory_metrics, InventoryMetrics, DAYS_PER_YEAR};
