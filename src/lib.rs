// src/lib.rs

//! Demand forecasting and inventory planning.
//!
//! Raw rows are normalized into a regular series ([`preparation`]), a
//! forecasting model projects it forward ([`strategy`]), and the inventory
//! calculator turns history and forecast into safety stock, reorder point and
//! EOQ ([`inventory`]). [`planning::DemandPlanner`] runs the three stages in
//! order.

pub mod error;
pub mod inventory;
pub mod io;
pub mod logging;
pub mod model;
pub mod planning;
pub mod preparation;
pub mod strategy;

pub use error::{PlanningError, Result};
pub use inventory::{calculate_inventory_metrics, InventoryMetrics};
pub use model::{Frequency, RawTable, RawValue, TimeSeries};
pub use planning::{DemandPlanner, PlanOutcome, PlanningConfig};
pub use preparation::{normalize, Aggregation};
pub use strategy::{forecast, ForecastModel, ForecastOutput};
