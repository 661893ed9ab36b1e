// src/planning/pipeline.rs

use crate::error::Result;
use crate::inventory::{calculate_inventory_metrics, InventoryMetrics};
use crate::model::{RawTable, TimeSeries};
use crate::planning::config::PlanningConfig;
use crate::preparation::SeriesCache;
use crate::strategy::{forecast, ForecastOutput};
use serde::Serialize;
use tracing::info;

/// Everything one planning run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    pub history: TimeSeries,
    pub forecast: ForecastOutput,
    pub metrics: InventoryMetrics,
}

/// Runs normalize -> forecast -> inventory with one configuration.
///
/// Normalized series are memoized, so re-planning the same table with a
/// different model or policy skips the normalization step.
#[derive(Debug)]
pub struct DemandPlanner {
    config: PlanningConfig,
    cache: SeriesCache,
}

impl DemandPlanner {
    /// Validates `config` up front.
    pub fn new(config: PlanningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cache: SeriesCache::new(),
        })
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// Swaps the configuration, keeping cached series.
    pub fn set_config(&mut self, config: PlanningConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    pub fn plan(&mut self, table: &RawTable) -> Result<PlanOutcome> {
        let config = &self.config;
        info!(
            rows = table.len(),
            model = %config.model,
            horizon = config.horizon,
            "Starting planning run"
        );

        let history = self.cache.normalize(
            table,
            &config.date_column,
            &config.value_column,
            config.aggregation,
        )?;
        info!(
            observations = history.len(),
            frequency = %history.frequency(),
            "Series normalized"
        );

        let output = forecast(&history, config.horizon, &config.model)?;
        let metrics = calculate_inventory_metrics(
            &history,
            &output.forecast,
            config.lead_time,
            config.service_level,
            config.ordering_cost,
            config.holding_cost,
        )?;
        info!(
            safety_stock = metrics.safety_stock,
            reorder_point = metrics.reorder_point,
            eoq = ?metrics.eoq,
            "Inventory metrics ready"
        );

        Ok(PlanOutcome {
            history,
            forecast: output,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanningError;
    use crate::io::demand::{generate_series, series_to_table, DemandPattern};
    use crate::strategy::{ArimaParams, ForecastModel};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn demand_table() -> RawTable {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let series = generate_series(
            DemandPattern::Normal { mean: 75.0, std_dev: 8.0 },
            30,
            start,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        series_to_table(&series, "date", "demand").unwrap()
    }

    #[test]
    fn test_plan_runs_all_stages() {
        let config = PlanningConfig {
            horizon: 10,
            lead_time: 2,
            service_level: 0.9,
            ordering_cost: Some(100.0),
            holding_cost: Some(5.0),
            ..PlanningConfig::default()
        };
        let mut planner = DemandPlanner::new(config).unwrap();
        let outcome = planner.plan(&demand_table()).unwrap();
        assert_eq!(outcome.history.len(), 30);
        assert_eq!(outcome.forecast.forecast.len(), 10);
        assert!(outcome.metrics.eoq.unwrap() > 0.0);
    }

    #[test]
    fn test_replanning_reuses_normalized_series() {
        let table = demand_table();
        let mut planner = DemandPlanner::new(PlanningConfig::default()).unwrap();
        planner.plan(&table).unwrap();
        planner
            .set_config(PlanningConfig {
                model: ForecastModel::Arima(ArimaParams::default()),
                ..PlanningConfig::default()
            })
            .unwrap();
        planner.plan(&table).unwrap();
        assert_eq!(planner.cache().hits(), 1);
        assert_eq!(planner.cache().misses(), 1);
    }

    #[test]
    fn test_missing_column_propagates() {
        let config = PlanningConfig {
            value_column: "qty".to_string(),
            ..PlanningConfig::default()
        };
        let mut planner = DemandPlanner::new(config).unwrap();
        let err = planner.plan(&demand_table()).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidColumn { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PlanningConfig {
            service_level: 0.0,
            ..PlanningConfig::default()
        };
        assert!(DemandPlanner::new(config).is_err());
    }
}
