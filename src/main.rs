// src/main.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use demand_planner::io::demand::{generate_series, DemandPattern};
use demand_planner::io::{read_table, reporting};
use demand_planner::logging::{init_logging, LogConfig, LogFormat};
use demand_planner::strategy::{ArimaOrder, ArimaParams, ExponentialSmoothingParams};
use demand_planner::{Aggregation, DemandPlanner, ForecastModel, PlanOutcome, PlanningConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "demand-planner",
    version,
    about = "Forecast demand and derive safety stock, reorder point and EOQ"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (-q warn, -qq error, -qqq off).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatArg,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize a demand CSV, forecast it and compute inventory metrics.
    Plan(PlanArgs),
    /// Write a synthetic daily demand history to CSV.
    Sample(SampleArgs),
}

#[derive(Args)]
struct PlanArgs {
    /// Input CSV or spreadsheet (.xlsx, .xls, .ods) with a header row.
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    #[arg(long, default_value = "date")]
    date_column: String,

    #[arg(long, default_value = "demand")]
    value_column: String,

    /// How rows sharing a timestamp are combined.
    #[arg(long, value_enum, default_value = "sum")]
    aggregation: AggregationArg,

    #[arg(long, value_enum, default_value = "exponential-smoothing")]
    model: ModelArg,

    /// Number of periods to forecast.
    #[arg(long, default_value_t = 30)]
    horizon: usize,

    /// Season length for exponential smoothing (0 for none).
    #[arg(long, default_value_t = 0)]
    seasonal_periods: usize,

    /// ARIMA order as p,d,q.
    #[arg(long, default_value = "1,1,0")]
    order: ArimaOrder,

    /// Replenishment lead time in periods.
    #[arg(long, default_value_t = 7)]
    lead_time: usize,

    /// Target probability of no stockout, strictly between 0 and 1.
    #[arg(long, default_value_t = 0.95)]
    service_level: f64,

    /// Cost per order; with --holding-cost enables EOQ.
    #[arg(long)]
    ordering_cost: Option<f64>,

    /// Cost per unit per year; with --ordering-cost enables EOQ.
    #[arg(long)]
    holding_cost: Option<f64>,

    /// Write history, fitted values and forecast to this CSV.
    #[arg(long, value_name = "CSV")]
    forecast_output: Option<PathBuf>,

    /// Write the inventory metrics to this CSV.
    #[arg(long, value_name = "CSV")]
    metrics_output: Option<PathBuf>,
}

#[derive(Args)]
struct SampleArgs {
    #[arg(long, value_name = "CSV")]
    output: PathBuf,

    #[arg(long, default_value_t = 90)]
    periods: usize,

    #[arg(long, value_enum, default_value = "normal")]
    pattern: PatternArg,

    /// First date of the history.
    #[arg(long, default_value = "2025-01-01")]
    start: NaiveDate,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum AggregationArg {
    Sum,
    Mean,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    ExponentialSmoothing,
    Arima,
}

#[derive(Clone, Copy, ValueEnum)]
enum PatternArg {
    Constant,
    Normal,
    Step,
    Ramp,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl PlanArgs {
    fn to_config(&self) -> PlanningConfig {
        let model = match self.model {
            ModelArg::ExponentialSmoothing => {
                ForecastModel::ExponentialSmoothing(ExponentialSmoothingParams {
                    seasonal_periods: Some(self.seasonal_periods),
                })
            }
            ModelArg::Arima => ForecastModel::Arima(ArimaParams::new(self.order)),
        };
        PlanningConfig {
            date_column: self.date_column.clone(),
            value_column: self.value_column.clone(),
            aggregation: match self.aggregation {
                AggregationArg::Sum => Aggregation::Sum,
                AggregationArg::Mean => Aggregation::Mean,
            },
            model,
            horizon: self.horizon,
            lead_time: self.lead_time,
            service_level: self.service_level,
            ordering_cost: self.ordering_cost,
            holding_cost: self.holding_cost,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    let log_config = LogConfig::from_verbosity(cli.verbose, cli.quiet).with_format(format);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let result = match &cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Sample(args) => run_sample(args),
    };
    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run_plan(args: &PlanArgs) -> Result<()> {
    let config = args.to_config();
    let mut planner = DemandPlanner::new(config).context("invalid planning options")?;

    let table = read_table(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let outcome = planner.plan(&table).context("planning run failed")?;

    if let Some(path) = &args.forecast_output {
        reporting::write_forecast(path, &outcome.history, &outcome.forecast)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.metrics_output {
        reporting::write_metrics(path, &outcome.metrics)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    print_summary(&outcome);
    Ok(())
}

fn run_sample(args: &SampleArgs) -> Result<()> {
    let pattern = match args.pattern {
        PatternArg::Constant => DemandPattern::Constant { value: 10.0 },
        PatternArg::Normal => DemandPattern::Normal {
            mean: 10.0,
            std_dev: 2.0,
        },
        PatternArg::Step => DemandPattern::Step {
            before: 4.0,
            after: 8.0,
            at: 4,
        },
        PatternArg::Ramp => DemandPattern::Ramp {
            from: 50.0,
            to: 100.0,
        },
    };
    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = args.start.and_time(chrono::NaiveTime::MIN);
    let series = generate_series(pattern, args.periods, start, &mut rng)
        .context("failed to generate demand")?;
    reporting::write_series(&args.output, &series, "demand")
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(periods = args.periods, seed = args.seed, "Sample demand written");
    Ok(())
}

fn print_summary(outcome: &PlanOutcome) {
    let forecast = &outcome.forecast;
    println!("=== Forecast ({}) ===", forecast.summary.model);
    for (name, value) in &forecast.summary.parameters {
        println!("{name}: {value:.4}");
    }
    println!("In-sample SSE: {:.2}", forecast.summary.sse);
    for observation in forecast.forecast.observations() {
        println!("{}  {:.2}", observation.timestamp.date(), observation.value);
    }

    println!("\n=== Inventory Metrics ===");
    for (label, value) in outcome.metrics.labeled_rows() {
        println!("{label}: {value:.2}");
    }
}
