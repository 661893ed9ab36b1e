// src/error.rs

use thiserror::Error;

/// Result type alias for planning operations.
pub type Result<T> = std::result::Result<T, PlanningError>;

/// Errors raised by the normalizer, the forecast strategies and the
/// inventory calculator, plus the CSV and spreadsheet boundary.
#[derive(Error, Debug)]
pub enum PlanningError {
    /// A requested column does not exist in the table.
    #[error("column '{column}' not found in table")]
    InvalidColumn { column: String },

    /// A forecasting model could not be fitted.
    #[error("{model} fit failed: {reason}")]
    ModelFit { model: &'static str, reason: String },

    /// An input is outside its valid range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The forecast does not cover the requested lead time.
    #[error("lead time of {lead_time} periods exceeds the {available} forecast periods")]
    InsufficientForecastHorizon { lead_time: usize, available: usize },

    /// A row has more cells than the table has columns.
    #[error("row {row} has {actual} values but the table has {expected} columns")]
    MalformedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A spreadsheet has no worksheet to read.
    #[error("workbook '{path}' has no worksheets")]
    EmptyWorkbook { path: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlanningError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn model_fit(model: &'static str, reason: impl Into<String>) -> Self {
        Self::ModelFit {
            model,
            reason: reason.into(),
        }
    }
}
