use std::io;

use thiserror::Error;

use crate::models::Dimension;

/// Errors raised at the engine's boundaries: spec construction, configuration, and I/O.
///
/// Aggregation and summarization never fail; they degrade to empty series or
/// [`KpiValue::NoData`](crate::stats::KpiValue::NoData).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),
    #[error("unknown measure '{0}'")]
    UnknownMeasure(String),
    #[error("unknown reduction '{0}', expected 'sum' or 'average'")]
    UnknownReduction(String),
    #[error("invalid value '{value}' for dimension '{dimension}'")]
    InvalidFilterValue { dimension: Dimension, value: String },
    #[error("malformed filter clause '{0}', expected <dimension>=<value>[,<value>...]")]
    MalformedClause(String),
    #[error("dimension '{0}' is not filterable on this page")]
    DimensionNotFilterable(Dimension),
    #[error("unknown evaluation mode '{0}', expected 'value' or 'volume'")]
    UnknownEvaluationMode(String),
    #[error("invalid page configuration '{page}': {reason}")]
    InvalidPage { page: String, reason: String },
    #[error("unknown page preset '{0}'")]
    UnknownPage(String),
    #[error("unsupported data format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
