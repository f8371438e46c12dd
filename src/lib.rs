//! market_lens
//!
//! In-memory filtering and aggregation engine behind market-research dashboards.
//! Pairs with the `market-lens` CLI.
//!
//! ### Features
//! - Conjunctive multi-valued filters over a flat record collection, plus dropdown options
//! - Grouping, pivoting and share breakdowns into chart-ready series
//! - Scalar KPIs with an explicit "no data" result
//! - Declarative dashboard pages with memoized snapshots
//! - Load records from JSON/CSV, export filtered records as CSV or JSON
//!
//! ### Example
//! ```no_run
//! use market_lens::{Dimension, EvaluationMode, FilterSpec, aggregate};
//!
//! let records = market_lens::storage::load_records("market.json")?;
//! let spec = FilterSpec::new().with(Dimension::Year, [2024, 2025]);
//! let subset = market_lens::apply_filters(&records, &spec);
//! let shares = aggregate::region_country_share(&subset, EvaluationMode::ByValue);
//! println!("{:#?}", shares);
//! # Ok::<(), market_lens::EngineError>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod format;
pub mod models;
pub mod normalize;
pub mod stats;
pub mod storage;

pub use config::{EngineConfig, PageConfig};
pub use dashboard::{Dashboard, FilterState, RecordStore, Snapshot};
pub use error::{EngineError, Result};
pub use filter::{FilterSpec, ValueSet, apply_filters, unique_values};
pub use models::{
    Dataset, DimValue, Dimension, EvaluationMode, Measure, MeasureSelector, Record, Reduction,
};
pub use stats::{Kpi, KpiSpec, KpiValue, summarize};
