//! Core library for eventing benchmark analysis
//!
//! This crate provides the pipeline that turns raw benchmark observations
//! into comparable statistics:
//! - Record decoding (JSON log lines, CSV completion logs, table exports)
//! - An immutable in-memory time series store
//! - Temporal correlation (identity join, time-window association)
//! - Grouped aggregation and series transforms (bucket, rolling, thinning)

pub mod aggregate;
pub mod correlate;
pub mod errors;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod store;

pub use correlate::{EventCorrelation, JoinDiagnostics};
pub use errors::{AnalysisError, Result};
pub use models::*;
pub use pipeline::{run_pipeline, DimensionSeries, PipelineConfig, PipelineReport, SeriesMode};
pub use store::SeriesStore;
