//! Fatal pipeline errors
//!
//! Only configuration-level faults live here: anything that would make a
//! join silently wrong aborts the run before an aggregate is produced.
//! Recoverable faults (malformed records, unmatched or duplicate keys,
//! negative durations) are counted and surfaced as diagnostics instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A timestamp parsed but carries no UTC offset. Joining it against
    /// normalized series would produce silently wrong offsets, so the run
    /// refuses rather than guessing a zone.
    #[error("timestamp {raw:?} has no UTC offset; refusing to join unnormalized series")]
    UnnormalizedTimestamp { raw: String },

    /// A matched request references an experiment with no configuration row.
    #[error("experiment {experiment_id:?} has no configuration row")]
    UnknownExperiment { experiment_id: String },

    #[error("bucket width must be positive, got {millis}ms")]
    InvalidBucketWidth { millis: i64 },

    #[error("downsample point budget must be at least 1")]
    InvalidPointBudget,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
