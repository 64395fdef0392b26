//! One parameterized pipeline replacing per-dataset analysis variants
//!
//! Which observation kinds are active, which dimension filters apply, and
//! how series are reduced (bucket, rolling, downsample) are configuration,
//! not separate code paths. The pipeline owns no ambient state: the store
//! and experiment rows are passed in, materialized results come back.

use crate::aggregate::{
    aggregate_experiments, bucket_resample, derive_window_size, downsample, rolling_mean,
    summarize_latency,
};
use crate::correlate::{correlate_events, experiment_span, resources_in_span, JoinDiagnostics};
use crate::errors::{AnalysisError, Result};
use crate::models::{
    Dimension, ExperimentAggregate, ExperimentConfig, LatencySummary, Observation,
    ObservationKind, ResourceSample, SeriesPoint,
};
use crate::store::{select, DimensionFilters, SeriesStore};
use chrono::Duration;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// How a grouped series is reduced for comparison or display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMode {
    /// Fixed-width, wall-clock-aligned bucket means
    Bucket,
    /// Sliding-window moving average, one point per sample
    Rolling,
    /// Uniform thinning to roughly `target` points
    Downsample { target: usize },
}

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Observation families the run operates on
    pub include_kinds: BTreeSet<ObservationKind>,
    /// Conjunctive filters applied to resource samples (e.g. only the node
    /// hosting the eventing controller)
    pub dimension_filters: DimensionFilters,
    /// Bucket width for `SeriesMode::Bucket`
    pub bucket_width: Duration,
    pub mode: SeriesMode,
    /// Dimension the resource series are grouped by
    pub series_dimension: Dimension,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            include_kinds: BTreeSet::from([
                ObservationKind::Request,
                ObservationKind::Completion,
                ObservationKind::Resource,
            ]),
            dimension_filters: Vec::new(),
            bucket_width: Duration::milliseconds(100),
            mode: SeriesMode::Bucket,
            series_dimension: Dimension::Node,
        }
    }
}

impl PipelineConfig {
    pub fn with_filters(mut self, filters: DimensionFilters) -> Self {
        self.dimension_filters = filters;
        self
    }

    pub fn with_bucket_width(mut self, width: Duration) -> Self {
        self.bucket_width = width;
        self
    }

    pub fn with_mode(mut self, mode: SeriesMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_series_dimension(mut self, dimension: Dimension) -> Self {
        self.series_dimension = dimension;
        self
    }

    /// Reject configurations that cannot produce a well-defined run.
    pub fn validate(&self) -> Result<()> {
        if self.bucket_width <= Duration::zero() {
            return Err(AnalysisError::InvalidBucketWidth {
                millis: self.bucket_width.num_milliseconds(),
            });
        }
        if let SeriesMode::Downsample { target: 0 } = self.mode {
            return Err(AnalysisError::InvalidPointBudget);
        }
        Ok(())
    }
}

/// One reduced series for a dimension value (node, pod, ...)
#[derive(Debug, Clone, Serialize)]
pub struct DimensionSeries {
    pub key: String,
    pub points: Vec<SeriesPoint>,
}

/// Materialized output of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub aggregates: Vec<ExperimentAggregate>,
    pub latency: Vec<LatencySummary>,
    pub diagnostics: JoinDiagnostics,
    /// Per-event processing durations over request time, reduced by the
    /// configured mode
    pub event_series: Vec<SeriesPoint>,
    /// CPU utilization per value of the configured series dimension
    pub resource_series: Vec<DimensionSeries>,
}

fn reduce(points: &[SeriesPoint], config: &PipelineConfig) -> Result<Vec<SeriesPoint>> {
    match config.mode {
        SeriesMode::Bucket => bucket_resample(points, config.bucket_width),
        SeriesMode::Rolling => Ok(rolling_mean(points, derive_window_size(points))),
        SeriesMode::Downsample { target } => downsample(points, target),
    }
}

/// Run the full correlation and aggregation pipeline over one store
/// snapshot.
pub fn run_pipeline(
    store: &SeriesStore,
    experiments: &[ExperimentConfig],
    config: &PipelineConfig,
) -> Result<PipelineReport> {
    config.validate()?;

    let trigger_counts: HashMap<String, u32> = experiments
        .iter()
        .map(|e| (e.experiment_id.clone(), e.trigger_count))
        .collect();

    let mut report = PipelineReport::default();
    let events_active = config.include_kinds.contains(&ObservationKind::Request)
        && config.include_kinds.contains(&ObservationKind::Completion);

    if events_active {
        let correlation = correlate_events(store.requests(), store.completions(), &trigger_counts)?;
        tracing::info!(
            records = correlation.records.len(),
            unmatched = correlation.diagnostics.unmatched_completions,
            faults = correlation.diagnostics.fault_count(),
            "identity join complete"
        );
        report.aggregates = aggregate_experiments(&correlation.records);

        let event_points: Vec<SeriesPoint> = correlation
            .records
            .iter()
            .map(|r| SeriesPoint::new(r.request_timestamp, r.processing_seconds))
            .collect();
        report.event_series = reduce(&event_points, config)?;

        if config.include_kinds.contains(&ObservationKind::Resource) {
            // Resource context is only meaningful inside the observed span.
            if let Some(span) = experiment_span(&correlation.records) {
                let in_span =
                    resources_in_span(store.resources(), span, &config.dimension_filters);
                report.resource_series = reduce_resource_groups(&in_span, config)?;
            }
        }

        report.diagnostics = correlation.diagnostics;
    } else if config.include_kinds.contains(&ObservationKind::Resource) {
        let selected = select(store.resources(), &config.dimension_filters);
        report.resource_series = reduce_resource_groups(&selected, config)?;
    }

    if config.include_kinds.contains(&ObservationKind::Request) {
        report.latency = summarize_latency(store.requests(), &trigger_counts)?;
    }

    tracing::info!(
        experiments = report.aggregates.len(),
        series = report.resource_series.len(),
        "pipeline run complete"
    );
    Ok(report)
}

fn reduce_resource_groups(
    samples: &[&ResourceSample],
    config: &PipelineConfig,
) -> Result<Vec<DimensionSeries>> {
    let mut series = Vec::new();
    let mut groups: std::collections::BTreeMap<String, Vec<SeriesPoint>> = Default::default();
    for sample in samples {
        if let Some(value) = sample.dimension(config.series_dimension) {
            groups
                .entry(value.to_string())
                .or_default()
                .push(SeriesPoint::new(sample.timestamp, sample.cpu_fraction));
        }
    }
    for (key, points) in groups {
        series.push(DimensionSeries {
            key,
            points: reduce(&points, config)?,
        });
    }
    Ok(series)
}
