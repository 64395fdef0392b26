//! File loading for the pipeline's excluded ingestion boundary
//!
//! Reads already-materialized benchmark artifacts (table exports, the
//! completion CSV, the metrics log) and hands typed observations to the
//! core. No schema validation beyond "drop unparseable records" happens
//! here.

use analysis_lib::parser::{
    parse_completion_lines, parse_experiment_lines, parse_metric_lines, parse_request_lines,
    MetricLineKind, ParseStats,
};
use analysis_lib::{ExperimentConfig, SeriesStore};
use anyhow::{Context, Result};
use std::path::Path;

use crate::output::print_warning;

/// Everything one pipeline run consumes
pub struct Inputs {
    pub store: SeriesStore,
    pub experiments: Vec<ExperimentConfig>,
}

fn warn_on_drops(source: &str, stats: ParseStats) {
    if stats.dropped > 0 {
        print_warning(&format!(
            "{}: dropped {} malformed record(s), kept {}",
            source, stats.dropped, stats.parsed
        ));
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Load all inputs for a run. The metrics log is optional; without it the
/// store simply holds no resource samples.
pub fn load(
    requests_path: &Path,
    experiments_path: &Path,
    events_path: &Path,
    metrics_path: Option<&Path>,
) -> Result<Inputs> {
    let requests_raw = read(requests_path)?;
    let (requests, stats) = parse_request_lines(requests_raw.lines())?;
    warn_on_drops("requests", stats);

    let experiments_raw = read(experiments_path)?;
    let (experiments, stats) = parse_experiment_lines(experiments_raw.lines());
    warn_on_drops("experiments", stats);

    let events_raw = read(events_path)?;
    let (completions, stats) = parse_completion_lines(events_raw.lines())?;
    warn_on_drops("events", stats);

    let mut resources = Vec::new();
    if let Some(path) = metrics_path {
        let metrics_raw = read(path)?;
        let (node_samples, stats) =
            parse_metric_lines(metrics_raw.lines(), MetricLineKind::Node)?;
        warn_on_drops("node metrics", stats);
        let (container_samples, stats) =
            parse_metric_lines(metrics_raw.lines(), MetricLineKind::Container)?;
        warn_on_drops("container metrics", stats);
        resources = node_samples;
        resources.extend(container_samples);
    }

    tracing::debug!(
        requests = requests.len(),
        completions = completions.len(),
        resources = resources.len(),
        experiments = experiments.len(),
        "inputs loaded"
    );

    Ok(Inputs {
        store: SeriesStore::new(requests, completions, resources),
        experiments,
    })
}
