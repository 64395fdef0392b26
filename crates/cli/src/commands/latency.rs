//! TTFB latency summaries by experiment and status

use analysis_lib::{run_pipeline, ObservationKind, PipelineConfig};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use tabled::Tabled;

use crate::config::BenchConfig;
use crate::loader;
use crate::output::{print_table, round3};
use crate::Cli;

/// Row for the latency summary table
#[derive(Tabled, Serialize)]
struct LatencyRow {
    #[tabled(rename = "Experiment")]
    experiment: String,
    #[tabled(rename = "Triggers")]
    triggers: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Mean (ms)")]
    mean: f64,
    #[tabled(rename = "Std (ms)")]
    std: f64,
    #[tabled(rename = "Min (ms)")]
    min: f64,
    #[tabled(rename = "Median (ms)")]
    median: f64,
    #[tabled(rename = "Max (ms)")]
    max: f64,
}

pub fn run(cli: &Cli, _defaults: &BenchConfig) -> Result<()> {
    let inputs = loader::load(
        &cli.requests,
        &cli.experiments,
        &cli.events,
        cli.metrics.as_deref(),
    )?;

    let mut config = PipelineConfig::default();
    config.include_kinds = BTreeSet::from([ObservationKind::Request]);

    let report = run_pipeline(&inputs.store, &inputs.experiments, &config)?;

    let rows: Vec<LatencyRow> = report
        .latency
        .iter()
        .map(|summary| LatencyRow {
            experiment: summary.experiment_id.clone(),
            triggers: summary.trigger_count,
            status: summary.status.clone(),
            count: summary.count,
            mean: round3(summary.mean_ms),
            std: round3(summary.std_ms),
            min: round3(summary.min_ms),
            median: round3(summary.median_ms),
            max: round3(summary.max_ms),
        })
        .collect();
    print_table(&rows, cli.format);

    Ok(())
}
