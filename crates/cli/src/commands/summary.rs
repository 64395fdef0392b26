//! Per-experiment event-processing summary

use analysis_lib::{run_pipeline, ObservationKind, PipelineConfig};
use anyhow::Result;
use chrono::Duration;
use serde::Serialize;
use tabled::Tabled;

use crate::config::BenchConfig;
use crate::loader;
use crate::output::{format_optional, print_info, print_table, round3};
use crate::Cli;

/// Row for the per-experiment aggregate table
#[derive(Tabled, Serialize)]
struct AggregateRow {
    #[tabled(rename = "Experiment")]
    experiment: String,
    #[tabled(rename = "Triggers")]
    triggers: u32,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Mean (s)")]
    mean: f64,
    #[tabled(rename = "Std (s)")]
    std: f64,
    #[tabled(rename = "Min (s)")]
    min: f64,
    #[tabled(rename = "Max (s)")]
    max: f64,
    #[tabled(rename = "Events/s")]
    events_per_second: String,
}

/// Row for the diagnostics table of flagged joins
#[derive(Tabled, Serialize)]
struct FaultRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Event ID")]
    event_id: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

pub fn run(cli: &Cli, defaults: &BenchConfig) -> Result<()> {
    let inputs = loader::load(
        &cli.requests,
        &cli.experiments,
        &cli.events,
        cli.metrics.as_deref(),
    )?;

    let mut config = PipelineConfig::default()
        .with_bucket_width(Duration::milliseconds(defaults.bucket_ms));
    if cli.metrics.is_none() {
        config.include_kinds.remove(&ObservationKind::Resource);
    }

    let report = run_pipeline(&inputs.store, &inputs.experiments, &config)?;

    let rows: Vec<AggregateRow> = report
        .aggregates
        .iter()
        .map(|agg| AggregateRow {
            experiment: agg.experiment_id.clone(),
            triggers: agg.trigger_count,
            count: agg.count,
            mean: round3(agg.mean_seconds),
            std: round3(agg.std_seconds),
            min: round3(agg.min_seconds),
            max: round3(agg.max_seconds),
            events_per_second: format_optional(agg.events_per_second),
        })
        .collect();
    print_table(&rows, cli.format);

    let diagnostics = &report.diagnostics;
    print_info(&format!(
        "unmatched completions: {}",
        diagnostics.unmatched_completions
    ));

    let mut faults: Vec<FaultRow> = diagnostics
        .duplicate_keys
        .iter()
        .map(|fault| FaultRow {
            kind: "duplicate key".to_string(),
            event_id: fault.event_id.clone(),
            detail: format!(
                "{} request(s) x {} completion(s)",
                fault.request_matches, fault.completion_matches
            ),
        })
        .collect();
    faults.extend(diagnostics.negative_durations.iter().map(|record| FaultRow {
        kind: "negative duration".to_string(),
        event_id: record.event_id.clone(),
        detail: format!("{:.3}s", record.processing_seconds),
    }));

    if !faults.is_empty() {
        print_table(&faults, cli.format);
    }

    Ok(())
}
