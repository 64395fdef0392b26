//! Resampled resource-utilization series

use analysis_lib::correlate::node_hosting;
use analysis_lib::{
    run_pipeline, Dimension, ObservationKind, PipelineConfig, SeriesMode,
};
use anyhow::{Context, Result};
use chrono::Duration;
use serde::Serialize;
use std::collections::BTreeSet;
use tabled::Tabled;

use crate::config::BenchConfig;
use crate::loader;
use crate::output::{print_table, print_warning, round3, OutputFormat};
use crate::{Cli, GroupBy, ModeArg};

/// Flags of the `resources` subcommand
pub struct Options {
    pub group_by: GroupBy,
    pub mode: ModeArg,
    pub bucket_ms: Option<i64>,
    pub points: Option<usize>,
    pub node: Option<String>,
    pub controller_node: bool,
}

/// Per-series summary row for table output
#[derive(Tabled, Serialize)]
struct SeriesRow {
    #[tabled(rename = "Series")]
    key: String,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "Mean CPU")]
    mean: f64,
    #[tabled(rename = "Max CPU")]
    max: f64,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

pub fn run(cli: &Cli, defaults: &BenchConfig, opts: Options) -> Result<()> {
    let metrics_path = cli
        .metrics
        .as_deref()
        .context("--metrics is required for the resources command")?;
    let inputs = loader::load(
        &cli.requests,
        &cli.experiments,
        &cli.events,
        Some(metrics_path),
    )?;

    let mut filters = Vec::new();
    if let Some(node) = opts.node {
        filters.push((Dimension::Node, node));
    }
    if opts.controller_node {
        match node_hosting(
            inputs.store.resources(),
            Dimension::Container,
            &defaults.controller_container,
        ) {
            Some(node) => filters.push((Dimension::Node, node.to_string())),
            None => print_warning(&format!(
                "no sample names container {:?}; controller-node filter skipped",
                defaults.controller_container
            )),
        }
    }

    let mode = match opts.mode {
        ModeArg::Bucket => SeriesMode::Bucket,
        ModeArg::Rolling => SeriesMode::Rolling,
        ModeArg::Downsample => SeriesMode::Downsample {
            target: opts.points.unwrap_or(defaults.point_budget),
        },
    };

    let mut config = PipelineConfig::default()
        .with_bucket_width(Duration::milliseconds(
            opts.bucket_ms.unwrap_or(defaults.bucket_ms),
        ))
        .with_mode(mode)
        .with_filters(filters)
        .with_series_dimension(match opts.group_by {
            GroupBy::Node => Dimension::Node,
            GroupBy::Pod => Dimension::Pod,
        });

    // Without joined events there is no experiment span to clip to; fall
    // back to the full resource range.
    if inputs.store.requests().is_empty() || inputs.store.completions().is_empty() {
        config.include_kinds = BTreeSet::from([ObservationKind::Resource]);
    }

    let report = run_pipeline(&inputs.store, &inputs.experiments, &config)?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.resource_series)?);
        }
        OutputFormat::Table => {
            let rows: Vec<SeriesRow> = report
                .resource_series
                .iter()
                .map(|series| {
                    let values: Vec<f64> = series.points.iter().map(|p| p.value).collect();
                    let mean = if values.is_empty() {
                        0.0
                    } else {
                        values.iter().sum::<f64>() / values.len() as f64
                    };
                    let max = values.iter().copied().fold(0.0_f64, f64::max);
                    SeriesRow {
                        key: series.key.clone(),
                        points: series.points.len(),
                        mean: round3(mean),
                        max: round3(max),
                        from: series
                            .points
                            .first()
                            .map(|p| p.timestamp.to_rfc3339())
                            .unwrap_or_default(),
                        to: series
                            .points
                            .last()
                            .map(|p| p.timestamp.to_rfc3339())
                            .unwrap_or_default(),
                    }
                })
                .collect();
            print_table(&rows, cli.format);
        }
    }

    Ok(())
}
