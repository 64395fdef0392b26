//! Eventing Benchmark Analysis CLI
//!
//! A command-line tool that loads benchmark observation files, runs the
//! correlation/aggregation pipeline, and prints per-experiment statistics,
//! latency summaries, and resampled resource series.

mod commands;
mod config;
mod loader;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Eventing Benchmark Analysis CLI
#[derive(Parser)]
#[command(name = "bench")]
#[command(author, version, about = "Eventing Benchmark Analysis", long_about = None)]
pub struct Cli {
    /// JSON-lines export of the requests table
    #[arg(long, env = "BENCH_REQUESTS", default_value = "logs/requests.jsonl")]
    pub requests: PathBuf,

    /// JSON-lines export of the experiments table
    #[arg(long, env = "BENCH_EXPERIMENTS", default_value = "logs/experiments.jsonl")]
    pub experiments: PathBuf,

    /// CSV event-completion log (event_id,timestamp)
    #[arg(long, env = "BENCH_EVENTS", default_value = "logs/events.csv")]
    pub events: PathBuf,

    /// JSON-lines metrics log (node and container metrics)
    #[arg(long, env = "BENCH_METRICS")]
    pub metrics: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Per-experiment event-processing statistics and join diagnostics
    Summary,

    /// TTFB latency summaries by experiment and status
    Latency,

    /// Resampled resource-utilization series
    Resources {
        /// Dimension to group series by
        #[arg(long, default_value = "node")]
        group_by: GroupBy,

        /// Series reduction mode
        #[arg(long, default_value = "bucket")]
        mode: ModeArg,

        /// Bucket width in milliseconds (bucket mode)
        #[arg(long)]
        bucket_ms: Option<i64>,

        /// Point budget (downsample mode)
        #[arg(long)]
        points: Option<usize>,

        /// Only samples from this node
        #[arg(long)]
        node: Option<String>,

        /// Restrict to the node hosting the eventing controller container
        #[arg(long)]
        controller_node: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GroupBy {
    Node,
    Pod,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Bucket,
    Rolling,
    Downsample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json())
        .init();

    let defaults = config::BenchConfig::load()?;

    match &cli.command {
        Commands::Summary => commands::summary::run(&cli, &defaults),
        Commands::Latency => commands::latency::run(&cli, &defaults),
        Commands::Resources {
            group_by,
            mode,
            bucket_ms,
            points,
            node,
            controller_node,
        } => commands::resources::run(
            &cli,
            &defaults,
            commands::resources::Options {
                group_by: *group_by,
                mode: *mode,
                bucket_ms: *bucket_ms,
                points: *points,
                node: node.clone(),
                controller_node: *controller_node,
            },
        ),
    }
}
