//! Core data models for the benchmark analysis pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three observation families handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObservationKind {
    Request,
    Completion,
    Resource,
}

/// Dimension keys an observation may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    ExperimentId,
    Status,
    EventId,
    Node,
    Pod,
    Container,
    Namespace,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::ExperimentId => "experiment_id",
            Dimension::Status => "status",
            Dimension::EventId => "event_id",
            Dimension::Node => "node",
            Dimension::Pod => "pod",
            Dimension::Container => "container",
            Dimension::Namespace => "namespace",
        }
    }
}

/// Common view over the three observation kinds
///
/// Timestamps are `DateTime<Utc>` by construction, so any two observations
/// reaching a join are already in the same reference zone.
pub trait Observation {
    fn timestamp(&self) -> DateTime<Utc>;

    /// Value of a dimension key, if this kind carries it
    fn dimension(&self, key: Dimension) -> Option<&str>;
}

/// One per-request latency sample (TTFB), joined to its experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSample {
    pub timestamp: DateTime<Utc>,
    pub experiment_id: String,
    pub status: String,
    /// Time-to-first-byte in milliseconds
    pub latency_ms: f64,
    /// Identifier of the async event this request triggered, when tracked
    pub event_id: Option<String>,
}

impl Observation for RequestSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn dimension(&self, key: Dimension) -> Option<&str> {
        match key {
            Dimension::ExperimentId => Some(&self.experiment_id),
            Dimension::Status => Some(&self.status),
            Dimension::EventId => self.event_id.as_deref(),
            _ => None,
        }
    }
}

/// The instant an asynchronously processed unit of work finished
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCompletion {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Observation for EventCompletion {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn dimension(&self, key: Dimension) -> Option<&str> {
        match key {
            Dimension::EventId => Some(&self.event_id),
            _ => None,
        }
    }
}

/// Periodic CPU/memory utilization reading for a node, pod, or container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSample {
    pub timestamp: DateTime<Utc>,
    pub node: String,
    pub pod: Option<String>,
    pub container: Option<String>,
    pub namespace: Option<String>,
    /// Usage as a fraction of allocatable (0.0..=1.0)
    pub cpu_fraction: f64,
    pub memory_fraction: f64,
    /// Raw usage, when the source reported it (millicores)
    pub cpu_absolute: Option<f64>,
    /// Raw usage, when the source reported it (bytes)
    pub memory_absolute: Option<f64>,
}

impl Observation for ResourceSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn dimension(&self, key: Dimension) -> Option<&str> {
        match key {
            Dimension::Node => Some(&self.node),
            Dimension::Pod => self.pod.as_deref(),
            Dimension::Container => self.container.as_deref(),
            Dimension::Namespace => self.namespace.as_deref(),
            _ => None,
        }
    }
}

/// One row of the experiments table: a configured benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment_id: String,
    /// Configured count of concurrent trigger workers for the run
    pub trigger_count: u32,
}

/// A matched (request, completion) pair with its derived duration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedEventRecord {
    pub experiment_id: String,
    pub event_id: String,
    pub request_timestamp: DateTime<Utc>,
    pub completion_timestamp: DateTime<Utc>,
    /// completion − request, in seconds; negative values are flagged upstream
    pub processing_seconds: f64,
    pub trigger_count: u32,
}

impl JoinedEventRecord {
    pub fn new(
        experiment_id: String,
        event_id: String,
        request_timestamp: DateTime<Utc>,
        completion_timestamp: DateTime<Utc>,
        trigger_count: u32,
    ) -> Self {
        let delta = completion_timestamp - request_timestamp;
        // Microsecond precision keeps the subtraction exact for the
        // fractional-second timestamps the sources emit.
        let processing_seconds = delta.num_microseconds().map_or_else(
            || delta.num_milliseconds() as f64 / 1e3,
            |us| us as f64 / 1e6,
        );
        Self {
            experiment_id,
            event_id,
            request_timestamp,
            completion_timestamp,
            processing_seconds,
            trigger_count,
        }
    }
}

/// Per-experiment summary over processing durations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentAggregate {
    pub experiment_id: String,
    pub trigger_count: u32,
    pub count: usize,
    pub mean_seconds: f64,
    /// Population standard deviation
    pub std_seconds: f64,
    pub min_seconds: f64,
    pub max_seconds: f64,
    /// count / wall-clock span; absent when span is zero or count < 2
    pub events_per_second: Option<f64>,
}

/// Per-experiment, per-status latency summary (TTFB milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySummary {
    pub experiment_id: String,
    pub trigger_count: u32,
    pub status: String,
    pub count: usize,
    pub mean_ms: f64,
    /// Sample standard deviation, matching the relational describe() output
    pub std_ms: f64,
    pub min_ms: f64,
    pub median_ms: f64,
    pub max_ms: f64,
}

/// One point of a resampled, rolling, or downsampled series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}
