//! Record decoding for the three observation families
//!
//! Inputs arrive as JSON log lines (resource metrics, discriminated by the
//! `msg` tag), JSON-lines exports of the relational requests/experiments
//! tables, and a two-column CSV of event completions. Malformed records are
//! dropped and counted, never raised; a timestamp that parses but carries no
//! UTC offset is a fatal configuration error instead, since joining it would
//! produce silently wrong offsets.

use crate::errors::{AnalysisError, Result};
use crate::models::{EventCompletion, ExperimentConfig, RequestSample, ResourceSample};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// Counters for one parse pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Records successfully decoded
    pub parsed: usize,
    /// Malformed records dropped (failed decode or missing required field)
    pub dropped: usize,
}

impl ParseStats {
    fn keep(&mut self) {
        self.parsed += 1;
    }

    fn drop_record(&mut self, line_no: usize, reason: &str) {
        self.dropped += 1;
        tracing::debug!(line = line_no, reason, "dropping malformed record");
    }
}

/// Which `msg` tag a metric line must carry to be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricLineKind {
    Node,
    Container,
}

impl MetricLineKind {
    pub fn msg_tag(&self) -> &'static str {
        match self {
            MetricLineKind::Node => "node metrics",
            MetricLineKind::Container => "container metrics",
        }
    }
}

enum TimestampFault {
    /// Did not parse at all; the enclosing record is malformed.
    Unparseable,
    /// Parsed as a wall-clock time with no offset; fatal, never localized.
    Unnormalized,
}

/// Parse an absolute timestamp and normalize it to UTC.
///
/// Accepts RFC 3339 with any offset (converted to UTC). A bare wall-clock
/// time is reported as unnormalized rather than being assumed UTC.
fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, TimestampFault> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").is_ok()
    {
        return Err(TimestampFault::Unnormalized);
    }
    Err(TimestampFault::Unparseable)
}

/// String-or-integer identifiers: the relational store keys experiments by
/// integer and event ids arrive as either form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMetricLine {
    msg: String,
    #[serde(alias = "time")]
    timestamp: String,
    #[serde(alias = "node_name")]
    node: Option<String>,
    #[serde(alias = "pod_name")]
    pod: Option<String>,
    #[serde(alias = "container_name")]
    container: Option<String>,
    namespace: Option<String>,
    cpu_percentage: Option<f64>,
    memory_percentage: Option<f64>,
    #[serde(alias = "cpu_usage")]
    cpu: Option<f64>,
    #[serde(alias = "memory_usage")]
    memory_bytes: Option<f64>,
}

/// Decode resource-utilization samples of one kind from JSON log lines.
///
/// Lines whose `msg` tag names a different kind are skipped without being
/// counted as malformed; the same log interleaves node and container lines.
/// Output ordering is not guaranteed to be meaningful to callers.
pub fn parse_metric_lines<'a, I>(
    lines: I,
    kind: MetricLineKind,
) -> Result<(Vec<ResourceSample>, ParseStats)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut samples = Vec::new();
    let mut stats = ParseStats::default();

    for (line_no, line) in lines.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawMetricLine = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(_) => {
                stats.drop_record(line_no, "json decode failed");
                continue;
            }
        };
        if raw.msg != kind.msg_tag() {
            continue;
        }
        let timestamp = match parse_timestamp(&raw.timestamp) {
            Ok(ts) => ts,
            Err(TimestampFault::Unparseable) => {
                stats.drop_record(line_no, "unparseable timestamp");
                continue;
            }
            Err(TimestampFault::Unnormalized) => {
                return Err(AnalysisError::UnnormalizedTimestamp {
                    raw: raw.timestamp,
                });
            }
        };
        let Some(node) = raw.node else {
            stats.drop_record(line_no, "missing node");
            continue;
        };
        if kind == MetricLineKind::Container && raw.pod.is_none() && raw.container.is_none() {
            stats.drop_record(line_no, "missing pod/container");
            continue;
        }
        let (Some(cpu_fraction), Some(memory_fraction)) =
            (raw.cpu_percentage, raw.memory_percentage)
        else {
            stats.drop_record(line_no, "missing utilization fractions");
            continue;
        };
        samples.push(ResourceSample {
            timestamp,
            node,
            pod: raw.pod,
            container: raw.container,
            namespace: raw.namespace,
            cpu_fraction,
            memory_fraction,
            cpu_absolute: raw.cpu,
            memory_absolute: raw.memory_bytes,
        });
        stats.keep();
    }

    Ok((samples, stats))
}

/// Decode event completions from `event_id,timestamp` CSV lines.
///
/// A leading header row is tolerated. Timestamps carry fractional seconds
/// and a `Z` suffix (e.g. `2025-01-29T13:43:37.792661715Z`).
pub fn parse_completion_lines<'a, I>(lines: I) -> Result<(Vec<EventCompletion>, ParseStats)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut completions = Vec::new();
    let mut stats = ParseStats::default();

    for (line_no, line) in lines.into_iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((event_id, raw_ts)) = line.split_once(',') else {
            stats.drop_record(line_no, "not a two-column row");
            continue;
        };
        let event_id = event_id.trim();
        let raw_ts = raw_ts.trim();
        if line_no == 0 && event_id == "event_id" {
            continue;
        }
        if event_id.is_empty() {
            stats.drop_record(line_no, "empty event_id");
            continue;
        }
        let timestamp = match parse_timestamp(raw_ts) {
            Ok(ts) => ts,
            Err(TimestampFault::Unparseable) => {
                stats.drop_record(line_no, "unparseable timestamp");
                continue;
            }
            Err(TimestampFault::Unnormalized) => {
                return Err(AnalysisError::UnnormalizedTimestamp {
                    raw: raw_ts.to_string(),
                });
            }
        };
        completions.push(EventCompletion {
            event_id: event_id.to_string(),
            timestamp,
        });
        stats.keep();
    }

    Ok((completions, stats))
}

#[derive(Debug, Deserialize)]
struct RawRequestLine {
    timestamp: String,
    experiment_id: RawId,
    status: RawId,
    #[serde(alias = "ttfb")]
    latency_ms: f64,
    event_id: Option<RawId>,
}

/// Decode per-request latency samples from a JSON-lines export of the
/// requests table (each row already joined to its experiment id).
pub fn parse_request_lines<'a, I>(lines: I) -> Result<(Vec<RequestSample>, ParseStats)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut requests = Vec::new();
    let mut stats = ParseStats::default();

    for (line_no, line) in lines.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawRequestLine = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(_) => {
                stats.drop_record(line_no, "json decode failed");
                continue;
            }
        };
        let timestamp = match parse_timestamp(&raw.timestamp) {
            Ok(ts) => ts,
            Err(TimestampFault::Unparseable) => {
                stats.drop_record(line_no, "unparseable timestamp");
                continue;
            }
            Err(TimestampFault::Unnormalized) => {
                return Err(AnalysisError::UnnormalizedTimestamp {
                    raw: raw.timestamp,
                });
            }
        };
        requests.push(RequestSample {
            timestamp,
            experiment_id: raw.experiment_id.into_string(),
            status: raw.status.into_string(),
            latency_ms: raw.latency_ms,
            event_id: raw.event_id.map(RawId::into_string),
        });
        stats.keep();
    }

    Ok((requests, stats))
}

#[derive(Debug, Deserialize)]
struct RawExperimentLine {
    #[serde(alias = "id")]
    experiment_id: RawId,
    #[serde(alias = "triggers")]
    trigger_count: u32,
}

/// Decode experiment configuration rows from a JSON-lines export of the
/// experiments table.
pub fn parse_experiment_lines<'a, I>(lines: I) -> (Vec<ExperimentConfig>, ParseStats)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut configs = Vec::new();
    let mut stats = ParseStats::default();

    for (line_no, line) in lines.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawExperimentLine>(line) {
            Ok(raw) => {
                configs.push(ExperimentConfig {
                    experiment_id: raw.experiment_id.into_string(),
                    trigger_count: raw.trigger_count,
                });
                stats.keep();
            }
            Err(_) => stats.drop_record(line_no, "json decode failed"),
        }
    }

    (configs, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_empty_input_is_empty_output() {
        let (samples, stats) = parse_metric_lines([], MetricLineKind::Node).unwrap();
        assert!(samples.is_empty());
        assert_eq!(stats, ParseStats::default());
    }

    #[test]
    fn test_node_metric_line() {
        let line = r#"{"timestamp":"2025-01-29T13:43:37.792Z","msg":"node metrics","node":"nodes-europe-west1-b-s5tc","cpu":250.0,"memory_bytes":1073741824,"cpu_percentage":0.25,"memory_percentage":0.5}"#;
        let (samples, stats) = parse_metric_lines([line], MetricLineKind::Node).unwrap();
        assert_eq!(stats.parsed, 1);
        assert_eq!(samples[0].node, "nodes-europe-west1-b-s5tc");
        assert_eq!(samples[0].cpu_fraction, 0.25);
        assert_eq!(samples[0].cpu_absolute, Some(250.0));
        assert!(samples[0].pod.is_none());
    }

    #[test]
    fn test_discriminator_separates_kinds() {
        let lines = [
            r#"{"timestamp":"2025-01-29T13:43:37Z","msg":"node metrics","node":"n1","cpu_percentage":0.1,"memory_percentage":0.2}"#,
            r#"{"timestamp":"2025-01-29T13:43:38Z","msg":"container metrics","node":"n1","namespace":"knative-eventing","pod_name":"eventing-controller-abc","container_name":"eventing-controller","cpu_percentage":0.3,"memory_percentage":0.4}"#,
        ];
        let (nodes, node_stats) = parse_metric_lines(lines, MetricLineKind::Node).unwrap();
        let (pods, pod_stats) = parse_metric_lines(lines, MetricLineKind::Container).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(pods.len(), 1);
        // the other kind's line is skipped, not dropped
        assert_eq!(node_stats.dropped, 0);
        assert_eq!(pod_stats.dropped, 0);
        assert_eq!(pods[0].pod.as_deref(), Some("eventing-controller-abc"));
        assert_eq!(pods[0].namespace.as_deref(), Some("knative-eventing"));
    }

    #[test]
    fn test_malformed_lines_dropped_not_raised() {
        let lines = [
            "not json at all",
            r#"{"timestamp":"2025-01-29T13:43:37Z","msg":"node metrics","cpu_percentage":0.1,"memory_percentage":0.2}"#,
            r#"{"timestamp":"garbage","msg":"node metrics","node":"n1","cpu_percentage":0.1,"memory_percentage":0.2}"#,
            r#"{"timestamp":"2025-01-29T13:43:37Z","msg":"node metrics","node":"n1"}"#,
            r#"{"timestamp":"2025-01-29T13:43:37Z","msg":"node metrics","node":"n1","cpu_percentage":0.1,"memory_percentage":0.2}"#,
        ];
        let (samples, stats) = parse_metric_lines(lines, MetricLineKind::Node).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(stats.parsed, 1);
        assert_eq!(stats.dropped, 4);
    }

    #[test]
    fn test_naive_timestamp_is_fatal() {
        let line = r#"{"timestamp":"2025-01-29T13:43:37.792","msg":"node metrics","node":"n1","cpu_percentage":0.1,"memory_percentage":0.2}"#;
        let err = parse_metric_lines([line], MetricLineKind::Node).unwrap_err();
        assert!(matches!(err, AnalysisError::UnnormalizedTimestamp { .. }));
    }

    #[test]
    fn test_completion_csv_with_header_and_nanos() {
        let lines = [
            "event_id,timestamp",
            "7304328921599469878,2025-01-29T13:43:37.792661715Z",
            "bad row without comma timestamp",
        ];
        let (completions, stats) = parse_completion_lines(lines).unwrap();
        assert_eq!(completions.len(), 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(completions[0].event_id, "7304328921599469878");
        assert_eq!(completions[0].timestamp.nanosecond(), 792_661_715);
    }

    #[test]
    fn test_offset_timestamps_normalized_to_utc() {
        let lines = ["1,2025-01-29T14:43:37.792+01:00"];
        let (completions, _) = parse_completion_lines(lines).unwrap();
        assert_eq!(completions[0].timestamp.hour(), 13);
    }

    #[test]
    fn test_request_lines_with_numeric_ids() {
        let lines = [
            r#"{"timestamp":"2025-01-29T13:43:37Z","experiment_id":3,"status":200,"ttfb":12.5,"event_id":"42"}"#,
            r#"{"timestamp":"2025-01-29T13:43:38Z","experiment_id":"3","status":"500","ttfb":99.0}"#,
        ];
        let (requests, stats) = parse_request_lines(lines).unwrap();
        assert_eq!(stats.parsed, 2);
        assert_eq!(requests[0].experiment_id, "3");
        assert_eq!(requests[0].status, "200");
        assert_eq!(requests[0].event_id.as_deref(), Some("42"));
        assert!(requests[1].event_id.is_none());
    }

    #[test]
    fn test_experiment_lines() {
        let lines = [
            r#"{"id":1,"triggers":4}"#,
            r#"{"experiment_id":"2","trigger_count":8}"#,
            "nope",
        ];
        let (configs, stats) = parse_experiment_lines(lines);
        assert_eq!(configs.len(), 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(configs[0].trigger_count, 4);
        assert_eq!(configs[1].experiment_id, "2");
    }
}
