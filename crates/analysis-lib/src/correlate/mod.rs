//! Multi-source temporal correlation
//!
//! Two independent join algorithms: an identity join pairing each event
//! completion with the request that triggered it, and a closed-range time
//! window associating resource samples with an experiment's observed span.
//! Unmatched identifiers are normal for an asynchronous workload and are
//! only counted; duplicate identifiers and negative durations are integrity
//! faults that ride alongside the result as diagnostics.

use crate::errors::{AnalysisError, Result};
use crate::models::{
    Dimension, EventCompletion, JoinedEventRecord, Observation, RequestSample, ResourceSample,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// An event id matched by more than one request or completion.
///
/// The engine never guesses which match is correct; the id produces no
/// joined record.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateKeyFault {
    pub event_id: String,
    pub request_matches: usize,
    pub completion_matches: usize,
}

/// Integrity faults and exclusions observed during the identity join
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinDiagnostics {
    /// Completions with no observed request (truncated window etc.)
    pub unmatched_completions: usize,
    pub duplicate_keys: Vec<DuplicateKeyFault>,
    /// Records whose derived duration is negative (clock skew or mis-paired
    /// id); excluded from statistics but retained here
    pub negative_durations: Vec<JoinedEventRecord>,
}

impl JoinDiagnostics {
    pub fn fault_count(&self) -> usize {
        self.duplicate_keys.len() + self.negative_durations.len()
    }
}

/// Result of the identity join: clean records plus diagnostics
#[derive(Debug, Clone, Default)]
pub struct EventCorrelation {
    /// One record per unambiguous, non-negative (request, completion) pair,
    /// ordered by request timestamp
    pub records: Vec<JoinedEventRecord>,
    pub diagnostics: JoinDiagnostics,
}

/// Identity join: pair each completion with the request sharing its event id.
///
/// `experiments` maps experiment id to its configured trigger count; a
/// matched request whose experiment is absent is a fatal configuration
/// error, since the joined record would lack a required attribute.
pub fn correlate_events(
    requests: &[RequestSample],
    completions: &[EventCompletion],
    experiments: &HashMap<String, u32>,
) -> Result<EventCorrelation> {
    let mut requests_by_event: HashMap<&str, Vec<&RequestSample>> = HashMap::new();
    for request in requests {
        if let Some(event_id) = request.event_id.as_deref() {
            requests_by_event.entry(event_id).or_default().push(request);
        }
    }

    let mut completions_by_event: HashMap<&str, Vec<&EventCompletion>> = HashMap::new();
    for completion in completions {
        completions_by_event
            .entry(completion.event_id.as_str())
            .or_default()
            .push(completion);
    }

    let mut out = EventCorrelation::default();

    for (event_id, matched_completions) in &completions_by_event {
        let Some(matched_requests) = requests_by_event.get(event_id) else {
            out.diagnostics.unmatched_completions += matched_completions.len();
            continue;
        };
        if matched_requests.len() > 1 || matched_completions.len() > 1 {
            out.diagnostics.duplicate_keys.push(DuplicateKeyFault {
                event_id: (*event_id).to_string(),
                request_matches: matched_requests.len(),
                completion_matches: matched_completions.len(),
            });
            continue;
        }
        let request = matched_requests[0];
        let completion = matched_completions[0];
        let trigger_count = *experiments.get(&request.experiment_id).ok_or_else(|| {
            AnalysisError::UnknownExperiment {
                experiment_id: request.experiment_id.clone(),
            }
        })?;
        let record = JoinedEventRecord::new(
            request.experiment_id.clone(),
            (*event_id).to_string(),
            request.timestamp,
            completion.timestamp,
            trigger_count,
        );
        if record.processing_seconds < 0.0 {
            tracing::warn!(
                event_id = %record.event_id,
                seconds = record.processing_seconds,
                "negative processing duration, excluding from statistics"
            );
            out.diagnostics.negative_durations.push(record);
        } else {
            out.records.push(record);
        }
    }

    // Hash-map iteration order is arbitrary; downstream windowing needs
    // timestamp order within each grouped series.
    out.records.sort_by_key(|r| r.request_timestamp);
    out.diagnostics
        .negative_durations
        .sort_by_key(|r| r.request_timestamp);
    out.diagnostics
        .duplicate_keys
        .sort_by(|a, b| a.event_id.cmp(&b.event_id));

    Ok(out)
}

/// Observed span of a set of joined records:
/// [min request timestamp, max completion timestamp].
pub fn experiment_span(records: &[JoinedEventRecord]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = records.iter().map(|r| r.request_timestamp).min()?;
    let end = records.iter().map(|r| r.completion_timestamp).max()?;
    Some((start, end))
}

/// Resource samples within a closed time span matching every dimension
/// filter. Boundary timestamps equal to span edges are included.
pub fn resources_in_span<'a>(
    samples: &'a [ResourceSample],
    span: (DateTime<Utc>, DateTime<Utc>),
    filters: &[(Dimension, String)],
) -> Vec<&'a ResourceSample> {
    let (start, end) = span;
    samples
        .iter()
        .filter(|s| s.timestamp >= start && s.timestamp <= end)
        .filter(|s| {
            filters
                .iter()
                .all(|(key, value)| s.dimension(*key) == Some(value.as_str()))
        })
        .collect()
}

/// The node whose samples include the given dimension value, e.g. the node
/// hosting the `eventing-controller` container. Used to build the external
/// node filter for window association.
pub fn node_hosting<'a>(
    samples: &'a [ResourceSample],
    dimension: Dimension,
    value: &str,
) -> Option<&'a str> {
    samples
        .iter()
        .find(|s| s.dimension(dimension) == Some(value))
        .map(|s| s.node.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn request(event_id: &str, millis: i64) -> RequestSample {
        RequestSample {
            timestamp: at(millis),
            experiment_id: "1".to_string(),
            status: "200".to_string(),
            latency_ms: 5.0,
            event_id: Some(event_id.to_string()),
        }
    }

    fn completion(event_id: &str, millis: i64) -> EventCompletion {
        EventCompletion {
            event_id: event_id.to_string(),
            timestamp: at(millis),
        }
    }

    fn experiments() -> HashMap<String, u32> {
        HashMap::from([("1".to_string(), 4)])
    }

    #[test]
    fn test_basic_pair_duration() {
        let out = correlate_events(
            &[request("A", 10_000)],
            &[completion("A", 10_250)],
            &experiments(),
        )
        .unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].processing_seconds, 0.250);
        assert_eq!(out.records[0].trigger_count, 4);
        assert_eq!(out.diagnostics.fault_count(), 0);
    }

    #[test]
    fn test_unmatched_completion_tolerated() {
        let out = correlate_events(
            &[request("A", 10_000)],
            &[completion("A", 10_100), completion("Z", 10_200)],
            &experiments(),
        )
        .unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.diagnostics.unmatched_completions, 1);
    }

    #[test]
    fn test_duplicate_requests_produce_no_record() {
        let out = correlate_events(
            &[request("A", 10_000), request("A", 10_050)],
            &[completion("A", 10_250)],
            &experiments(),
        )
        .unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.diagnostics.duplicate_keys.len(), 1);
        let fault = &out.diagnostics.duplicate_keys[0];
        assert_eq!(fault.event_id, "A");
        assert_eq!(fault.request_matches, 2);
        assert_eq!(fault.completion_matches, 1);
    }

    #[test]
    fn test_duplicate_completions_also_fault() {
        let out = correlate_events(
            &[request("A", 10_000)],
            &[completion("A", 10_250), completion("A", 10_300)],
            &experiments(),
        )
        .unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.diagnostics.duplicate_keys[0].completion_matches, 2);
    }

    #[test]
    fn test_negative_duration_flagged_and_excluded() {
        let out = correlate_events(
            &[request("A", 10_000), request("B", 10_000)],
            &[completion("A", 10_250), completion("B", 9_900)],
            &experiments(),
        )
        .unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].event_id, "A");
        assert_eq!(out.diagnostics.negative_durations.len(), 1);
        assert_eq!(out.diagnostics.negative_durations[0].event_id, "B");
        assert_eq!(
            out.diagnostics.negative_durations[0].processing_seconds,
            -0.100
        );
    }

    #[test]
    fn test_unknown_experiment_is_fatal() {
        let mut req = request("A", 10_000);
        req.experiment_id = "unknown".to_string();
        let err = correlate_events(&[req], &[completion("A", 10_250)], &experiments()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownExperiment { .. }));
    }

    #[test]
    fn test_records_ordered_by_request_timestamp() {
        let out = correlate_events(
            &[request("B", 12_000), request("A", 10_000)],
            &[completion("A", 10_250), completion("B", 12_250)],
            &experiments(),
        )
        .unwrap();
        assert_eq!(out.records[0].event_id, "A");
        assert_eq!(out.records[1].event_id, "B");
    }

    #[test]
    fn test_span_and_closed_range_window() {
        let out = correlate_events(
            &[request("A", 10_000), request("B", 11_000)],
            &[completion("A", 10_500), completion("B", 12_000)],
            &experiments(),
        )
        .unwrap();
        let span = experiment_span(&out.records).unwrap();
        assert_eq!(span, (at(10_000), at(12_000)));

        let mk = |millis: i64, node: &str| ResourceSample {
            timestamp: at(millis),
            node: node.to_string(),
            pod: None,
            container: None,
            namespace: None,
            cpu_fraction: 0.1,
            memory_fraction: 0.1,
            cpu_absolute: None,
            memory_absolute: None,
        };
        let samples = vec![
            mk(9_999, "n1"),
            mk(10_000, "n1"),
            mk(12_000, "n1"),
            mk(12_001, "n1"),
            mk(11_000, "n2"),
        ];
        let picked = resources_in_span(&samples, span, &[(Dimension::Node, "n1".to_string())]);
        // both boundaries inclusive, out-of-span and other-node rows excluded
        let times: Vec<i64> = picked.iter().map(|s| s.timestamp.timestamp_millis()).collect();
        assert_eq!(times, vec![10_000, 12_000]);
    }

    #[test]
    fn test_node_hosting_lookup() {
        let sample = ResourceSample {
            timestamp: at(0),
            node: "n7".to_string(),
            pod: Some("eventing-controller-abc".to_string()),
            container: Some("eventing-controller".to_string()),
            namespace: Some("knative-eventing".to_string()),
            cpu_fraction: 0.1,
            memory_fraction: 0.1,
            cpu_absolute: None,
            memory_absolute: None,
        };
        assert_eq!(
            node_hosting(&[sample], Dimension::Container, "eventing-controller"),
            Some("n7")
        );
        assert_eq!(node_hosting(&[], Dimension::Container, "whatever"), None);
    }

    #[test]
    fn test_empty_inputs() {
        let out = correlate_events(&[], &[], &experiments()).unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.diagnostics.fault_count(), 0);
        assert!(experiment_span(&out.records).is_none());
    }
}
