//! Grouped statistics and series transforms
//!
//! Three distinct series operations are kept available because callers pick
//! one per use: fixed-width bucket resampling (wall-clock aligned means),
//! rolling means (per-sample smoothing), and uniform downsampling (pure
//! thinning for display, never an aggregation). All duration arithmetic is
//! f64 seconds; rounding happens only at the presentation layer.

use crate::errors::{AnalysisError, Result};
use crate::models::{
    ExperimentAggregate, JoinedEventRecord, LatencySummary, RequestSample, SeriesPoint,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divisor n)
fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Sample standard deviation (divisor n-1), as the relational describe()
/// output reports it
fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Per-experiment summary statistics over processing durations.
///
/// `events_per_second` is count over the group's wall-clock span and is
/// omitted entirely when the span is zero or the group holds fewer than two
/// records.
pub fn aggregate_experiments(records: &[JoinedEventRecord]) -> Vec<ExperimentAggregate> {
    let mut groups: BTreeMap<&str, Vec<&JoinedEventRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.experiment_id.as_str())
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|(experiment_id, group)| {
            let durations: Vec<f64> = group.iter().map(|r| r.processing_seconds).collect();
            let mean_seconds = mean(&durations);
            let start = group.iter().map(|r| r.request_timestamp).min();
            let end = group.iter().map(|r| r.completion_timestamp).max();
            let events_per_second = start.zip(end).and_then(|(start, end)| {
                let span_seconds = (end - start)
                    .num_microseconds()
                    .map_or(0.0, |us| us as f64 / 1e6);
                if span_seconds > 0.0 && durations.len() >= 2 {
                    Some(durations.len() as f64 / span_seconds)
                } else {
                    None
                }
            });
            ExperimentAggregate {
                experiment_id: experiment_id.to_string(),
                trigger_count: group[0].trigger_count,
                count: durations.len(),
                mean_seconds,
                std_seconds: population_std(&durations, mean_seconds),
                min_seconds: durations.iter().copied().fold(f64::INFINITY, f64::min),
                max_seconds: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                events_per_second,
            }
        })
        .collect()
}

/// Per-(experiment, status) latency summary over request samples
pub fn summarize_latency(
    requests: &[RequestSample],
    experiments: &HashMap<String, u32>,
) -> Result<Vec<LatencySummary>> {
    let mut groups: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for request in requests {
        groups
            .entry((request.experiment_id.as_str(), request.status.as_str()))
            .or_default()
            .push(request.latency_ms);
    }

    let mut summaries = Vec::with_capacity(groups.len());
    for ((experiment_id, status), mut values) in groups {
        let trigger_count = *experiments.get(experiment_id).ok_or_else(|| {
            AnalysisError::UnknownExperiment {
                experiment_id: experiment_id.to_string(),
            }
        })?;
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mean_ms = mean(&values);
        summaries.push(LatencySummary {
            experiment_id: experiment_id.to_string(),
            trigger_count,
            status: status.to_string(),
            count: values.len(),
            mean_ms,
            std_ms: sample_std(&values, mean_ms),
            min_ms: *values.first().unwrap_or(&0.0),
            median_ms: median_of_sorted(&values),
            max_ms: *values.last().unwrap_or(&0.0),
        });
    }
    Ok(summaries)
}

/// Fixed-width bucket resample: mean per half-open, epoch-aligned interval.
///
/// Buckets with no samples produce no output point; no interpolation.
pub fn bucket_resample(points: &[SeriesPoint], width: Duration) -> Result<Vec<SeriesPoint>> {
    let width_us = width.num_microseconds().unwrap_or(0);
    if width_us <= 0 {
        return Err(AnalysisError::InvalidBucketWidth {
            millis: width.num_milliseconds(),
        });
    }

    let mut buckets: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for point in points {
        let ts_us = point.timestamp.timestamp_micros();
        let bucket_start = ts_us.div_euclid(width_us) * width_us;
        let entry = buckets.entry(bucket_start).or_insert((0.0, 0));
        entry.0 += point.value;
        entry.1 += 1;
    }

    Ok(buckets
        .into_iter()
        .map(|(start_us, (sum, count))| {
            SeriesPoint::new(
                DateTime::<Utc>::from_timestamp_micros(start_us)
                    .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC),
                sum / count as f64,
            )
        })
        .collect())
}

/// Rolling mean over a timestamp-sorted series: sliding window of `window`
/// samples, minimum one sample per position, one smoothed value per input
/// timestamp. Not bucketed; per-sample granularity is preserved.
pub fn rolling_mean(points: &[SeriesPoint], window: usize) -> Vec<SeriesPoint> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(points.len());
    let mut running_sum = 0.0;
    for (i, point) in points.iter().enumerate() {
        running_sum += point.value;
        if i >= window {
            running_sum -= points[i - window].value;
        }
        let filled = (i + 1).min(window);
        out.push(SeriesPoint::new(point.timestamp, running_sum / filled as f64));
    }
    out
}

/// Uniform downsample of a sorted series to roughly `target` points: keeps
/// every Nth row with `N = len / target` (minimum 1). Pure thinning; rows
/// are selected, never averaged.
pub fn downsample(points: &[SeriesPoint], target: usize) -> Result<Vec<SeriesPoint>> {
    if target == 0 {
        return Err(AnalysisError::InvalidPointBudget);
    }
    let step = (points.len() / target).max(1);
    Ok(points.iter().step_by(step).cloned().collect())
}

/// Window size representing roughly one second of data:
/// `round(1 / median_gap_seconds)` samples, minimum 1.
///
/// The series must be timestamp-sorted; with fewer than two points or a
/// zero median gap the window degenerates to a single sample.
pub fn derive_window_size(points: &[SeriesPoint]) -> usize {
    if points.len() < 2 {
        return 1;
    }
    let mut gaps: Vec<f64> = points
        .windows(2)
        .map(|pair| {
            (pair[1].timestamp - pair[0].timestamp)
                .num_microseconds()
                .map_or(0.0, |us| us as f64 / 1e6)
        })
        .collect();
    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_gap = median_of_sorted(&gaps);
    if median_gap <= 0.0 {
        return 1;
    }
    ((1.0 / median_gap).round() as usize).max(1)
}
