//! In-memory time series store
//!
//! Holds the three observation families sorted by timestamp at construction
//! and read-only thereafter. Selection and grouping are generic over the
//! [`Observation`] trait so per-node and per-pod views come from the same
//! code path.

use crate::models::{Dimension, EventCompletion, Observation, RequestSample, ResourceSample};
use std::collections::BTreeMap;

/// Conjunctive dimension filters: every (key, value) pair must match.
pub type DimensionFilters = Vec<(Dimension, String)>;

fn matches_filters<T: Observation>(obs: &T, filters: &[(Dimension, String)]) -> bool {
    filters
        .iter()
        .all(|(key, value)| obs.dimension(*key) == Some(value.as_str()))
}

/// All observations matching every supplied filter, in timestamp order
/// (assuming `table` is already timestamp-sorted, as store slices are).
pub fn select<'a, T: Observation>(
    table: &'a [T],
    filters: &[(Dimension, String)],
) -> Vec<&'a T> {
    table
        .iter()
        .filter(|obs| matches_filters(*obs, filters))
        .collect()
}

/// Group a timestamp-sorted table by one dimension value.
///
/// Observations not carrying the dimension are omitted. Each group preserves
/// timestamp order.
pub fn group_by<'a, T: Observation>(
    table: &'a [T],
    dimension: Dimension,
) -> BTreeMap<String, Vec<&'a T>> {
    let mut groups: BTreeMap<String, Vec<&'a T>> = BTreeMap::new();
    for obs in table {
        if let Some(value) = obs.dimension(dimension) {
            groups.entry(value.to_string()).or_default().push(obs);
        }
    }
    groups
}

/// Immutable snapshot of one pipeline run's observations
#[derive(Debug, Default)]
pub struct SeriesStore {
    requests: Vec<RequestSample>,
    completions: Vec<EventCompletion>,
    resources: Vec<ResourceSample>,
}

impl SeriesStore {
    pub fn new(
        mut requests: Vec<RequestSample>,
        mut completions: Vec<EventCompletion>,
        mut resources: Vec<ResourceSample>,
    ) -> Self {
        requests.sort_by_key(|r| r.timestamp);
        completions.sort_by_key(|c| c.timestamp);
        resources.sort_by_key(|r| r.timestamp);
        Self {
            requests,
            completions,
            resources,
        }
    }

    /// Request samples in timestamp order
    pub fn requests(&self) -> &[RequestSample] {
        &self.requests
    }

    /// Event completions in timestamp order
    pub fn completions(&self) -> &[EventCompletion] {
        &self.completions
    }

    /// Resource samples in timestamp order
    pub fn resources(&self) -> &[ResourceSample] {
        &self.resources
    }
}
