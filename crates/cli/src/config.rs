//! Environment-driven defaults for the CLI

use anyhow::Result;
use serde::Deserialize;

/// Defaults applied when flags are not given, overridable via `BENCH_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchConfig {
    /// Bucket width in milliseconds for bucket-mode series
    #[serde(default = "default_bucket_ms")]
    pub bucket_ms: i64,

    /// Point budget for downsample-mode series
    #[serde(default = "default_point_budget")]
    pub point_budget: usize,

    /// Container name used to discover the eventing-controller node
    #[serde(default = "default_controller_container")]
    pub controller_container: String,
}

fn default_bucket_ms() -> i64 {
    100
}

fn default_point_budget() -> usize {
    1000
}

fn default_controller_container() -> String {
    "eventing-controller".to_string()
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            bucket_ms: default_bucket_ms(),
            point_budget: default_point_budget(),
            controller_container: default_controller_container(),
        }
    }
}

impl BenchConfig {
    /// Load defaults from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("BENCH"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}
