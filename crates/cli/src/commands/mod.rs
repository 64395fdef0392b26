//! CLI subcommand implementations

pub mod latency;
pub mod resources;
pub mod summary;
