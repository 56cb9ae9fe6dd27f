//! CLI subcommand implementations.

pub mod cache;
pub mod ids;
pub mod stats;
