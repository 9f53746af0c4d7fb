//! CLI subcommand implementations.

pub mod document;
pub mod migrate;
pub mod seed;
