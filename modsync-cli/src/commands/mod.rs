//! CLI subcommand implementations.

pub mod enabled;
pub mod join;
pub mod library;
