//! CLI subcommands

pub mod agent;
pub mod translate;
