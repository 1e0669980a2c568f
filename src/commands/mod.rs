//! CLI command implementations for dpkg-memstats.
//!
//! This module provides implementations for the report and all CLI subcommands:
//! - `report`: Memory per package (default action)
//! - `check`: System validation
//! - `config`: Configuration file generation
//! - `owners`: Package lookup for individual paths
//! - `snapshot`: Process sample capture

pub mod check;
pub mod config;
pub mod owners;
pub mod report;
pub mod snapshot;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use owners::command_owners;
pub use report::{command_report, ReportOptions};
pub use snapshot::command_snapshot;
