//! Snapshot command implementation.
//!
//! Captures the current process samples to a JSON file for later replay.

use anyhow::{Context, Result};
use dpkg_memstats::{Snapshot, WorkerPool};
use std::path::Path;
use tracing::info;

use crate::config::Config;

pub fn command_snapshot(output: &Path, config: &Config) -> Result<()> {
    let pool =
        WorkerPool::new(config.sampling_workers()).context("failed to start sampling workers")?;
    let snapshot = Snapshot::capture(&config.proc_fs(), &pool)?;
    snapshot.save(output)?;

    info!("Snapshot written to {}", output.display());
    println!(
        "✅ Captured {} processes to: {}",
        snapshot.processes.len(),
        output.display()
    );
    Ok(())
}
