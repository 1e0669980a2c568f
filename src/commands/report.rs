//! Report command implementation.
//!
//! Builds the package index, samples every process and prints memory per package.

use anyhow::{Context, Result};
use chrono::Utc;
use dpkg_memstats::{
    aggregate, build_index, render_json, render_table, render_yaml, FilePackageIndex,
    ProcessSource, Resolver, Snapshot, SnapshotSource, TableOptions, UsageReport, WorkerPool,
};
use nix::unistd::geteuid;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cli::OutputFormat;
use crate::config::Config;

/// Presentation flags for the report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub verbose: bool,
    pub format: OutputFormat,
    pub top: Option<usize>,
    pub profile: Option<PathBuf>,
}

/// Phase timings written by `--profile`.
#[derive(Debug, Serialize)]
struct RunProfile {
    started_at: String,
    index_workers: usize,
    index_duration_ms: f64,
    manifests: usize,
    files_indexed: usize,
    sampling_workers: usize,
    sampling_duration_ms: f64,
    processes_sampled: usize,
    processes_attributed: usize,
    packages: usize,
    total_bytes: u64,
}

/// Builds the file -> package index with the configured manifest settings.
pub fn load_index(config: &Config) -> Result<FilePackageIndex> {
    let pool = WorkerPool::new(config.index_workers()).context("failed to start index workers")?;
    let dir = config.manifest_dir();
    let index = build_index(&dir, config.manifest_suffix(), &pool)
        .context("failed to build the package file index")?;
    Ok(index)
}

/// Samples processes from `source` and aggregates them against `index`.
pub fn collect_usage<S: ProcessSource>(
    source: &S,
    index: &FilePackageIndex,
    config: &Config,
) -> Result<UsageReport> {
    let overrides = config.overrides();
    let resolver = Resolver::new(index, &overrides, config.unattributed_label());
    let pool =
        WorkerPool::new(config.sampling_workers()).context("failed to start sampling workers")?;
    let report = aggregate(source, &resolver, &pool, config.share_policy())
        .context("failed to aggregate process samples")?;
    Ok(report)
}

/// Produces the usage report from /proc or the configured snapshot.
fn run_sampling(index: &FilePackageIndex, config: &Config) -> Result<UsageReport> {
    match &config.snapshot_file {
        Some(path) => {
            info!("Using process samples from snapshot: {}", path.display());
            let snapshot = Snapshot::load(path)?;
            collect_usage(&SnapshotSource::from(snapshot), index, config)
        }
        None => {
            if !geteuid().is_root() {
                warn!("Not running as root - processes of other users will count as zero");
            }
            collect_usage(&config.proc_fs(), index, config)
        }
    }
}

fn write_profile(path: &Path, profile: &RunProfile) -> Result<()> {
    let content = serde_json::to_string_pretty(profile)?;
    fs::write(path, content)
        .with_context(|| format!("failed to write profile to {}", path.display()))?;
    debug!("Profile written to {}", path.display());
    Ok(())
}

/// Runs the full pipeline and prints the report to stdout.
pub fn command_report(opts: &ReportOptions, config: &Config) -> Result<()> {
    let started_at = Utc::now().to_rfc3339();

    let index_start = Instant::now();
    let index = load_index(config)?;
    let index_duration_ms = index_start.elapsed().as_secs_f64() * 1000.0;

    let sampling_start = Instant::now();
    let report = run_sampling(&index, config)?;
    let sampling_duration_ms = sampling_start.elapsed().as_secs_f64() * 1000.0;

    let output = match opts.format {
        OutputFormat::Table => render_table(
            &report,
            TableOptions {
                verbose: opts.verbose,
                top: opts.top,
            },
        ),
        OutputFormat::Json => render_json(&report, opts.top)? + "\n",
        OutputFormat::Yaml => render_yaml(&report, opts.top)?,
    };
    print!("{}", output);

    if let Some(path) = &opts.profile {
        let profile = RunProfile {
            started_at,
            index_workers: config.index_workers(),
            index_duration_ms,
            manifests: index.manifest_count(),
            files_indexed: index.len(),
            sampling_workers: config.sampling_workers(),
            sampling_duration_ms,
            processes_sampled: report.processes_sampled,
            processes_attributed: report.processes_attributed,
            packages: report.packages.len(),
            total_bytes: report.total_bytes(),
        };
        write_profile(path, &profile)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpkg_memstats::ProcessSample;

    fn write_manifests(dir: &Path, manifests: &[(&str, &str)]) {
        for (name, content) in manifests {
            fs::write(dir.join(format!("{name}.list")), content).unwrap();
        }
    }

    #[test]
    fn test_collect_usage_with_config() {
        let dir = tempfile::tempdir().unwrap();
        write_manifests(dir.path(), &[("vim", "/usr/bin/vim\n")]);

        let mut config = Config::default();
        config.manifest_dir = Some(dir.path().to_path_buf());
        config.unattributed_label = Some("unowned".into());
        config.index_workers = Some(2);
        config.sampling_workers = Some(2);

        let index = load_index(&config).unwrap();
        let source = SnapshotSource::from_samples(vec![
            ProcessSample {
                pid: 10,
                exe: "/bin/vim".into(),
                cmdline: "vim".into(),
                pss_bytes: 4096,
            },
            ProcessSample {
                pid: 11,
                exe: "/opt/x".into(),
                cmdline: "x".into(),
                pss_bytes: 1024,
            },
        ]);
        let report = collect_usage(&source, &index, &config).unwrap();

        assert_eq!(report.package("vim").unwrap().total_bytes, 4096);
        assert_eq!(report.package("unowned").unwrap().total_bytes, 1024);
    }

    #[test]
    fn test_load_index_missing_dir_fails() {
        let mut config = Config::default();
        config.manifest_dir = Some(PathBuf::from("/nonexistent/dpkg/info"));
        assert!(load_index(&config).is_err());
    }

    #[test]
    fn test_command_report_writes_profile() {
        let dir = tempfile::tempdir().unwrap();
        let manifests = dir.path().join("info");
        fs::create_dir(&manifests).unwrap();
        write_manifests(&manifests, &[("bash", "/bin/bash\n")]);

        let snapshot_path = dir.path().join("snap.json");
        Snapshot::new(vec![ProcessSample {
            pid: 1,
            exe: "/usr/bin/bash".into(),
            cmdline: "-bash".into(),
            pss_bytes: 2048,
        }])
        .save(&snapshot_path)
        .unwrap();

        let mut config = Config::default();
        config.manifest_dir = Some(manifests);
        config.snapshot_file = Some(snapshot_path);

        let profile_path = dir.path().join("profile.json");
        let opts = ReportOptions {
            verbose: true,
            format: OutputFormat::Table,
            top: None,
            profile: Some(profile_path.clone()),
        };
        command_report(&opts, &config).unwrap();

        let profile: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&profile_path).unwrap()).unwrap();
        assert_eq!(profile["manifests"], 1);
        assert_eq!(profile["packages"], 1);
        assert_eq!(profile["total_bytes"], 2048);
    }
}
