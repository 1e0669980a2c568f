//! Per-package memory aggregation over all sampled processes.

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::attribution::Resolver;
use crate::pool::{PoolError, WorkerPool};
use crate::process::{ProcessSample, ProcessSource};

/// How a process's PSS is charged when several packages own its executable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SharePolicy {
    /// Each of N owners is charged `pss / N` (integer division).
    #[default]
    FairShare,
    /// Each owner is charged the full `pss`; totals double-count shared executables.
    FullCharge,
}

impl SharePolicy {
    /// Bytes charged to each one of `owners` packages.
    pub fn share(self, pss_bytes: u64, owners: usize) -> u64 {
        match self {
            SharePolicy::FairShare => pss_bytes / owners.max(1) as u64,
            SharePolicy::FullCharge => pss_bytes,
        }
    }
}

/// One process as charged to one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessShare {
    #[serde(flatten)]
    pub sample: ProcessSample,
    /// Part of `sample.pss_bytes` charged to this package.
    pub attributed_bytes: u64,
}

/// Final memory usage of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageUsage {
    pub package: String,
    pub total_bytes: u64,
    /// Ascending by attributed bytes, then pid.
    pub processes: Vec<ProcessShare>,
}

/// Finished aggregation, packages ascending by total (then name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub packages: Vec<PackageUsage>,
    pub processes_sampled: usize,
    pub processes_attributed: usize,
}

impl UsageReport {
    pub fn total_bytes(&self) -> u64 {
        self.packages.iter().map(|p| p.total_bytes).sum()
    }

    pub fn package(&self, name: &str) -> Option<&PackageUsage> {
        self.packages.iter().find(|p| p.package == name)
    }
}

/// Mutable accumulator owned by the single aggregating thread.
#[derive(Debug, Default)]
pub struct Aggregation {
    policy: SharePolicy,
    packages: HashMap<Arc<str>, HashMap<u32, ProcessShare>>,
    sampled: usize,
    attributed: HashSet<u32>,
}

impl Aggregation {
    pub fn new(policy: SharePolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Charges `sample` to each of `owners` per the share policy.
    ///
    /// Zero-PSS samples (including unreadable ones) are dropped. A pid seen
    /// again for the same package replaces its earlier share.
    pub fn record(&mut self, sample: ProcessSample, owners: &[Arc<str>]) {
        self.sampled += 1;
        if sample.pss_bytes == 0 || owners.is_empty() {
            debug!("Skipping process {}: no memory sampled", sample.pid);
            return;
        }

        let share = self.policy.share(sample.pss_bytes, owners.len());
        if share == 0 {
            return;
        }
        self.attributed.insert(sample.pid);
        for pkg in owners {
            self.packages.entry(Arc::clone(pkg)).or_default().insert(
                sample.pid,
                ProcessShare {
                    sample: sample.clone(),
                    attributed_bytes: share,
                },
            );
        }
    }

    /// Sums and orders everything recorded so far.
    pub fn finish(self) -> UsageReport {
        let mut packages: Vec<PackageUsage> = self
            .packages
            .into_iter()
            .map(|(pkg, procs)| {
                let mut processes: Vec<ProcessShare> = procs.into_values().collect();
                processes.sort_by(|a, b| {
                    a.attributed_bytes
                        .cmp(&b.attributed_bytes)
                        .then(a.sample.pid.cmp(&b.sample.pid))
                });
                PackageUsage {
                    package: pkg.to_string(),
                    total_bytes: processes.iter().map(|p| p.attributed_bytes).sum(),
                    processes,
                }
            })
            .collect();
        packages.sort_by(|a, b| {
            a.total_bytes
                .cmp(&b.total_bytes)
                .then_with(|| a.package.cmp(&b.package))
        });

        UsageReport {
            packages,
            processes_sampled: self.sampled,
            processes_attributed: self.attributed.len(),
        }
    }
}

/// Samples every process of `source` on `pool`, resolves owners with
/// `resolver`, and aggregates per package.
#[instrument(skip_all, fields(workers = pool.workers(), policy = ?policy))]
pub fn aggregate<S: ProcessSource>(
    source: &S,
    resolver: &Resolver<'_>,
    pool: &WorkerPool,
    policy: SharePolicy,
) -> Result<UsageReport, PoolError> {
    let start = Instant::now();
    let pids = source.pids();
    let count = pids.len();

    let report = pool
        .fan_in(
            pids,
            |pid| {
                let sample = source.sample(pid);
                let owners = resolver.resolve(&sample.exe);
                (sample, owners)
            },
            Aggregation::new(policy),
            |agg, (sample, owners)| agg.record(sample, &owners),
        )?
        .finish();

    info!(
        "Sampled {} processes ({} with memory) into {} packages in {:.2}ms",
        count,
        report.processes_attributed,
        report.packages.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pid: u32, exe: &str, pss: u64) -> ProcessSample {
        ProcessSample {
            pid,
            exe: exe.to_string(),
            cmdline: String::new(),
            pss_bytes: pss,
        }
    }

    fn owners(names: &[&str]) -> Vec<Arc<str>> {
        names.iter().map(|n| Arc::from(*n)).collect()
    }

    #[test]
    fn test_share_policy() {
        assert_eq!(SharePolicy::FairShare.share(300_000, 3), 100_000);
        assert_eq!(SharePolicy::FairShare.share(10, 3), 3);
        assert_eq!(SharePolicy::FairShare.share(10, 0), 10);
        assert_eq!(SharePolicy::FullCharge.share(300_000, 3), 300_000);
    }

    #[test]
    fn test_fair_share_split_across_three() {
        let mut agg = Aggregation::new(SharePolicy::FairShare);
        agg.record(sample(1, "/bin/x", 300_000), &owners(&["a", "b", "c"]));
        let report = agg.finish();

        assert_eq!(report.packages.len(), 3);
        for p in &report.packages {
            assert_eq!(p.total_bytes, 100_000);
        }
        assert_eq!(report.total_bytes(), 300_000);
    }

    #[test]
    fn test_full_charge_counts_everywhere() {
        let mut agg = Aggregation::new(SharePolicy::FullCharge);
        agg.record(sample(1, "/bin/x", 300_000), &owners(&["a", "b"]));
        let report = agg.finish();
        assert_eq!(report.package("a").unwrap().total_bytes, 300_000);
        assert_eq!(report.package("b").unwrap().total_bytes, 300_000);
    }

    #[test]
    fn test_zero_pss_is_excluded() {
        let mut agg = Aggregation::new(SharePolicy::FairShare);
        agg.record(sample(1, "/bin/x", 0), &owners(&["a"]));
        let report = agg.finish();
        assert!(report.packages.is_empty());
        assert_eq!(report.processes_sampled, 1);
        assert_eq!(report.processes_attributed, 0);
    }

    #[test]
    fn test_same_pid_replaces_previous_share() {
        let mut agg = Aggregation::new(SharePolicy::FairShare);
        agg.record(sample(7, "/bin/x", 1000), &owners(&["a"]));
        agg.record(sample(7, "/bin/x", 4000), &owners(&["a"]));
        let report = agg.finish();

        let a = report.package("a").unwrap();
        assert_eq!(a.processes.len(), 1);
        assert_eq!(a.total_bytes, 4000);
        assert_eq!(report.processes_sampled, 2);
        assert_eq!(report.processes_attributed, 1);
    }

    #[test]
    fn test_share_rounding_to_zero_is_not_attributed() {
        let mut agg = Aggregation::new(SharePolicy::FairShare);
        agg.record(sample(1, "/bin/x", 2), &owners(&["a", "b", "c"]));
        agg.record(sample(2, "/bin/y", 9), &owners(&["a", "b", "c"]));
        let report = agg.finish();

        assert_eq!(report.processes_sampled, 2);
        assert_eq!(report.processes_attributed, 1);
        assert_eq!(report.total_bytes(), 9);
    }

    #[test]
    fn test_ordering_is_ascending() {
        let mut agg = Aggregation::new(SharePolicy::FairShare);
        agg.record(sample(1, "/bin/x", 500), &owners(&["big"]));
        agg.record(sample(2, "/bin/x", 100), &owners(&["big"]));
        agg.record(sample(3, "/bin/y", 50), &owners(&["small"]));
        agg.record(sample(4, "/bin/z", 50), &owners(&["also-small"]));
        let report = agg.finish();

        let names: Vec<&str> = report.packages.iter().map(|p| p.package.as_str()).collect();
        assert_eq!(names, vec!["also-small", "small", "big"]);

        let big: Vec<u32> = report.packages[2]
            .processes
            .iter()
            .map(|p| p.sample.pid)
            .collect();
        assert_eq!(big, vec![2, 1]);
    }
}
