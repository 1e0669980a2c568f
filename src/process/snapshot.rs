//! Recorded process samples that can be replayed instead of live /proc.

use ahash::AHashMap as HashMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::pool::{PoolError, WorkerPool};
use crate::process::source::{ProcessSample, ProcessSource};

pub const SNAPSHOT_VERSION: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Root structure of a snapshot JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub captured_at: String,
    pub processes: Vec<ProcessSample>,
}

impl Snapshot {
    pub fn new(mut processes: Vec<ProcessSample>) -> Self {
        processes.sort_by_key(|p| p.pid);
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            captured_at: Utc::now().to_rfc3339(),
            processes,
        }
    }

    /// Samples every process of `source` on `pool`.
    pub fn capture<S: ProcessSource>(source: &S, pool: &WorkerPool) -> Result<Self, SnapshotError> {
        let pids = source.pids();
        let processes = pool.fan_in(
            pids,
            |pid| source.sample(pid),
            Vec::new(),
            |acc: &mut Vec<ProcessSample>, s| acc.push(s),
        )?;
        Ok(Self::new(processes))
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        debug!("Loading snapshot from: {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            "Loaded snapshot version {} captured at {} ({} processes)",
            snapshot.version,
            snapshot.captured_at,
            snapshot.processes.len()
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Replays a [`Snapshot`] through the [`ProcessSource`] interface.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    pids: Vec<u32>,
    by_pid: HashMap<u32, ProcessSample>,
}

impl From<Snapshot> for SnapshotSource {
    fn from(snapshot: Snapshot) -> Self {
        let pids = snapshot.processes.iter().map(|p| p.pid).collect();
        let by_pid = snapshot
            .processes
            .into_iter()
            .map(|p| (p.pid, p))
            .collect();
        Self { pids, by_pid }
    }
}

impl SnapshotSource {
    pub fn from_samples(samples: Vec<ProcessSample>) -> Self {
        Snapshot::new(samples).into()
    }
}

impl ProcessSource for SnapshotSource {
    fn pids(&self) -> Vec<u32> {
        self.pids.clone()
    }

    fn sample(&self, pid: u32) -> ProcessSample {
        self.by_pid.get(&pid).cloned().unwrap_or(ProcessSample {
            pid,
            exe: String::new(),
            cmdline: String::new(),
            pss_bytes: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pid: u32, exe: &str, pss: u64) -> ProcessSample {
        ProcessSample {
            pid,
            exe: exe.to_string(),
            cmdline: exe.to_string(),
            pss_bytes: pss,
        }
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");

        let snap = Snapshot::new(vec![sample(2, "/bin/b", 20), sample(1, "/bin/a", 10)]);
        snap.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snap);
        assert_eq!(loaded.processes[0].pid, 1);
    }

    #[test]
    fn test_snapshot_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            Snapshot::load(&missing),
            Err(SnapshotError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(Snapshot::load(&bad), Err(SnapshotError::Parse { .. })));
    }

    #[test]
    fn test_snapshot_source_unknown_pid_is_zero() {
        let source = SnapshotSource::from_samples(vec![sample(5, "/bin/x", 100)]);
        assert_eq!(source.pids(), vec![5]);
        assert_eq!(source.sample(5).pss_bytes, 100);
        assert_eq!(source.sample(6).pss_bytes, 0);
    }

    #[test]
    fn test_capture_from_source() {
        let source =
            SnapshotSource::from_samples(vec![sample(3, "/bin/c", 3), sample(1, "/bin/a", 1)]);
        let pool = WorkerPool::new(2).unwrap();
        let snap = Snapshot::capture(&source, &pool).unwrap();
        let pids: Vec<u32> = snap.processes.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 3]);
    }
}
