//! Where process samples come from: live /proc or a recorded snapshot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::process::memory::{read_pss, BufferConfig};
use crate::process::scanner::{
    collect_proc_entries, read_cmdline, read_exe, DEFAULT_CMDLINE_MAX_LEN, DEFAULT_PROC_ROOT,
};

/// One observed process at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    /// Resolved executable path; empty if the link could not be read.
    pub exe: String,
    /// Bounded command line summary.
    pub cmdline: String,
    pub pss_bytes: u64,
}

/// Lists processes and samples them. Implementations are shared across
/// sampling threads.
pub trait ProcessSource: Sync {
    /// Process identifiers alive at enumeration time.
    fn pids(&self) -> Vec<u32>;

    /// Samples one process. Anything unreadable is reported as empty/zero.
    fn sample(&self, pid: u32) -> ProcessSample;
}

/// Live processes under a proc filesystem root.
#[derive(Debug, Clone)]
pub struct ProcFs {
    pub root: PathBuf,
    pub buffers: BufferConfig,
    pub cmdline_max_len: usize,
    pub max_processes: Option<usize>,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_PROC_ROOT),
            buffers: BufferConfig::default(),
            cmdline_max_len: DEFAULT_CMDLINE_MAX_LEN,
            max_processes: None,
        }
    }
}

impl ProcessSource for ProcFs {
    fn pids(&self) -> Vec<u32> {
        let entries = collect_proc_entries(&self.root, self.max_processes);
        debug!(
            "Collected {} process entries from {}",
            entries.len(),
            self.root.display()
        );
        entries.into_iter().map(|e| e.pid).collect()
    }

    fn sample(&self, pid: u32) -> ProcessSample {
        let proc_path = self.root.join(pid.to_string());

        let pss_bytes = match read_pss(&proc_path, &self.buffers) {
            Ok(v) => v,
            Err(e) => {
                debug!("No PSS for process {}: {}", pid, e);
                0
            }
        };

        ProcessSample {
            pid,
            exe: read_exe(&proc_path),
            cmdline: read_cmdline(&proc_path, self.cmdline_max_len),
            pss_bytes,
        }
    }
}
