//! Process-related modules: discovery, PSS sampling and sample sources.
//!
//! This module provides:
//! - `memory`: PSS parsing from /proc/<pid>/smaps(_rollup)
//! - `scanner`: Process discovery, exe link and cmdline reading
//! - `source`: The `ProcessSource` seam and the live /proc implementation
//! - `snapshot`: Recorded samples for deterministic replay

pub mod memory;
pub mod scanner;
pub mod snapshot;
pub mod source;

// Re-export commonly used types
pub use memory::{read_pss, BufferConfig};
pub use scanner::{collect_proc_entries, ProcEntry, DEFAULT_CMDLINE_MAX_LEN, DEFAULT_PROC_ROOT};
pub use snapshot::{Snapshot, SnapshotError, SnapshotSource};
pub use source::{ProcFs, ProcessSample, ProcessSource};
