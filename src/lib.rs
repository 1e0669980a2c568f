//! dpkg-memstats library
//!
//! Attributes system memory (proportional set size) to the Debian packages
//! that installed the running executables.
//!
//! # Pipeline
//!
//! 1. [`index::build_index`] reads every dpkg file list in parallel and merges
//!    them into a read-only [`FilePackageIndex`].
//! 2. [`aggregate::aggregate`] samples every process, resolves its executable
//!    to owning packages with a [`Resolver`], and sums PSS per package.
//! 3. [`report`] renders the result as a table or JSON/YAML.
//!
//! Both parallel phases run on the same [`WorkerPool`]: bounded workers feeding
//! a single aggregating thread over a channel.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dpkg_memstats::{
//!     aggregate, build_index, render_table, ProcFs, Resolver, SharePolicy, TableOptions,
//!     WorkerPool,
//! };
//! use std::path::Path;
//!
//! let pool = WorkerPool::with_default_size()?;
//! let index = build_index(Path::new("/var/lib/dpkg/info"), ".list", &pool)?;
//! let resolver = Resolver::with_defaults(&index);
//! let report = aggregate(&ProcFs::default(), &resolver, &pool, SharePolicy::FairShare)?;
//!
//! print!("{}", render_table(&report, TableOptions::default()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregate;
pub mod attribution;
pub mod index;
pub mod manifest;
pub mod pool;
pub mod process;
pub mod report;

// Re-export main types for convenience
pub use aggregate::{aggregate, Aggregation, PackageUsage, ProcessShare, SharePolicy, UsageReport};
pub use attribution::{default_overrides, PathOverride, Resolver, UNATTRIBUTED};
pub use index::{build_index, FilePackageIndex, IndexError};
pub use manifest::{PackageManifest, DEFAULT_MANIFEST_DIR, DEFAULT_MANIFEST_SUFFIX};
pub use pool::{default_worker_count, PoolError, WorkerPool, MAX_WORKERS};
pub use process::{ProcFs, ProcessSample, ProcessSource, Snapshot, SnapshotError, SnapshotSource};
pub use report::{format_bytes, render_json, render_table, render_yaml, TableOptions};
