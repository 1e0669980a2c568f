//! File -> owning packages index, built from all package manifests.
//!
//! The index is built once by [`build_index`] and is read-only afterwards;
//! lookups from many sampling threads share it through a plain `&` borrow.

use ahash::AHashMap as HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::manifest::{discover_manifests, read_manifest, PackageManifest};
use crate::pool::{PoolError, WorkerPool};

/// Initial capacity for the file map; a desktop install has a few hundred thousand files.
const INITIAL_FILE_CAPACITY: usize = 1024 * 256;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("cannot enumerate manifest directory {}: {source}", dir.display())]
    ManifestDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Maps an absolute file path to every package claiming it.
///
/// A package appears once per manifest line naming the path, so multiplicity
/// is preserved. Owner lists are sorted when the index is finished, which
/// makes the content independent of the order manifests were merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePackageIndex {
    files: HashMap<String, Vec<Arc<str>>>,
    manifests: usize,
}

impl FilePackageIndex {
    /// Builds an index sequentially from already-read manifests.
    pub fn from_manifests<I>(manifests: I) -> Self
    where
        I: IntoIterator<Item = PackageManifest>,
    {
        let mut index = Self::default();
        for m in manifests {
            index.merge(m);
        }
        index.finish()
    }

    /// Packages claiming `path`, possibly empty.
    pub fn packages_for(&self, path: &str) -> &[Arc<str>] {
        self.files.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct file paths.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of manifests merged, including empty/unreadable ones.
    pub fn manifest_count(&self) -> usize {
        self.manifests
    }

    fn merge(&mut self, manifest: PackageManifest) {
        self.manifests += 1;
        let pkg: Arc<str> = Arc::from(manifest.package_name);
        for file in manifest.files {
            self.files.entry(file).or_default().push(Arc::clone(&pkg));
        }
    }

    fn finish(mut self) -> Self {
        for owners in self.files.values_mut() {
            owners.sort_unstable();
        }
        self
    }
}

/// Discovers every manifest in `dir` and merges them on `pool`.
///
/// Workers read manifests in parallel; a single aggregator merges them into
/// the index. Per-manifest read failures are tolerated (the manifest simply
/// contributes no files); failing to list `dir` is fatal.
#[instrument(skip(pool), fields(workers = pool.workers()))]
pub fn build_index(
    dir: &Path,
    suffix: &str,
    pool: &WorkerPool,
) -> Result<FilePackageIndex, IndexError> {
    let start = Instant::now();
    let manifests = discover_manifests(dir, suffix)?;
    let manifest_count = manifests.len();

    let init = FilePackageIndex {
        files: HashMap::with_capacity(INITIAL_FILE_CAPACITY),
        manifests: 0,
    };

    let index = pool
        .fan_in(
            manifests,
            |path| read_manifest(&path, suffix),
            init,
            FilePackageIndex::merge,
        )?
        .finish();

    info!(
        "Indexed {} files from {} manifests in {:.2}ms",
        index.len(),
        manifest_count,
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(pkg: &str, files: &[&str]) -> PackageManifest {
        PackageManifest {
            package_name: pkg.to_string(),
            files: files.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn names(owners: &[Arc<str>]) -> Vec<&str> {
        owners.iter().map(|p| p.as_ref()).collect()
    }

    #[test]
    fn test_disjoint_manifests() {
        let index = FilePackageIndex::from_manifests(vec![
            manifest("bash", &["/bin/bash", "/etc/bash.bashrc"]),
            manifest("coreutils", &["/bin/ls"]),
        ]);

        assert_eq!(names(index.packages_for("/bin/bash")), vec!["bash"]);
        assert_eq!(names(index.packages_for("/etc/bash.bashrc")), vec!["bash"]);
        assert_eq!(names(index.packages_for("/bin/ls")), vec!["coreutils"]);
        assert!(index.packages_for("/bin/zsh").is_empty());
        assert_eq!(index.len(), 3);
        assert_eq!(index.manifest_count(), 2);
    }

    #[test]
    fn test_shared_file_lists_both_packages() {
        let index = FilePackageIndex::from_manifests(vec![
            manifest("b", &["/usr/share/doc"]),
            manifest("a", &["/usr/share/doc"]),
        ]);
        assert_eq!(names(index.packages_for("/usr/share/doc")), vec!["a", "b"]);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let m = vec![
            manifest("a", &["/x", "/y"]),
            manifest("b", &["/x"]),
            manifest("c", &["/y", "/z"]),
        ];
        let mut reversed = m.clone();
        reversed.reverse();

        assert_eq!(
            FilePackageIndex::from_manifests(m),
            FilePackageIndex::from_manifests(reversed)
        );
    }

    #[test]
    fn test_empty_manifest_still_counted() {
        let index = FilePackageIndex::from_manifests(vec![manifest("empty", &[])]);
        assert!(index.is_empty());
        assert_eq!(index.manifest_count(), 1);
    }
}
