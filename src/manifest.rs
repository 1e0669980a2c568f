//! Package manifest reading and discovery.
//!
//! A manifest is one file per installed package (e.g. `/var/lib/dpkg/info/bash.list`)
//! holding one installed path per line. The package name is the file name with the
//! manifest suffix stripped.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::index::IndexError;

/// Default directory holding dpkg file lists.
pub const DEFAULT_MANIFEST_DIR: &str = "/var/lib/dpkg/info";
/// Default suffix of a dpkg file list.
pub const DEFAULT_MANIFEST_SUFFIX: &str = ".list";

/// Files installed by a single package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub package_name: String,
    pub files: Vec<String>,
}

/// Derives the package name from a manifest path: basename minus `suffix`.
pub fn package_name_for(path: &Path, suffix: &str) -> String {
    let base = path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    base.strip_suffix(suffix).unwrap_or(base.as_ref()).to_string()
}

/// Reads one manifest. An unreadable manifest yields an empty file list.
pub fn read_manifest(path: &Path, suffix: &str) -> PackageManifest {
    let package_name = package_name_for(path, suffix);

    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Skipping manifest {}: {}", path.display(), e);
            return PackageManifest {
                package_name,
                files: Vec::new(),
            };
        }
    };

    let mut files = Vec::with_capacity(16);
    // Paths are bytes; a non-UTF-8 name must not hide the lines after it
    for line in BufReader::new(file).split(b'\n') {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                debug!("Stopped reading manifest {}: {}", path.display(), e);
                break;
            }
        };
        let line = String::from_utf8_lossy(&line);
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            files.push(trimmed.to_string());
        }
    }

    PackageManifest {
        package_name,
        files,
    }
}

/// Lists every `*<suffix>` file in `dir`, sorted by path.
///
/// Failing to enumerate the directory at all is the one structural error of
/// the index build; there is no useful report without any manifests.
pub fn discover_manifests(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, IndexError> {
    let entries = fs::read_dir(dir).map_err(|source| IndexError::ManifestDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut out: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|s| s.to_str())
                .is_some_and(|name| name.len() > suffix.len() && name.ends_with(suffix))
        })
        .collect();
    out.sort();

    debug!("Discovered {} manifests in {}", out.len(), dir.display());
    Ok(out)
}
