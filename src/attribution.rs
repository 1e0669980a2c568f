//! Resolves a process executable to the package(s) that installed it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::index::FilePackageIndex;

/// Synthetic package for executables no manifest claims.
pub const UNATTRIBUTED: &str = "<other>";

/// Legacy prefix whose presence/absence is treated as an alias after usrmerge.
const USR_PREFIX: &str = "/usr";

/// Names executables that are not package-managed but should still get a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathOverride {
    /// Matched anywhere in the executable path.
    pub substring: String,
    /// Synthetic package name reported for matching processes.
    pub package: String,
}

impl PathOverride {
    pub fn new(substring: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            substring: substring.into(),
            package: package.into(),
        }
    }
}

/// Built-in override table.
pub fn default_overrides() -> Vec<PathOverride> {
    vec![PathOverride::new("android-studio", "android-studio")]
}

/// The other spelling of `path` across the /usr merge, if there is one.
///
/// `/usr/bin/foo` <-> `/bin/foo`. `/usr` is only stripped as a whole leading
/// component. Relative and empty paths have no alias.
pub fn usr_alias(path: &str) -> Option<String> {
    if let Some(rest) = path.strip_prefix(USR_PREFIX) {
        if rest.starts_with('/') {
            return Some(rest.to_string());
        }
    }
    if path.starts_with('/') {
        return Some(format!("{USR_PREFIX}{path}"));
    }
    None
}

/// Looks up owning packages for executables against a finished index.
pub struct Resolver<'a> {
    index: &'a FilePackageIndex,
    overrides: Vec<(String, Arc<str>)>,
    unattributed: Arc<str>,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a FilePackageIndex, overrides: &[PathOverride], unattributed: &str) -> Self {
        Self {
            index,
            overrides: overrides
                .iter()
                .map(|o| (o.substring.clone(), Arc::from(o.package.as_str())))
                .collect(),
            unattributed: Arc::from(unattributed),
        }
    }

    /// Resolver with the built-in overrides and the `<other>` bucket.
    pub fn with_defaults(index: &'a FilePackageIndex) -> Self {
        Self::new(index, &default_overrides(), UNATTRIBUTED)
    }

    pub fn unattributed(&self) -> &Arc<str> {
        &self.unattributed
    }

    /// Owning packages of `exe`: sorted, deduplicated, never empty.
    ///
    /// Order of precedence: override table, exact path, /usr alias, then the
    /// unattributed bucket. An empty `exe` (unreadable link) is unattributed.
    pub fn resolve(&self, exe: &str) -> Vec<Arc<str>> {
        if exe.is_empty() {
            return vec![Arc::clone(&self.unattributed)];
        }

        if let Some((_, pkg)) = self.overrides.iter().find(|(s, _)| exe.contains(s.as_str())) {
            return vec![Arc::clone(pkg)];
        }

        let mut pkgs: Vec<Arc<str>> = self.index.packages_for(exe).to_vec();

        if pkgs.is_empty() {
            if let Some(alias) = usr_alias(exe) {
                pkgs.extend_from_slice(self.index.packages_for(&alias));
            }
        }

        if pkgs.is_empty() {
            return vec![Arc::clone(&self.unattributed)];
        }

        pkgs.sort_unstable();
        pkgs.dedup();
        pkgs
    }
}
