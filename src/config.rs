//! Configuration management for dpkg-memstats.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use anyhow::{bail, Context, Result};
use dpkg_memstats::process::{BufferConfig, ProcFs, DEFAULT_CMDLINE_MAX_LEN, DEFAULT_PROC_ROOT};
use dpkg_memstats::{
    default_overrides, default_worker_count, PathOverride, SharePolicy, DEFAULT_MANIFEST_DIR,
    DEFAULT_MANIFEST_SUFFIX, UNATTRIBUTED,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat};

/// Effective configuration. `None` means "use the built-in default".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Package file lists
    #[serde(alias = "manifest-dir")]
    pub manifest_dir: Option<PathBuf>,
    #[serde(alias = "manifest-suffix")]
    pub manifest_suffix: Option<String>,

    // Process scanning
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "max-processes")]
    pub max_processes: Option<usize>,
    #[serde(alias = "cmdline-max-len")]
    pub cmdline_max_len: Option<usize>,

    // Parallelism (0 or null = auto)
    #[serde(alias = "index-workers")]
    pub index_workers: Option<usize>,
    #[serde(alias = "sampling-workers")]
    pub sampling_workers: Option<usize>,

    // Performance tuning
    pub smaps_buffer_kb: Option<usize>,
    pub smaps_rollup_buffer_kb: Option<usize>,

    // Attribution
    #[serde(alias = "share-policy")]
    pub share_policy: Option<SharePolicy>,
    #[serde(alias = "unattributed-label")]
    pub unattributed_label: Option<String>,

    /// Path to a JSON snapshot (uses recorded samples instead of /proc)
    #[serde(alias = "snapshot-file")]
    pub snapshot_file: Option<PathBuf>,

    /// Ordered (substring, package) pairs checked before the index.
    /// Kept last: TOML needs tables after plain values.
    pub overrides: Option<Vec<PathOverride>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_dir: Some(PathBuf::from(DEFAULT_MANIFEST_DIR)),
            manifest_suffix: Some(DEFAULT_MANIFEST_SUFFIX.to_string()),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            max_processes: None,
            cmdline_max_len: Some(DEFAULT_CMDLINE_MAX_LEN),
            index_workers: None,
            sampling_workers: None,
            smaps_buffer_kb: Some(512),
            smaps_rollup_buffer_kb: Some(256),
            share_policy: Some(SharePolicy::FairShare),
            unattributed_label: Some(UNATTRIBUTED.to_string()),
            snapshot_file: None,
            overrides: Some(default_overrides()),
        }
    }
}

/// Worker count from config; unset or 0 means auto.
fn workers_or_default(value: Option<usize>) -> usize {
    match value {
        Some(n) if n > 0 => n,
        _ => default_worker_count(),
    }
}

impl Config {
    pub fn manifest_dir(&self) -> PathBuf {
        self.manifest_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_DIR))
    }

    pub fn manifest_suffix(&self) -> &str {
        self.manifest_suffix
            .as_deref()
            .unwrap_or(DEFAULT_MANIFEST_SUFFIX)
    }

    pub fn index_workers(&self) -> usize {
        workers_or_default(self.index_workers)
    }

    pub fn sampling_workers(&self) -> usize {
        workers_or_default(self.sampling_workers)
    }

    pub fn share_policy(&self) -> SharePolicy {
        self.share_policy.unwrap_or_default()
    }

    pub fn unattributed_label(&self) -> &str {
        self.unattributed_label.as_deref().unwrap_or(UNATTRIBUTED)
    }

    pub fn overrides(&self) -> Vec<PathOverride> {
        self.overrides.clone().unwrap_or_else(default_overrides)
    }

    /// Live /proc source built from the scanning and buffer settings.
    pub fn proc_fs(&self) -> ProcFs {
        let defaults = BufferConfig::default();
        ProcFs {
            root: self
                .proc_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
            buffers: BufferConfig {
                smaps_kb: self.smaps_buffer_kb.unwrap_or(defaults.smaps_kb),
                smaps_rollup_kb: self
                    .smaps_rollup_buffer_kb
                    .unwrap_or(defaults.smaps_rollup_kb),
            },
            cmdline_max_len: self.cmdline_max_len.unwrap_or(DEFAULT_CMDLINE_MAX_LEN),
            max_processes: self.max_processes,
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if cfg.manifest_suffix().is_empty() {
        bail!("manifest_suffix must not be empty");
    }

    if cfg.cmdline_max_len == Some(0) {
        bail!("cmdline_max_len must be greater than 0");
    }

    if cfg.smaps_buffer_kb == Some(0) || cfg.smaps_rollup_buffer_kb == Some(0) {
        bail!("smaps_buffer_kb and smaps_rollup_buffer_kb must be greater than 0");
    }

    if cfg.max_processes == Some(0) {
        bail!("max_processes must be greater than 0 when set");
    }

    if cfg.unattributed_label().trim().is_empty() {
        bail!("unattributed_label must not be empty");
    }

    for (i, o) in cfg.overrides().iter().enumerate() {
        if o.substring.is_empty() {
            bail!("overrides[{}]: substring must not be empty", i);
        }
        if o.package.trim().is_empty() {
            bail!(
                "overrides[{}]: package for '{}' must not be empty",
                i,
                o.substring
            );
        }
    }

    if let Some(snapshot) = &cfg.snapshot_file {
        if !snapshot.exists() {
            bail!("snapshot file not found: {}", snapshot.display());
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(dir) = &args.manifest_dir {
        config.manifest_dir = Some(dir.clone());
    }
    if let Some(suffix) = &args.manifest_suffix {
        config.manifest_suffix = Some(suffix.clone());
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if args.max_processes.is_some() {
        config.max_processes = args.max_processes;
    }
    if args.cmdline_max_len.is_some() {
        config.cmdline_max_len = args.cmdline_max_len;
    }

    // Parallelism
    if args.index_workers.is_some() {
        config.index_workers = args.index_workers;
    }
    if args.sampling_workers.is_some() {
        config.sampling_workers = args.sampling_workers;
    }

    // Performance settings
    if let Some(kb) = args.smaps_buffer_kb {
        config.smaps_buffer_kb = Some(kb);
    }
    if let Some(kb) = args.smaps_rollup_buffer_kb {
        config.smaps_rollup_buffer_kb = Some(kb);
    }

    if let Some(policy) = args.share_policy {
        config.share_policy = Some(policy);
    }

    // Snapshot file: CLI wins if provided
    if let Some(snapshot) = &args.snapshot_file {
        config.snapshot_file = Some(snapshot.clone());
    }

    Ok(config)
}

/// Loads a config file by extension, or the first default location found.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        let defaults = [
            "/etc/dpkg-memstats/config.yaml",
            "/etc/dpkg-memstats/config.yml",
            "/etc/dpkg-memstats/config.json",
            "./dpkg-memstats.yaml",
            "./dpkg-memstats.yml",
            "./dpkg-memstats.json",
        ];

        match defaults.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config content; `extension` picks the format, YAML by default.
fn parse_config(content: &str, extension: Option<&str>) -> Result<Config> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Serializes a config in the requested format.
pub fn render_config(config: &Config, format: &ConfigFormat) -> Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config::default();
        validate_effective_config(&cfg).unwrap();
        assert_eq!(cfg.manifest_suffix(), ".list");
        assert_eq!(cfg.share_policy(), SharePolicy::FairShare);
        assert_eq!(cfg.unattributed_label(), "<other>");
        assert!(cfg.index_workers() >= 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.manifest_suffix = Some(String::new());
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.overrides = Some(vec![PathOverride::new("", "x")]);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.unattributed_label = Some("  ".into());
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.cmdline_max_len = Some(0);
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_zero_workers_means_auto() {
        let mut cfg = Config::default();
        cfg.index_workers = Some(0);
        cfg.sampling_workers = Some(3);
        assert_eq!(cfg.index_workers(), default_worker_count());
        assert_eq!(cfg.sampling_workers(), 3);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memstats.yaml");
        fs::write(
            &path,
            "manifest_dir: /srv/dpkg\nshare_policy: full-charge\nsampling_workers: 2\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "dpkg-memstats",
            "--config",
            path.to_str().unwrap(),
            "--share-policy",
            "fair-share",
        ]);
        let cfg = resolve_config(&args).unwrap();

        assert_eq!(cfg.manifest_dir(), PathBuf::from("/srv/dpkg"));
        assert_eq!(cfg.share_policy(), SharePolicy::FairShare);
        assert_eq!(cfg.sampling_workers(), 2);
        // Fields missing from the file fall back to built-in defaults
        assert_eq!(cfg.manifest_suffix(), ".list");
        assert_eq!(cfg.overrides(), default_overrides());
    }

    #[test]
    fn test_parse_config_formats() {
        let json = r#"{"manifest_suffix": ".files", "overrides": [{"substring": "/opt/ide", "package": "ide"}]}"#;
        let cfg = parse_config(json, Some("json")).unwrap();
        assert_eq!(cfg.manifest_suffix(), ".files");
        assert_eq!(cfg.overrides(), vec![PathOverride::new("/opt/ide", "ide")]);

        let toml = "proc_root = \"/host/proc\"\n";
        let cfg = parse_config(toml, Some("toml")).unwrap();
        assert_eq!(cfg.proc_fs().root, PathBuf::from("/host/proc"));
    }

    #[test]
    fn test_render_default_config_all_formats() {
        let cfg = Config::default();
        for format in [ConfigFormat::Yaml, ConfigFormat::Json, ConfigFormat::Toml] {
            let out = render_config(&cfg, &format).unwrap();
            assert!(out.contains("android-studio"));
        }
    }
}
