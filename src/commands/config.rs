//! Config command implementation.
//!
//! Generates configuration files in various formats.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat, commented: bool) -> Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("dpkg-memstats.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# dpkg-memstats Configuration
# ==========================
#
# Package File Lists
# ------------------
# manifest_dir: /var/lib/dpkg/info   # One file list per installed package
# manifest_suffix: .list             # Stripped from the file name to get the package name
#
# Process Scanning
# ----------------
# proc_root: /proc             # Proc filesystem mount point
# max_processes: null          # Maximum processes to scan
# cmdline_max_len: 60          # Bytes of the command line shown with -v
#
# Parallelism
# -----------
# index_workers: null          # Threads reading file lists (null/0 = cpus-1, max 256)
# sampling_workers: null       # Threads sampling processes (null/0 = cpus-1, max 256)
#
# Performance Tuning
# ------------------
# smaps_buffer_kb: 512         # Buffer size for smaps parsing
# smaps_rollup_buffer_kb: 256  # Buffer size for smaps_rollup parsing
#
# Attribution
# -----------
# share_policy: fair-share     # fair-share: split PSS across owners
#                              # full-charge: charge every owner the full PSS
# unattributed_label: <other>  # Bucket for executables no package owns
# overrides:                   # Checked before the file lists, first match wins
#   - substring: android-studio
#     package: android-studio
#
# Replay
# ------
# snapshot_file: null          # Use a recorded snapshot instead of /proc
"#;

    format!("{comments}\n{yaml}")
}
