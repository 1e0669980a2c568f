//! CLI arguments and subcommands for dpkg-memstats.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use dpkg_memstats::SharePolicy;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Report output formats
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "dpkg-memstats",
    about = "Show system memory usage (PSS) grouped by Debian package",
    long_about = "Show system memory usage (PSS) grouped by Debian package.\n\n\
                  Every running process is resolved to the package that installed its \
                  executable using the dpkg file lists, and its proportional set size is \
                  charged to that package. Executables owned by several packages are split \
                  evenly between them.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Show per process memory use
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Report output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Only list the N largest packages
    #[arg(long)]
    pub top: Option<usize>,

    /// Write a JSON timing profile of the run to this path
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Log level (logs go to stderr)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Directory holding the package file lists
    #[arg(long)]
    pub manifest_dir: Option<PathBuf>,

    /// File name suffix of a package file list
    #[arg(long)]
    pub manifest_suffix: Option<String>,

    /// Mount point of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Threads reading package file lists (0 = auto)
    #[arg(long)]
    pub index_workers: Option<usize>,

    /// Threads sampling processes (0 = auto)
    #[arg(long)]
    pub sampling_workers: Option<usize>,

    /// Maximum number of processes to scan
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// How to charge executables owned by several packages
    #[arg(long, value_enum)]
    pub share_policy: Option<SharePolicy>,

    /// Maximum bytes of the command line shown per process
    #[arg(long)]
    pub cmdline_max_len: Option<usize>,

    /// Override buffer size (KB) for /proc/<pid>/smaps
    #[arg(long)]
    pub smaps_buffer_kb: Option<usize>,

    /// Override buffer size (KB) for /proc/<pid>/smaps_rollup
    #[arg(long)]
    pub smaps_rollup_buffer_kb: Option<usize>,

    /// Read process samples from a snapshot file instead of /proc
    #[arg(short = 's', long)]
    pub snapshot_file: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and system requirements
    Check {
        /// Check the package file lists
        #[arg(long)]
        manifests: bool,

        /// Check /proc filesystem and memory accessibility
        #[arg(long)]
        proc: bool,

        /// Check all system requirements
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Show which packages a path is attributed to
    Owners {
        /// Absolute file paths to look up
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Capture the current process samples to a JSON snapshot
    Snapshot {
        /// Output file path
        #[arg(short = 'o', long, default_value = "snapshot.json")]
        output: PathBuf,
    },
}
