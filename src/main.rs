//! dpkg-memstats - version 0.1.0
//!
//! Prints the memory usage of the system grouped by Debian package.
//! This is the main entry point that sets up logging and dispatches subcommands.

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{
    command_check, command_config, command_owners, command_report, command_snapshot,
    ReportOptions,
};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
/// Logs go to stderr so the report on stdout stays parseable.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => return,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Helper function to load and validate configuration.
fn load_validated_config(args: &Args) -> Result<Config> {
    let config = resolve_config(args)?;
    validate_effective_config(&config)?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            validate_effective_config(&config)?;
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, &args.config_format);
    }

    // Config generation doesn't need an effective config
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), format.clone(), *commented);
    }

    let config = load_validated_config(&args)?;

    match &args.command {
        Some(Commands::Check { manifests, proc, all }) => {
            command_check(*manifests, *proc, *all, &config)
        }
        Some(Commands::Owners { paths }) => command_owners(paths, &config),
        Some(Commands::Snapshot { output }) => command_snapshot(output, &config),
        Some(Commands::Config { .. }) => unreachable!("Config handled above"),
        None => {
            let opts = ReportOptions {
                verbose: args.verbose,
                format: args.format,
                top: args.top,
                profile: args.profile.clone(),
            };
            command_report(&opts, &config)
        }
    }
}

/// Main application entry point.
fn main() {
    let args = Args::parse();
    setup_logging(&args);

    if let Err(e) = run(args) {
        error!("{:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
