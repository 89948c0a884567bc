// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the synthetic level bar generator
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::signal;

use rust_levelbar::config::{self, Config};
use rust_levelbar::daemon::Daemon;

/// Synthetic multi-channel level generator with a console level monitor
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of generated channels
    #[arg(long)]
    channels: Option<usize>,

    /// Period between two published level blocks, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Delay before the first level block, in milliseconds
    #[arg(long)]
    start_delay_ms: Option<u64>,

    /// Seed of the random source, for reproducible level sequences
    #[arg(long)]
    seed: Option<u64>,

    /// Enable or disable the console monitor
    #[arg(long)]
    monitor: Option<bool>,

    /// Run for this many seconds, then stop (default: until Ctrl-C)
    #[arg(long)]
    duration: Option<u64>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger with appropriate level based on verbose and quiet flags
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    // Apply command line overrides
    config.apply_args(
        args.channels,
        args.interval_ms,
        args.start_delay_ms,
        args.seed,
        args.monitor,
    );
    config::utils::validate_specific_rules(&config)?;

    info!("Starting in daemon mode");
    let mut daemon = Daemon::new();
    if let Err(err) = daemon.launch(&config).await {
        daemon.shutdown();
        daemon.join().await?;
        return Err(err);
    }

    // Wait for termination signal or the requested run time
    match args.duration {
        Some(seconds) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {
                    info!("Run time of {} s elapsed, terminating daemon", seconds);
                }
                result = signal::ctrl_c() => {
                    result?;
                    info!("Received shutdown signal, terminating daemon");
                }
            }
        }
        None => {
            signal::ctrl_c().await?;
            info!("Received shutdown signal, terminating daemon");
        }
    }

    daemon.shutdown();
    daemon.join().await?;

    Ok(())
}
