// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_levelbar --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against rules that the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Generator**: every rule of [`crate::config::GeneratorConfig::validate`]
///   (block size alignment, trigger channel placement, positive timing values)
/// - **Monitor**: a render interval and a bar width greater than zero when the
///   monitor is enabled, and a finite non-negative peak-hold reset speed
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    config
        .generator
        .validate()
        .context("Invalid generator configuration")?;

    let monitor = &config.monitor;
    if monitor.enabled {
        if monitor.render_interval_ms == 0 {
            anyhow::bail!("Monitor render interval must be greater than zero");
        }
        if monitor.bar_width == 0 {
            anyhow::bail!("Monitor bar width must be greater than zero");
        }
    }

    if !monitor.peakhold_reset_speed.is_finite() || monitor.peakhold_reset_speed < 0.0 {
        anyhow::bail!(
            "Invalid peak-hold reset speed: {}",
            monitor.peakhold_reset_speed
        );
    }

    Ok(())
}
