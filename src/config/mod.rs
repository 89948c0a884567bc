// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the level bar generator
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before it is deserialized.
//!
//! ## Configuration Structure
//!
//! - `generator`: Settings for the synthetic level generator
//! - `monitor`: Settings for the console level monitor
//!
//! ## Usage
//!
//! ```no_run
//! use rust_levelbar::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(50),   // Channel count
//!     Some(10),   // Tick interval in milliseconds
//!     Some(0),    // Start delay in milliseconds
//!     None,       // Seed
//!     None,       // Monitor enabled
//! );
//!
//! println!("Channels: {}", config.generator.channel_count);
//! ```

pub mod generator;
pub mod monitor;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use generator::GeneratorConfig;
pub use monitor::MonitorConfig;
pub use utils::output_config_schema;

/// Embedded JSON schema of the YAML configuration
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the synthetic level generator.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Settings for the console level monitor.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. An invalid file
    /// makes the load fail and leaves a `<name>.sample.yaml` with defaults next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let config = match Self::from_yaml_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration error in {}: {:#}", path.display(), err);
                Self::create_sample_config(path)?;
                return Err(err.context(format!(
                    "Failed to load configuration from {}",
                    path.display()
                )));
            }
        };

        Ok(config)
    }

    /// Parse and validate a configuration held in a YAML string
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Failed to build JSON schema validator")?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config =
            serde_yml::from_str(contents).context("Failed to deserialize configuration")?;

        utils::validate_specific_rules(&config)?;

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are explicitly provided override the existing configuration.
    ///
    /// # Parameters
    ///
    /// * `channel_count` - Number of generated channels
    /// * `interval_ms` - Tick interval in milliseconds
    /// * `start_delay_ms` - Delay before the first tick in milliseconds
    /// * `seed` - Seed of the random source
    /// * `monitor_enabled` - Enable or disable the console monitor
    pub fn apply_args(
        &mut self,
        channel_count: Option<usize>,
        interval_ms: Option<u64>,
        start_delay_ms: Option<u64>,
        seed: Option<u64>,
        monitor_enabled: Option<bool>,
    ) {
        if let Some(channel_count) = channel_count {
            debug!("Overriding channel count from command line: {}", channel_count);
            self.generator.channel_count = channel_count;
        }
        if let Some(interval_ms) = interval_ms {
            debug!("Overriding tick interval from command line: {} ms", interval_ms);
            self.generator.interval_ms = interval_ms;
        }
        if let Some(start_delay_ms) = start_delay_ms {
            debug!("Overriding start delay from command line: {} ms", start_delay_ms);
            self.generator.start_delay_ms = start_delay_ms;
        }
        if let Some(seed) = seed {
            debug!("Overriding seed from command line: {}", seed);
            self.generator.seed = Some(seed);
        }
        if let Some(enabled) = monitor_enabled {
            debug!("Overriding monitor enabled from command line: {}", enabled);
            self.monitor.enabled = enabled;
        }
    }
}
