// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Level generator configuration
//!
//! This module defines the parameters used to synthesize the level sequence
//! and to drive the periodic publication of level blocks.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::generation::GeneratorError;

/// Sample offset of the unit impulse written on the trigger channel
pub const TRIGGER_IMPULSE_OFFSET: usize = 50;

/// Smallest block (in samples) able to hold the impulse and its shoulders
pub const MIN_TRIGGER_BLOCK_SAMPLES: usize = TRIGGER_IMPULSE_OFFSET + 5;

/// Size in bytes of one sample inside a channel block
pub const BYTES_PER_SAMPLE: usize = 8;

/// Configuration of the synthetic level generator.
///
/// The values are fixed for the lifetime of one activation: they are read when
/// [`crate::generation::LevelBarGenerator::connect`] synthesizes the level
/// sequence and starts the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of logical channels, identified by `0..channel_count`.
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    /// Period between two published level blocks, in milliseconds.
    ///
    /// Must be greater than zero.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Delay before the first level block is published, in milliseconds.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,

    /// Size of one channel block in bytes (8 bytes per sample).
    #[serde(default = "default_channel_block_size")]
    pub channel_block_size: usize,

    /// Sampling rate of the synthesized waveforms in Hz.
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,

    /// Duration in seconds of the transient window.
    ///
    /// The whole sequence covers five times this duration.
    #[serde(default = "default_sampling_time")]
    pub sampling_time: f64,

    /// Channel carrying the impulse marker instead of the sinusoidal burst.
    #[serde(default = "default_trigger_channel")]
    pub trigger_channel: usize,

    /// Reject configurations whose channel set does not contain the trigger channel.
    ///
    /// When disabled the trigger channel is silently left out, which matches the
    /// behavior of the reference generator.
    #[serde(default)]
    pub strict_trigger_channel: bool,

    /// Seed of the random source. A fresh entropy seed is drawn per activation when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_channel_count() -> usize {
    75
}

fn default_interval_ms() -> u64 {
    4
}

fn default_start_delay_ms() -> u64 {
    1000
}

fn default_channel_block_size() -> usize {
    512
}

fn default_sampling_rate() -> u32 {
    16384
}

fn default_sampling_time() -> f64 {
    1.0
}

fn default_trigger_channel() -> usize {
    36
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            channel_count: default_channel_count(),
            interval_ms: default_interval_ms(),
            start_delay_ms: default_start_delay_ms(),
            channel_block_size: default_channel_block_size(),
            sampling_rate: default_sampling_rate(),
            sampling_time: default_sampling_time(),
            trigger_channel: default_trigger_channel(),
            strict_trigger_channel: false,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Tick period of the scheduler
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Delay before the first tick
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Number of samples in one channel block
    pub fn samples_per_block(&self) -> usize {
        self.channel_block_size / BYTES_PER_SAMPLE
    }

    /// Number of samples covered by the transient window, per channel
    fn transient_samples(&self) -> usize {
        (self.sampling_time * self.sampling_rate as f64) as usize
    }

    /// Number of blocks in the synthesized sequence
    pub fn number_of_blocks(&self) -> usize {
        let samples_per_block = self.samples_per_block();
        if samples_per_block == 0 {
            return 0;
        }
        5 * self.transient_samples() / samples_per_block
    }

    /// Number of leading blocks carrying the sinusoidal burst
    pub fn number_of_trigger_blocks(&self) -> usize {
        let samples_per_block = self.samples_per_block();
        if samples_per_block == 0 {
            return 0;
        }
        self.transient_samples() / samples_per_block
    }

    /// Whether the trigger channel is part of the channel set
    pub fn has_trigger_channel(&self) -> bool {
        self.trigger_channel < self.channel_count
    }

    /// Check that the configuration can be activated.
    ///
    /// Runs before any channel is registered or any timer is started.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.channel_count == 0 {
            return Err(GeneratorError::NoChannels);
        }

        if self.channel_block_size == 0 || self.channel_block_size % BYTES_PER_SAMPLE != 0 {
            return Err(GeneratorError::InvalidBlockSize {
                size: self.channel_block_size,
            });
        }

        if self.sampling_rate == 0 {
            return Err(GeneratorError::InvalidSamplingRate);
        }

        if !self.sampling_time.is_finite() || self.sampling_time <= 0.0 {
            return Err(GeneratorError::InvalidSamplingTime {
                time: self.sampling_time,
            });
        }

        if self.interval_ms == 0 {
            return Err(GeneratorError::ZeroInterval);
        }

        if self.has_trigger_channel() {
            let samples = self.samples_per_block();
            if samples < MIN_TRIGGER_BLOCK_SAMPLES {
                return Err(GeneratorError::BlockTooSmallForTrigger {
                    samples,
                    required: MIN_TRIGGER_BLOCK_SAMPLES,
                });
            }
        } else if self.strict_trigger_channel {
            return Err(GeneratorError::TriggerChannelOutOfRange {
                trigger_channel: self.trigger_channel,
                channel_count: self.channel_count,
            });
        } else {
            warn!(
                "Trigger channel {} is not part of the {} configured channels, no impulse will be generated",
                self.trigger_channel, self.channel_count
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sequence_geometry() {
        let config = GeneratorConfig::default();

        assert_eq!(config.samples_per_block(), 64);
        assert_eq!(config.number_of_blocks(), 1280);
        assert_eq!(config.number_of_trigger_blocks(), 256);
        assert_eq!(config.interval(), Duration::from_millis(4));
        assert_eq!(config.start_delay(), Duration::from_secs(1));
        assert!(config.has_trigger_channel());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let config = GeneratorConfig {
            channel_count: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(GeneratorError::NoChannels));

        let config = GeneratorConfig {
            channel_block_size: 500,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(GeneratorError::InvalidBlockSize { size: 500 })
        );

        let config = GeneratorConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(GeneratorError::ZeroInterval));

        let config = GeneratorConfig {
            sampling_time: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GeneratorError::InvalidSamplingTime { .. })
        ));
    }

    #[test]
    fn test_trigger_channel_handling() {
        // Silent omission is accepted by default
        let lenient = GeneratorConfig {
            channel_count: 36,
            ..Default::default()
        };
        assert!(!lenient.has_trigger_channel());
        assert!(lenient.validate().is_ok());

        let strict = GeneratorConfig {
            channel_count: 36,
            strict_trigger_channel: true,
            ..Default::default()
        };
        assert_eq!(
            strict.validate(),
            Err(GeneratorError::TriggerChannelOutOfRange {
                trigger_channel: 36,
                channel_count: 36,
            })
        );

        // 48 samples per block cannot hold the impulse shoulders
        let short_blocks = GeneratorConfig {
            channel_block_size: 384,
            ..Default::default()
        };
        assert_eq!(
            short_blocks.validate(),
            Err(GeneratorError::BlockTooSmallForTrigger {
                samples: 48,
                required: MIN_TRIGGER_BLOCK_SAMPLES,
            })
        );
    }
}
