// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Waveform synthesis
//!
//! Builds, once per activation, the sample blocks of every channel and
//! reduces each of them to a level:
//!
//! - every channel carries a Gaussian noise floor (σ = 0.01)
//! - ordinary channels carry, during the first `number_of_trigger_blocks`
//!   blocks, a sinusoidal burst at a random frequency below 1 kHz whose
//!   amplitude follows `exp(1 - 1/f²)` with `f = (N - b) / N`, so the
//!   response rings down from full amplitude to nothing
//! - the trigger channel carries a single shaped impulse in block 0
//!
//! Raw samples are transient: only the per-block levels are retained.

use std::time::Instant;

use log::debug;

use super::levels::{peak_level, LevelSequence};
use super::GeneratorError;
use crate::config::generator::TRIGGER_IMPULSE_OFFSET;
use crate::config::GeneratorConfig;
use crate::utility::NoiseGenerator;

/// Standard deviation of the background noise floor
pub const NOISE_STD_DEV: f64 = 0.01;

/// Upper bound (exclusive) of the random burst frequency in Hz
pub const MAX_BURST_FREQUENCY: f64 = 1000.0;

/// Amplitudes written around the trigger impulse, as `(offset, amplitude)`
const TRIGGER_SHOULDERS: [(usize, f64); 8] = [
    (46, 0.1),
    (47, 0.2),
    (48, 0.7),
    (49, 0.9),
    (51, 0.9),
    (52, 0.7),
    (53, 0.2),
    (54, 0.1),
];

/// Unit-free impulse: `amplitude` at `offset`, zero elsewhere.
///
/// An offset beyond the block leaves it silent.
pub fn impulse(num_samples: usize, amplitude: f64, offset: usize) -> Vec<f64> {
    let mut samples = vec![0.0; num_samples];
    if let Some(sample) = samples.get_mut(offset) {
        *sample = amplitude;
    }
    samples
}

/// Sine wave starting at phase zero: `amplitude * sin(2π f i / sampling_rate)`.
pub fn sinusoidal(num_samples: usize, sampling_rate: u32, frequency: f64, amplitude: f64) -> Vec<f64> {
    let step = 2.0 * std::f64::consts::PI * frequency / sampling_rate as f64;
    (0..num_samples)
        .map(|i| amplitude * (step * i as f64).sin())
        .collect()
}

/// The shaped trigger marker: unit impulse at offset 50 with symmetric shoulders.
pub fn trigger_waveform(num_samples: usize) -> Vec<f64> {
    let mut samples = impulse(num_samples, 1.0, TRIGGER_IMPULSE_OFFSET);
    for (offset, amplitude) in TRIGGER_SHOULDERS {
        if let Some(sample) = samples.get_mut(offset) {
            *sample = amplitude;
        }
    }
    samples
}

/// Amplitude envelope of the sinusoidal burst in block `block`.
///
/// Equals 1 at block 0 and falls smoothly towards 0 as `block` approaches
/// `trigger_blocks`. Blocks at or past `trigger_blocks` have no burst.
pub fn burst_envelope(block: usize, trigger_blocks: usize) -> f32 {
    if block >= trigger_blocks {
        return 0.0;
    }
    let f = (trigger_blocks - block) as f32 / trigger_blocks as f32;
    (1.0 - 1.0 / (f * f)).exp()
}

/// Synthesizes the level sequence of one activation.
pub struct WaveformSynthesizer {
    config: GeneratorConfig,
    noise: NoiseGenerator,
}

impl WaveformSynthesizer {
    /// Create a synthesizer seeded from `config.seed`, or from entropy when unset
    pub fn new(config: GeneratorConfig) -> Self {
        let noise = NoiseGenerator::from_optional_seed(config.seed);
        Self::with_noise(config, noise)
    }

    pub fn with_noise(config: GeneratorConfig, noise: NoiseGenerator) -> Self {
        Self { config, noise }
    }

    fn is_trigger_channel(&self, channel: usize) -> bool {
        channel == self.config.trigger_channel && self.config.has_trigger_channel()
    }

    /// Samples of `channel` in block `block`.
    pub fn synthesize_block(
        &mut self,
        block: usize,
        channel: usize,
    ) -> Result<Vec<f64>, GeneratorError> {
        let num_samples = self.config.samples_per_block();
        let mut data = self
            .noise
            .gaussian_block(num_samples, NOISE_STD_DEV)
            .map_err(|e| GeneratorError::Synthesis(e.to_string()))?;

        if self.is_trigger_channel(channel) {
            if block == 0 {
                for (sample, trigger) in data.iter_mut().zip(trigger_waveform(num_samples)) {
                    *sample += trigger;
                }
            }
        } else if block < self.config.number_of_trigger_blocks() {
            let factor = burst_envelope(block, self.config.number_of_trigger_blocks());
            let frequency = self.noise.random_range(0.0..MAX_BURST_FREQUENCY);
            let burst = sinusoidal(
                num_samples,
                self.config.sampling_rate,
                frequency,
                factor as f64,
            );
            for (sample, burst) in data.iter_mut().zip(burst) {
                *sample += burst;
            }
        }

        Ok(data)
    }

    /// Generate every block of every channel and keep their levels.
    pub fn synthesize(&mut self) -> Result<LevelSequence, GeneratorError> {
        let started = Instant::now();
        let number_of_blocks = self.config.number_of_blocks();
        let channel_count = self.config.channel_count;

        let mut blocks = Vec::with_capacity(number_of_blocks);
        for block in 0..number_of_blocks {
            let mut levels = Vec::with_capacity(channel_count);
            for channel in 0..channel_count {
                let samples = self.synthesize_block(block, channel)?;
                levels.push(peak_level(&samples));
            }
            blocks.push(levels);
        }

        debug!(
            "Synthesized {} blocks x {} channels ({} samples per block, {} trigger blocks) in {:?}",
            number_of_blocks,
            channel_count,
            self.config.samples_per_block(),
            self.config.number_of_trigger_blocks(),
            started.elapsed()
        );

        Ok(LevelSequence::new(channel_count, blocks))
    }
}
