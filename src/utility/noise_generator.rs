// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Gaussian Noise Generator
//!
//! Seedable random source used by the waveform synthesizer for:
//!
//! - the Gaussian background noise floor present on every channel
//! - the random carrier frequency of each sinusoidal burst
//!
//! ## Examples
//!
//! ```rust
//! use rust_levelbar::utility::noise_generator::NoiseGenerator;
//!
//! // Reproducible sequence from a fixed seed
//! let mut generator = NoiseGenerator::new(12345);
//!
//! // 64 samples with a standard deviation of 0.01
//! let block = generator.gaussian_block(64, 0.01).unwrap();
//! assert_eq!(block.len(), 64);
//! ```

use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, NormalError};

/// Random number generator producing noise samples and uniform draws.
///
/// Two generators built with the same seed produce the same sequence of
/// values. [`NoiseGenerator::from_entropy`] seeds from the operating system,
/// so every instance yields a different sequence.
pub struct NoiseGenerator {
    rng: StdRng,
}

impl NoiseGenerator {
    /// Creates a new noise generator with a given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a new noise generator seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeded generator when a seed is given, entropy-seeded otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(seed),
            None => Self::from_entropy(),
        }
    }

    /// Uniformly distributed value in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty.
    pub fn random_range(&mut self, range: Range<f64>) -> f64 {
        self.rng.random_range(range)
    }

    /// Generates `num_samples` values drawn from a zero-mean normal distribution.
    ///
    /// # Errors
    ///
    /// Returns a [`NormalError`] when `std_dev` is negative or not finite.
    pub fn gaussian_block(
        &mut self,
        num_samples: usize,
        std_dev: f64,
    ) -> Result<Vec<f64>, NormalError> {
        let normal = Normal::new(0.0, std_dev)?;
        Ok((0..num_samples)
            .map(|_| normal.sample(&mut self.rng))
            .collect())
    }
}
