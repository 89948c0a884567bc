// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Level extraction, bounds tracking and level normalization
//!
//! A *level* summarizes one channel block as `max(|sample|) / 10`. The
//! sequence of level blocks is scanned once after synthesis to record the
//! global bounds, which then drive the logarithmic mapping of raw levels to
//! the `[0, 1]` visualization range.

use std::sync::Arc;

use super::GeneratorError;

/// Divisor applied to the peak magnitude of a block
pub const LEVEL_SCALE: f64 = 10.0;

/// Reduce a channel block to its level: the peak magnitude divided by [`LEVEL_SCALE`].
///
/// An empty block has a level of zero.
pub fn peak_level(samples: &[f64]) -> f32 {
    let peak = samples.iter().fold(0.0_f64, |peak, s| peak.max(s.abs()));
    (peak / LEVEL_SCALE) as f32
}

/// Immutable sequence of level blocks produced by one activation.
///
/// Every block holds one level per channel, indexed by channel id. Blocks are
/// shared read-only views so that publishing one does not copy it.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSequence {
    channel_count: usize,
    blocks: Vec<Arc<[f32]>>,
}

impl LevelSequence {
    /// Build a sequence from its blocks.
    ///
    /// # Panics
    ///
    /// Panics if a block does not hold exactly `channel_count` levels.
    pub fn new(channel_count: usize, blocks: Vec<Vec<f32>>) -> Self {
        let blocks = blocks
            .into_iter()
            .map(|block| {
                assert_eq!(
                    block.len(),
                    channel_count,
                    "level block does not match the channel count"
                );
                Arc::from(block)
            })
            .collect();

        Self {
            channel_count,
            blocks,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Number of blocks in the sequence
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Level block at `index`
    pub fn block(&self, index: usize) -> Option<&Arc<[f32]>> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Arc<[f32]>> {
        self.blocks.iter()
    }

    /// Every level of every block, block by block
    pub fn levels(&self) -> impl Iterator<Item = f32> + '_ {
        self.blocks.iter().flat_map(|block| block.iter().copied())
    }

    /// Scan the whole sequence once and record the global level bounds.
    pub fn bounds(&self) -> Result<LevelBounds, GeneratorError> {
        LevelBounds::from_levels(self.levels())
    }
}

/// Global minimum and maximum level of a sequence.
///
/// A value of this type always satisfies `0 < min < max`, which keeps the
/// logarithmic normalization defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelBounds {
    min: f32,
    max: f32,
}

impl LevelBounds {
    /// Bounds from explicit values.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::DegenerateBounds`] unless `0 < min < max`.
    pub fn new(min: f32, max: f32) -> Result<Self, GeneratorError> {
        // Written as a negation so that NaN bounds are rejected as well
        if !(min > 0.0 && min < max) {
            return Err(GeneratorError::DegenerateBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// Track the minimum and maximum of `levels`.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::EmptySequence`] when `levels` is empty and
    /// [`GeneratorError::DegenerateBounds`] when the extremes cannot normalize.
    pub fn from_levels<I>(levels: I) -> Result<Self, GeneratorError>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut levels = levels.into_iter();
        let first = levels.next().ok_or(GeneratorError::EmptySequence)?;
        let (min, max) = levels.fold((first, first), |(min, max), level| {
            (min.min(level), max.max(level))
        });
        Self::new(min, max)
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Map a raw level to `[0, 1]` on a logarithmic scale.
    ///
    /// `log10(min)` maps to 0 and `log10(max)` to 1; levels outside the bounds
    /// are clamped. The mapping is monotonic non-decreasing.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::InvalidLevel`] when `level` is not strictly positive.
    pub fn transform(&self, level: f64) -> Result<f32, GeneratorError> {
        if !(level > 0.0) {
            return Err(GeneratorError::InvalidLevel(level));
        }

        let x = level.log10();
        let lo = (self.min as f64).log10();
        let hi = (self.max as f64).log10();

        let normalized = (x - lo) / (hi - lo);
        Ok(normalized.clamp(0.0, 1.0) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_peak_level() {
        assert_relative_eq!(peak_level(&[0.1, -0.5, 0.3]), 0.05);
        assert_eq!(peak_level(&[]), 0.0);
    }

    #[test]
    fn test_bounds_tracking() {
        let sequence = LevelSequence::new(3, vec![vec![0.01, 0.2, 0.05], vec![0.003, 0.1, 0.04]]);

        let bounds = sequence.bounds().unwrap();
        assert_eq!(bounds.min(), 0.003);
        assert_eq!(bounds.max(), 0.2);
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.block(1).unwrap()[0], 0.003);
    }

    #[test]
    fn test_empty_and_degenerate_bounds() {
        let empty = LevelSequence::new(4, Vec::new());
        assert_eq!(empty.bounds(), Err(GeneratorError::EmptySequence));

        let flat = LevelSequence::new(2, vec![vec![0.5, 0.5], vec![0.5, 0.5]]);
        assert_eq!(
            flat.bounds(),
            Err(GeneratorError::DegenerateBounds { min: 0.5, max: 0.5 })
        );

        assert!(LevelBounds::new(0.0, 1.0).is_err());
        assert!(LevelBounds::new(f32::NAN, 1.0).is_err());
    }

    #[test]
    fn test_transform_maps_bounds_to_unit_range() {
        let bounds = LevelBounds::new(0.001, 0.1).unwrap();

        assert_relative_eq!(bounds.transform(0.001).unwrap(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.transform(0.1).unwrap(), 1.0, epsilon = 1e-6);
        // Geometric midpoint lands in the middle of the log scale
        assert_relative_eq!(bounds.transform(0.01).unwrap(), 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_transform_clamps_and_is_monotonic() {
        let bounds = LevelBounds::new(0.002, 0.09).unwrap();

        assert_eq!(bounds.transform(1e-9).unwrap(), 0.0);
        assert_eq!(bounds.transform(50.0).unwrap(), 1.0);

        let mut previous = 0.0;
        let mut level = 0.002;
        while level <= 0.09 {
            let value = bounds.transform(level).unwrap();
            assert!((0.0..=1.0).contains(&value));
            assert!(value >= previous);
            previous = value;
            level *= 1.05;
        }
    }

    #[test]
    fn test_transform_domain() {
        let bounds = LevelBounds::new(0.002, 0.09).unwrap();

        assert_eq!(bounds.transform(0.0), Err(GeneratorError::InvalidLevel(0.0)));
        assert_eq!(
            bounds.transform(-1.0),
            Err(GeneratorError::InvalidLevel(-1.0))
        );
        assert!(bounds.transform(f64::NAN).is_err());
    }
}
