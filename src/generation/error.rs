// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy of the level generator

use thiserror::Error;

/// Errors raised while validating, activating or querying a [`super::LevelBarGenerator`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("Channel count must be greater than zero")]
    NoChannels,

    #[error("Channel block size must be a non-zero multiple of 8 bytes, got {size}")]
    InvalidBlockSize { size: usize },

    #[error("Sampling rate must be greater than zero")]
    InvalidSamplingRate,

    #[error("Sampling time must be a finite positive number of seconds, got {time}")]
    InvalidSamplingTime { time: f64 },

    #[error("Tick interval must be greater than zero")]
    ZeroInterval,

    #[error(
        "Trigger channel {trigger_channel} is outside the channel set (channel count {channel_count})"
    )]
    TriggerChannelOutOfRange {
        trigger_channel: usize,
        channel_count: usize,
    },

    #[error("A block of {samples} samples cannot hold the trigger impulse, at least {required} are needed")]
    BlockTooSmallForTrigger { samples: usize, required: usize },

    #[error("The synthesized level sequence is empty")]
    EmptySequence,

    #[error("Degenerate level bounds (min {min}, max {max}), normalization is undefined")]
    DegenerateBounds { min: f32, max: f32 },

    #[error("Level {0} is outside the transform domain (must be strictly positive)")]
    InvalidLevel(f64),

    #[error("No level bounds available, the generator is not connected")]
    BoundsUnavailable,

    #[error("Waveform synthesis failed: {0}")]
    Synthesis(String),
}
