// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Level Bar library
//!
//! This library provides a synthetic multi-channel level source standing in
//! for a vibration acquisition front-end, together with the pieces needed to
//! consume it:
//!
//! - [`generation`]: waveform synthesis, level extraction and normalization,
//!   channel registration, periodic publication and lifecycle events
//! - [`monitor`]: a console consumer with peak-hold level bars
//! - [`config`]: YAML configuration validated against a JSON schema
//! - [`daemon`]: long-running service wiring everything together

pub mod config;
pub mod daemon;
pub mod generation;
pub mod monitor;
pub mod utility;

pub use generation::{
    ChannelLevelData, GeneratorError, GeneratorEvent, GeneratorState, LevelBarGenerator,
};
