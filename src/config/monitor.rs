// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Console level monitor configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings of the console level monitor shipped with the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Render the level bars on the console while the daemon runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Interval between two console renders, in milliseconds.
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,

    /// How long a peak is held before it starts to decay, in milliseconds.
    #[serde(default = "default_peakhold_duration_ms")]
    pub peakhold_duration_ms: u64,

    /// Decay speed of a released peak, in normalized level units per second.
    ///
    /// A speed of `v` brings a peak of 1 back to 0 in `1/v` seconds.
    #[serde(default = "default_peakhold_reset_speed")]
    pub peakhold_reset_speed: f32,

    /// Width of a rendered bar in characters.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,

    /// Number of channels printed on each render.
    #[serde(default = "default_visible_channels")]
    pub visible_channels: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_render_interval_ms() -> u64 {
    100
}

fn default_peakhold_duration_ms() -> u64 {
    2000
}

fn default_peakhold_reset_speed() -> f32 {
    1.0
}

fn default_bar_width() -> usize {
    40
}

fn default_visible_channels() -> usize {
    16
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            render_interval_ms: default_render_interval_ms(),
            peakhold_duration_ms: default_peakhold_duration_ms(),
            peakhold_reset_speed: default_peakhold_reset_speed(),
            bar_width: default_bar_width(),
            visible_channels: default_visible_channels(),
        }
    }
}

impl MonitorConfig {
    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    pub fn peakhold_duration(&self) -> Duration {
        Duration::from_millis(self.peakhold_duration_ms)
    }
}
