// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Console level monitor
//!
//! [`LevelMonitor`] consumes generator events and keeps one [`LevelBar`] per
//! registered channel. Each bar holds the normalized level of its channel
//! and a peak-hold value that stays up for a configurable duration before
//! decaying back towards the current level on every render.

mod render;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::config::MonitorConfig;
use crate::generation::{
    ChannelId, ChannelLevelData, GeneratorEvent, GeneratorListener, GeneratorState,
};

pub use render::{format_bar, level_to_color, peakhold_height, render_frame, Rgb};

/// Display state of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct LevelBar {
    pub id: ChannelId,
    pub name: String,
    /// Normalized level in `[0, 1]`
    pub level: f32,
    /// Held peak in `[0, 1]`, never below `level` after a render
    pub max_level: f32,
    pub max_level_last_update: Instant,
}

impl LevelBar {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            name: format!("Level bar #{}", id),
            level: 0.0,
            max_level: 0.0,
            max_level_last_update: Instant::now(),
        }
    }

    /// Set the level, raising the held peak if it is exceeded
    pub fn update(&mut self, level: f32, now: Instant) {
        self.level = level;
        if self.max_level < level {
            self.max_level = level;
            self.max_level_last_update = now;
        }
    }

    /// Lower an expired peak by `elapsed * reset_speed`.
    ///
    /// A `reset_speed` of `v` brings a peak of 1 back to 0 in `1/v` seconds.
    pub fn decay_peak(&mut self, now: Instant, hold: Duration, elapsed: Duration, reset_speed: f32) {
        if now.saturating_duration_since(self.max_level_last_update) < hold {
            return;
        }
        let mut max_level = self.max_level - elapsed.as_secs_f32() * reset_speed;
        if max_level < self.level {
            max_level = self.level;
        }
        self.max_level = max_level.clamp(0.0, 1.0);
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    bars: BTreeMap<ChannelId, LevelBar>,
    generator_state: Option<GeneratorState>,
    // Index and publication time of the last level block
    last_block: Option<(usize, DateTime<Utc>)>,
    last_render: Option<Instant>,
    frames: u64,
}

/// Event listener tracking level bars with peak hold
#[derive(Debug)]
pub struct LevelMonitor {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
}

impl LevelMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Apply one event as if received at `now`
    pub fn handle_event_at(&self, event: &GeneratorEvent, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match event {
            GeneratorEvent::ChannelAdded(id) => {
                state.bars.insert(*id, LevelBar::new(*id));
            }
            GeneratorEvent::ChannelRemoved(id) => {
                state.bars.remove(id);
            }
            GeneratorEvent::ChannelLevelDataReceived(data) => {
                Self::apply_levels(&mut state, data, now);
            }
            GeneratorEvent::GeneratorStateChanged(generator_state) => {
                debug!("Monitor observed generator state {}", generator_state);
                state.generator_state = Some(*generator_state);
            }
        }
    }

    fn apply_levels(state: &mut MonitorState, data: &ChannelLevelData, now: Instant) {
        state.last_block = Some((data.block_index, data.timestamp));
        for (id, raw) in data.iter() {
            let Some(bar) = state.bars.get_mut(&id) else {
                continue;
            };
            let level = match data.bounds.transform(raw as f64) {
                Ok(level) => level,
                Err(e) => {
                    warn!("Channel {} level {} cannot be displayed: {}", id, raw, e);
                    0.0
                }
            };
            bar.update(level, now);
        }
    }

    /// Advance peak-hold decay to `now`.
    ///
    /// The decay applied to each expired peak is proportional to the time
    /// elapsed since the previous render; the first render only records `now`.
    pub fn render(&self, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = state
            .last_render
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();

        let hold = self.config.peakhold_duration();
        let reset_speed = self.config.peakhold_reset_speed;
        for bar in state.bars.values_mut() {
            bar.decay_peak(now, hold, elapsed, reset_speed);
        }

        state.last_render = Some(now);
        state.frames += 1;
    }

    /// Copy of every bar, by ascending channel id
    pub fn bars(&self) -> Vec<LevelBar> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bars
            .values()
            .cloned()
            .collect()
    }

    pub fn bar(&self, id: ChannelId) -> Option<LevelBar> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bars
            .get(&id)
            .cloned()
    }

    pub fn bar_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bars
            .len()
    }

    /// Last generator state seen, `None` before the first state change
    pub fn generator_state(&self) -> Option<GeneratorState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generator_state
    }

    pub fn frames_rendered(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frames
    }

    /// One-line summary: generator state and the last block received
    pub fn status_line(&self) -> String {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let generator = state
            .generator_state
            .map(|generator_state| generator_state.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        match state.last_block {
            Some((index, timestamp)) => format!(
                "Generator {}, block {} published at {}",
                generator,
                index,
                timestamp.format("%H:%M:%S%.3f")
            ),
            None => format!("Generator {}, no level data yet", generator),
        }
    }

    /// Text frame of the first `visible_channels` bars
    pub fn frame(&self, colored: bool) -> String {
        let bars = self.bars();
        render_frame(
            bars.iter().take(self.config.visible_channels),
            self.config.bar_width,
            colored,
        )
    }
}

impl GeneratorListener for LevelMonitor {
    fn on_event(&self, event: &GeneratorEvent) {
        self.handle_event_at(event, Instant::now());
    }
}
