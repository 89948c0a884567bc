// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Text rendering of level bars

use std::fmt::Write;

use super::LevelBar;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// ANSI true-color foreground escape sequence
    pub fn ansi_fg(&self) -> String {
        format!("\x1b[38;2;{};{};{}m", self.r, self.g, self.b)
    }
}

const ANSI_RESET: &str = "\x1b[0m";

/// Green (0) to red (1) through yellow.
///
/// Levels outside `[0, 1]` are clamped.
pub fn level_to_color(level: f32) -> Rgb {
    let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    Rgb {
        r: (255.0 * level) as u8,
        g: (255.0 * (1.0 - level)) as u8,
        b: 0,
    }
}

/// Height of the peak-hold marker on a bar of `bar_height`
pub fn peakhold_height(max_level: f32, bar_height: f64) -> f64 {
    max_level as f64 * bar_height
}

/// One line per bar: name, filled cells for the level, `|` at the held peak.
///
/// ```
/// use rust_levelbar::monitor::{format_bar, LevelBar};
///
/// let mut bar = LevelBar::new(3);
/// bar.level = 0.5;
/// bar.max_level = 0.75;
/// assert_eq!(format_bar(&bar, 8), "Level bar #3     [####.|..] 0.50");
/// ```
pub fn format_bar(bar: &LevelBar, width: usize) -> String {
    let filled = cells(bar.level, width);
    let peak = peakhold_height(bar.max_level.clamp(0.0, 1.0), width as f64).round() as usize;

    let mut line = String::with_capacity(width + 32);
    let _ = write!(line, "{:<16} [", bar.name);
    for cell in 0..width {
        if cell < filled {
            line.push('#');
        } else if peak > filled && cell + 1 == peak {
            line.push('|');
        } else {
            line.push('.');
        }
    }
    let _ = write!(line, "] {:.2}", bar.level);
    line
}

/// Render every bar, colored by level, into one frame
pub fn render_frame<'a, I>(bars: I, width: usize, colored: bool) -> String
where
    I: IntoIterator<Item = &'a LevelBar>,
{
    let mut frame = String::new();
    for bar in bars {
        if colored {
            let _ = writeln!(
                frame,
                "{}{}{}",
                level_to_color(bar.level).ansi_fg(),
                format_bar(bar, width),
                ANSI_RESET
            );
        } else {
            let _ = writeln!(frame, "{}", format_bar(bar, width));
        }
    }
    frame
}

fn cells(level: f32, width: usize) -> usize {
    if level.is_nan() {
        return 0;
    }
    (level.clamp(0.0, 1.0) * width as f32).round() as usize
}
