// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Color palettes. A [`Theme`] is passed to every renderer.

use clap::ValueEnum;
use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    /// Basic terminal colors
    #[default]
    Standard,
    Neon,
    Cyber,
    Scifi,
    Tech,
    Synthwave,
}

/// Colors for the semantic roles used across tables and panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColors {
    /// CPU partition, headers
    pub primary: Color,
    /// Running jobs, GPU partition
    pub success: Color,
    /// Pending jobs, time running out
    pub warning: Color,
    /// Failed jobs, urgent warnings
    pub danger: Color,
    /// Fat partition, unknown GPU models
    pub accent: Color,
    /// VDI partition, array jobs
    pub info: Color,
}

const fn hex(rgb: u32) -> Color {
    Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

impl Palette {
    pub fn colors(self) -> PaletteColors {
        match self {
            Palette::Standard => PaletteColors {
                primary: Color::Blue,
                success: Color::Green,
                warning: Color::Yellow,
                danger: Color::Red,
                accent: Color::Magenta,
                info: Color::Cyan,
            },
            Palette::Neon => PaletteColors {
                primary: hex(0x0016ee),
                success: hex(0xdefe47),
                warning: hex(0xfe00fe),
                danger: hex(0x7700a6),
                accent: hex(0xfe00fe),
                info: hex(0x00b3fe),
            },
            Palette::Cyber => PaletteColors {
                primary: hex(0x1261d1),
                success: hex(0x08deea),
                warning: hex(0xfd8090),
                danger: hex(0xaf43be),
                accent: hex(0xaf43be),
                info: hex(0xc4ffff),
            },
            Palette::Scifi => PaletteColors {
                primary: hex(0x44786a),
                success: hex(0x4d9e9b),
                warning: hex(0xdaae6d),
                danger: hex(0x8f704b),
                accent: hex(0x8f704b),
                info: hex(0x89e3f6),
            },
            Palette::Tech => PaletteColors {
                primary: hex(0x003062),
                success: hex(0x0a9cf5),
                warning: hex(0xffccdc),
                danger: hex(0xff184c),
                accent: hex(0xff577d),
                info: hex(0x0a9cf5),
            },
            Palette::Synthwave => PaletteColors {
                primary: hex(0x001eff),
                success: hex(0x00ff9f),
                warning: hex(0xd600ff),
                danger: hex(0xbd00ff),
                accent: hex(0xbd00ff),
                info: hex(0x00b8ff),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub colors: PaletteColors,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(Palette::Standard)
    }
}

impl Theme {
    pub fn new(palette: Palette) -> Self {
        Self {
            colors: palette.colors(),
        }
    }

    pub fn fg(&self, color: Color) -> Style {
        Style::default().fg(color)
    }

    pub fn primary(&self) -> Style {
        self.fg(self.colors.primary)
    }

    pub fn success(&self) -> Style {
        self.fg(self.colors.success)
    }

    pub fn warning(&self) -> Style {
        self.fg(self.colors.warning)
    }

    pub fn danger(&self) -> Style {
        self.fg(self.colors.danger)
    }

    pub fn accent(&self) -> Style {
        self.fg(self.colors.accent)
    }

    pub fn info(&self) -> Style {
        self.fg(self.colors.info)
    }

    pub fn bold(&self) -> Style {
        Style::default().add_modifier(Modifier::BOLD)
    }

    pub fn dim(&self) -> Style {
        Style::default().add_modifier(Modifier::DIM)
    }

    /// Traffic light for a utilization percentage
    pub fn load(&self, percent: f64, warn: f64, critical: f64) -> Style {
        if percent >= critical {
            self.fg(Color::Red)
        } else if percent >= warn {
            self.fg(Color::Yellow)
        } else {
            self.fg(Color::Green)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        assert_eq!(hex(0x00b8ff), Color::Rgb(0x00, 0xb8, 0xff));
        assert_eq!(Palette::Synthwave.colors().primary, Color::Rgb(0x00, 0x1e, 0xff));
    }

    #[test]
    fn test_palette_names() {
        let names: Vec<String> = Palette::value_variants()
            .iter()
            .filter_map(|p| p.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["standard", "neon", "cyber", "scifi", "tech", "synthwave"]);
    }

    #[test]
    fn test_load_thresholds() {
        let theme = Theme::default();
        assert_eq!(theme.load(85.0, 50.0, 80.0).fg, Some(Color::Red));
        assert_eq!(theme.load(50.0, 50.0, 80.0).fg, Some(Color::Yellow));
        assert_eq!(theme.load(10.0, 50.0, 80.0).fg, Some(Color::Green));
    }
}
