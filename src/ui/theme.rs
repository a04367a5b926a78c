use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use log::warn;
use ratatui::style::Color;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};

use crate::engine::confidence::ConfidenceLevel;

#[derive(Embed)]
#[folder = "assets/themes/"]
struct ThemeAssets;

pub const DEFAULT_THEME: &str = "catppuccin-mocha";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeColors {
    pub bg: String,
    pub fg: String,
    pub text_muted: String,
    pub accent: String,
    pub border: String,
    pub border_focused: String,
    pub header_bg: String,
    pub header_fg: String,
    pub bar_filled: String,
    pub bar_empty: String,
    pub card_front: String,
    pub card_back: String,
    pub error: String,
    pub warning: String,
    pub success: String,
    pub info: String,
}

fn user_themes_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("certdeck").join("themes"))
}

impl Theme {
    /// A user theme in `<config>/certdeck/themes/` shadows a bundled one of
    /// the same name.
    pub fn load(name: &str) -> Option<Self> {
        let filename = format!("{name}.toml");

        if let Some(path) = user_themes_dir().map(|dir| dir.join(&filename)) {
            if let Ok(content) = fs::read_to_string(&path) {
                match toml::from_str::<Theme>(&content) {
                    Ok(theme) => return Some(theme),
                    Err(e) => warn!("ignoring theme {}: {e}", path.display()),
                }
            }
        }

        let file = ThemeAssets::get(&filename)?;
        let content = std::str::from_utf8(file.data.as_ref()).ok()?;
        toml::from_str(content).ok()
    }

    /// Bundled and user theme names, sorted.
    pub fn available_themes() -> Vec<String> {
        let mut names: BTreeSet<String> = ThemeAssets::iter()
            .filter_map(|f| f.strip_suffix(".toml").map(String::from))
            .collect();
        if let Some(entries) = user_themes_dir().and_then(|dir| fs::read_dir(dir).ok()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.insert(stem.to_string());
                    }
                }
            }
        }
        names.into_iter().collect()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::load(DEFAULT_THEME).unwrap_or_else(|| Self {
            name: "fallback".to_string(),
            colors: ThemeColors::default(),
        })
    }
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            bg: "#1e1e2e".to_string(),
            fg: "#cdd6f4".to_string(),
            text_muted: "#6c7086".to_string(),
            accent: "#89b4fa".to_string(),
            border: "#45475a".to_string(),
            border_focused: "#89b4fa".to_string(),
            header_bg: "#313244".to_string(),
            header_fg: "#cdd6f4".to_string(),
            bar_filled: "#89b4fa".to_string(),
            bar_empty: "#313244".to_string(),
            card_front: "#181825".to_string(),
            card_back: "#24273a".to_string(),
            error: "#f38ba8".to_string(),
            warning: "#f9e2af".to_string(),
            success: "#a6e3a1".to_string(),
            info: "#74c7ec".to_string(),
        }
    }
}

macro_rules! color_accessors {
    ($($field:ident),* $(,)?) => {
        impl ThemeColors {
            $(
                pub fn $field(&self) -> Color {
                    Self::parse_color(&self.$field)
                }
            )*
        }
    };
}

color_accessors!(
    bg,
    fg,
    text_muted,
    accent,
    border,
    border_focused,
    header_bg,
    header_fg,
    bar_filled,
    bar_empty,
    card_front,
    card_back,
    error,
    warning,
    success,
    info,
);

impl ThemeColors {
    /// `#rrggbb` or `#rgb`; anything else renders white.
    pub fn parse_color(hex: &str) -> Color {
        let digits = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let rgb = match digits.len() {
            6 if digits.is_ascii() => (channel(&digits[0..2]), channel(&digits[2..4]), channel(&digits[4..6])),
            3 if digits.is_ascii() => {
                let short = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                (short(0), short(1), short(2))
            }
            _ => (None, None, None),
        };
        match rgb {
            (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
            _ => Color::White,
        }
    }

    /// Card and domain color tags from the catalog ("blue", "red", ...).
    pub fn tag_color(&self, tag: &str) -> Color {
        match tag {
            "blue" => Color::Blue,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "purple" | "magenta" => Color::Magenta,
            "cyan" => Color::Cyan,
            "gray" | "grey" => Color::Gray,
            "white" => Color::White,
            other if other.starts_with('#') => Self::parse_color(other),
            _ => self.accent(),
        }
    }

    pub fn level_color(&self, level: ConfidenceLevel) -> Color {
        match level {
            ConfidenceLevel::KnewIt => self.success(),
            ConfidenceLevel::QuickThink => self.info(),
            ConfidenceLevel::LongThink => self.warning(),
            ConfidenceLevel::Peeked => self.error(),
        }
    }
}
