use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth;

pub const MAX_AUTO_ADVANCE_MS: u64 = 5000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_auto_advance_ms")]
    pub auto_advance_ms: u64,
    #[serde(default)]
    pub last_user: Option<String>,
    #[serde(default = "default_remember_user")]
    pub remember_user: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_auto_advance_ms() -> u64 {
    500
}
fn default_remember_user() -> bool {
    true
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("certdeck")
        .to_string_lossy()
        .to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            auto_advance_ms: default_auto_advance_ms(),
            last_user: None,
            remember_user: default_remember_user(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("certdeck")
            .join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn auto_advance(&self) -> Duration {
        Duration::from_millis(self.auto_advance_ms)
    }

    /// Repair values a hand-edited file may carry: unknown theme, an
    /// out-of-range delay, a stale profile name.
    pub fn validate(&mut self, valid_themes: &[&str]) {
        if !valid_themes.contains(&self.theme.as_str()) {
            self.theme = default_theme();
        }
        self.auto_advance_ms = self.auto_advance_ms.min(MAX_AUTO_ADVANCE_MS);
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
        if self
            .last_user
            .as_deref()
            .is_some_and(|name| auth::identity_for(name).is_err())
        {
            self.last_user = None;
        }
    }

    /// Profile to sign in automatically at startup.
    pub fn remembered_user(&self) -> Option<&str> {
        if self.remember_user {
            self.last_user.as_deref()
        } else {
            None
        }
    }
}
