use anyhow::Context;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "lectern";

/// Width the `=` key resets to, unless configured otherwise.
pub const DEFAULT_WIDTH: u16 = 80;

/// Lines skipped by the space key.
pub const DEFAULT_SCROLL_STRIDE: usize = 80;

pub const DEFAULT_WIDTH_STEP: u16 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_width")]
    pub default_width: u16,

    #[serde(default = "default_scroll_stride")]
    pub scroll_stride: usize,

    #[serde(default = "default_width_step")]
    pub width_step: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_width() -> u16 {
    DEFAULT_WIDTH
}

fn default_scroll_stride() -> usize {
    DEFAULT_SCROLL_STRIDE
}

fn default_width_step() -> u16 {
    DEFAULT_WIDTH_STEP
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            default_width: DEFAULT_WIDTH,
            scroll_stride: DEFAULT_SCROLL_STRIDE,
            width_step: DEFAULT_WIDTH_STEP,
            log_level: default_log_level(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl Settings {
    /// Reads the user's config file. A missing file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("failed to parse settings in {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        // An empty file deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings = Settings::from_yaml("scroll_stride: 40\n").unwrap();

        assert_eq!(settings.scroll_stride, 40);
        assert_eq!(settings.default_width, DEFAULT_WIDTH);
        assert_eq!(settings.width_step, DEFAULT_WIDTH_STEP);
        assert_eq!(settings.version, CURRENT_VERSION);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Settings::from_yaml("").unwrap(), Settings::default());
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(Settings::from_yaml("default_width: [1, 2").is_err());
    }

    #[test]
    fn test_log_level_falls_back_to_info() {
        let mut settings = Settings::default();
        settings.log_level = "debug".to_string();
        assert_eq!(settings.log_level_filter(), LevelFilter::Debug);

        settings.log_level = "chatty".to_string();
        assert_eq!(settings.log_level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "default_width: 72\nlog_level: warn\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();

        assert_eq!(settings.default_width, 72);
        assert_eq!(settings.log_level_filter(), LevelFilter::Warn);
    }
}
