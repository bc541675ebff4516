use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::projection::{HeaderLocale, TagOptions, Timezone};
use crate::sheet::layout::LayoutConfig;
use crate::source::FooterPolicy;

/// File looked up in the current directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".review-export.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .review-export.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,

    /// Inline comment tag parsing
    #[serde(default)]
    pub tags: TagOptions,

    /// Finishing pass over the written workbook
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub timezone: Timezone,

    #[serde(default)]
    pub headers: HeaderLocale,

    /// Whether the dump ends with a query statistics line
    #[serde(default)]
    pub footer: FooterPolicy,
}

impl Config {
    /// Load configuration from .review-export.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path. Unlike `load`, a missing file is an error.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}
