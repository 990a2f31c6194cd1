//! TOML configuration.
//!
//! ```toml
//! [storage]
//! root = "./data"            # raw/, cleaned/ and activity.log live here
//!
//! [decode]
//! primary_encoding = "utf-8"
//! fallback_encoding = "latin1"
//!
//! [preview]
//! clean_rows = 10
//! view_rows = 20
//! log_lines = 50
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```
//!
//! Every section is optional; missing keys take the defaults shown above.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Overrides `<root>/raw`.
    #[serde(default)]
    pub raw_dir: Option<PathBuf>,
    /// Overrides `<root>/cleaned`.
    #[serde(default)]
    pub cleaned_dir: Option<PathBuf>,
    /// Overrides `<root>/activity.log`.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            raw_dir: None,
            cleaned_dir: None,
            log_file: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./data")
}

impl StorageConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.raw_dir
            .clone()
            .unwrap_or_else(|| self.root.join("raw"))
    }

    pub fn cleaned_dir(&self) -> PathBuf {
        self.cleaned_dir
            .clone()
            .unwrap_or_else(|| self.root.join("cleaned"))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.root.join("activity.log"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DecodeConfig {
    #[serde(default = "default_primary_encoding")]
    pub primary_encoding: String,
    #[serde(default = "default_fallback_encoding")]
    pub fallback_encoding: String,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            primary_encoding: default_primary_encoding(),
            fallback_encoding: default_fallback_encoding(),
        }
    }
}

fn default_primary_encoding() -> String {
    "utf-8".to_string()
}
fn default_fallback_encoding() -> String {
    "latin1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreviewConfig {
    #[serde(default = "default_clean_rows")]
    pub clean_rows: usize,
    #[serde(default = "default_view_rows")]
    pub view_rows: usize,
    #[serde(default = "default_log_lines")]
    pub log_lines: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            clean_rows: default_clean_rows(),
            view_rows: default_view_rows(),
            log_lines: default_log_lines(),
        }
    }
}

fn default_clean_rows() -> usize {
    10
}
fn default_view_rows() -> usize {
    20
}
fn default_log_lines() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Loads `path` if it exists, otherwise falls back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    for (key, label) in [
        ("decode.primary_encoding", &config.decode.primary_encoding),
        ("decode.fallback_encoding", &config.decode.fallback_encoding),
    ] {
        if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
            anyhow::bail!("{} is not a known encoding label: '{}'", key, label);
        }
    }

    if config.preview.clean_rows == 0 {
        anyhow::bail!("preview.clean_rows must be >= 1");
    }
    if config.preview.view_rows == 0 {
        anyhow::bail!("preview.view_rows must be >= 1");
    }
    if config.preview.log_lines == 0 {
        anyhow::bail!("preview.log_lines must be >= 1");
    }

    Ok(())
}
