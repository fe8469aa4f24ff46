//! Configuration file support for symscan.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/symscan/config.toml` (lowest priority)
//! - Project-local: `.symscan.toml` (searched up directory tree)
//! - `SYMSCAN_BACKEND_URL` and CLI flags (highest priority, applied
//!   separately by clap)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use symscan_pipeline::{BackendConfig, ConfigError};
use tracing::{debug, info, warn};

/// Name of the project-local config file.
pub const PROJECT_FILE: &str = ".symscan.toml";

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned summary table.
    #[default]
    Table,
    /// Summary rows as CSV.
    Csv,
    /// The raw results payload as JSON.
    Json,
}

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend connection settings.
    pub backend: BackendSection,
    /// Output formatting settings.
    pub output: OutputSection,
}

/// Backend connection settings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Base URL of the detection backend.
    pub url: Option<String>,
    /// Clear backend artifacts before uploading.
    pub reset: Option<bool>,
}

/// Output formatting settings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Default output format.
    pub format: Option<OutputFormat>,
}

impl AppConfig {
    /// Load configuration from the XDG and project-local files.
    ///
    /// Missing files are silently ignored; unreadable or invalid files
    /// are logged and skipped.
    #[must_use]
    pub fn load() -> Self {
        let cwd = std::env::current_dir().ok();
        Self::load_from(xdg_config_path().as_deref(), cwd.as_deref())
    }

    /// Load configuration with explicit XDG file and starting directory.
    #[must_use]
    pub fn load_from(xdg_path: Option<&Path>, cwd: Option<&Path>) -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_path {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = cwd.and_then(find_config_in_parents) {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        config
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.backend.url = other.backend.url.or_else(|| self.backend.url.take());
        self.backend.reset = other.backend.reset.or(self.backend.reset);
        self.output.format = other.output.format.or(self.output.format);
    }
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Validated backend address.
    pub backend: BackendConfig,
    /// Whether to clear backend artifacts before uploading.
    pub reset: bool,
    /// How results are printed.
    pub format: OutputFormat,
}

impl Settings {
    /// Layer command-line values over `config`, then defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the winning backend URL is invalid.
    pub fn resolve(
        config: AppConfig,
        backend: Option<&str>,
        format: Option<OutputFormat>,
        no_reset: bool,
    ) -> Result<Self, ConfigError> {
        let backend = match backend.or(config.backend.url.as_deref()) {
            Some(url) => BackendConfig::new(url)?,
            None => BackendConfig::default(),
        };
        Ok(Self {
            backend,
            reset: !no_reset && config.backend.reset.unwrap_or(true),
            format: format.or(config.output.format).unwrap_or_default(),
        })
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("symscan").join("config.toml"))
}

/// Search for [`PROJECT_FILE`] in `start` and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE))
        .find(|path| path.exists())
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
