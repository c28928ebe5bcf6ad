//! core::config
//!
//! Settings document schema and loading.
//!
//! # Overview
//!
//! Settings are read once per process into an immutable [`Settings`] value
//! that is passed explicitly into the workflows. There is no global state.
//!
//! # Locations
//!
//! Searched in order, first existing file wins:
//! 1. `--config <path>` (must exist when given)
//! 2. `$RIS_PUPPET_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/ris-puppet/config.toml`
//! 4. `~/.ris-puppet/config.toml`
//! 5. `/etc/ris-puppet/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use rispuppet::core::config::Settings;
//!
//! let settings = Settings::load(None).unwrap();
//! println!("Control repo: {}", settings.control_repo_url());
//! println!("Default environment: {}", settings.default_environment());
//! ```

pub mod schema;

pub use schema::SettingsFile;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::policy::EnvironmentPolicy;
use crate::core::types::EnvironmentName;

/// Default pin file name inside the control repository.
pub const DEFAULT_PUPPETFILE: &str = "Puppetfile";

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV: &str = "RIS_PUPPET_CONFIG";

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("{0} is required in config file")]
    MissingKey(&'static str),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no config file found (searched: {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validated, immutable settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub(crate) control_repo_url: String,
    pub(crate) default_environment: EnvironmentName,
    pub(crate) protected_environments: Vec<EnvironmentName>,
    pub(crate) module_groups: Vec<String>,
    pub(crate) puppetfile: PathBuf,
    pub(crate) scratch_dir: Option<PathBuf>,
    pub(crate) source: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the first existing location.
    ///
    /// # Errors
    ///
    /// Returns an error if no file exists, or the file found cannot be
    /// read, parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        let searched = Self::search_paths();
        match searched.iter().find(|p| p.is_file()) {
            Some(path) => Self::from_path(path),
            None => Err(ConfigError::NotFound { searched }),
        }
    }

    /// Candidate locations, in precedence order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("ris-puppet/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".ris-puppet/config.toml"));
        }
        paths.push(PathBuf::from("/etc/ris-puppet/config.toml"));
        paths
    }

    /// Read, parse and validate one settings file.
    pub fn from_path(path: &Path) -> Result<Settings, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: SettingsFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut settings = file.validate()?;
        settings.source = Some(path.to_path_buf());
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Settings, ConfigError> {
        let file: SettingsFile = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        file.validate()
    }

    /// Override the scratch directory (used by tests).
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn control_repo_url(&self) -> &str {
        &self.control_repo_url
    }

    pub fn default_environment(&self) -> &EnvironmentName {
        &self.default_environment
    }

    /// Whether `group` is a permitted module namespace.
    pub fn is_module_group(&self, group: &str) -> bool {
        self.module_groups.iter().any(|g| g == group)
    }

    /// Pin file path relative to the control repository root.
    pub fn puppetfile(&self) -> &Path {
        &self.puppetfile
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    /// The protection policy built from `protected_environments`.
    pub fn policy(&self) -> EnvironmentPolicy {
        EnvironmentPolicy::new(self.protected_environments.iter().cloned())
    }

    /// The file these settings were loaded from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
