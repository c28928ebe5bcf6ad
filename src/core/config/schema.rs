//! core::config::schema
//!
//! On-disk settings document.
//!
//! # Example
//!
//! ```toml
//! control_repo_url = "git@git.example.com:puppet-config/control_repo.git"
//! default_environment = "development"
//! protected_environments = ["production"]
//! module_groups = ["puppet-modules-int", "puppet-modules-ext"]
//!
//! # Optional
//! puppetfile = "Puppetfile"
//! scratch_dir = "/var/tmp/ris-puppet"
//! ```
//!
//! # Validation
//!
//! Every field is optional at the serde level so a missing key is reported
//! by name instead of as a generic parse error. [`SettingsFile::validate`]
//! enforces required keys and value formats.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Settings};
use crate::core::types::EnvironmentName;

/// Raw settings as read from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// URL of the control repository
    pub control_repo_url: Option<String>,

    /// Environment used when none is given on the command line
    pub default_environment: Option<String>,

    /// Environments that require `--force` to mutate directly
    pub protected_environments: Option<Vec<String>>,

    /// Git groups a module repository may live in
    pub module_groups: Option<Vec<String>>,

    /// Pin file path inside the control repository
    pub puppetfile: Option<PathBuf>,

    /// Parent directory for scratch clones
    pub scratch_dir: Option<PathBuf>,
}

impl SettingsFile {
    /// Validate the document and build immutable [`Settings`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` for absent required keys and
    /// `ConfigError::InvalidValue` for malformed values.
    pub fn validate(self) -> Result<Settings, ConfigError> {
        let control_repo_url = self
            .control_repo_url
            .ok_or(ConfigError::MissingKey("control_repo_url"))?;
        if control_repo_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "control_repo_url cannot be empty".into(),
            ));
        }

        let default_environment = self
            .default_environment
            .ok_or(ConfigError::MissingKey("default_environment"))
            .and_then(|name| parse_environment("default_environment", name))?;

        let protected_environments = self
            .protected_environments
            .unwrap_or_default()
            .into_iter()
            .map(|name| parse_environment("protected_environments", name))
            .collect::<Result<Vec<_>, _>>()?;

        let module_groups = self
            .module_groups
            .ok_or(ConfigError::MissingKey("module_groups"))?;
        if module_groups.is_empty() {
            return Err(ConfigError::InvalidValue(
                "module_groups must list at least one group".into(),
            ));
        }
        if let Some(bad) = module_groups
            .iter()
            .find(|g| g.is_empty() || g.contains('/'))
        {
            return Err(ConfigError::InvalidValue(format!(
                "invalid module group '{bad}'"
            )));
        }

        let puppetfile = self
            .puppetfile
            .unwrap_or_else(|| PathBuf::from(super::DEFAULT_PUPPETFILE));
        if puppetfile.is_absolute() {
            return Err(ConfigError::InvalidValue(
                "puppetfile must be relative to the control repository".into(),
            ));
        }

        Ok(Settings {
            control_repo_url,
            default_environment,
            protected_environments,
            module_groups,
            puppetfile,
            scratch_dir: self.scratch_dir,
            source: None,
        })
    }
}

fn parse_environment(key: &str, name: String) -> Result<EnvironmentName, ConfigError> {
    EnvironmentName::new(name).map_err(|e| ConfigError::InvalidValue(format!("{key}: {e}")))
}
