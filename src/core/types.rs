//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`EnvironmentName`] - Validated environment (control repo branch) name
//! - [`ModuleId`] - Pin identity: `name` or `namespace/name`
//! - [`Oid`] - Git object identifier (SHA)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use rispuppet::core::types::{EnvironmentName, ModuleId, Oid};
//!
//! // Valid constructions
//! let env = EnvironmentName::new("production").unwrap();
//! let module = ModuleId::external("puppetlabs", "stdlib").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//!
//! // Invalid constructions fail at creation time
//! assert!(EnvironmentName::new("invalid..name").is_err());
//! assert!(ModuleId::new("no-dashes").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid environment name: {0}")]
    InvalidEnvironmentName(String),

    #[error("invalid module name: {0}")]
    InvalidModuleName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated environment name.
///
/// Environments are branches of the control repository, so names follow
/// Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use rispuppet::core::types::EnvironmentName;
///
/// let env = EnvironmentName::new("feature/new_role").unwrap();
/// assert_eq!(env.as_str(), "feature/new_role");
///
/// assert!(EnvironmentName::new("").is_err());
/// assert!(EnvironmentName::new(".hidden").is_err());
/// assert!(EnvironmentName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Create a new validated environment name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidEnvironmentName` if the name violates
    /// Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let invalid = |msg: &str| Err(TypeError::InvalidEnvironmentName(msg.to_string()));

        if name.is_empty() {
            return invalid("environment name cannot be empty");
        }
        if name == "@" {
            return invalid("environment name cannot be '@' (reserved)");
        }
        if name.starts_with('.') {
            return invalid("environment name cannot start with '.'");
        }
        if name.starts_with('-') {
            return invalid("environment name cannot start with '-'");
        }
        if name.ends_with(".lock") {
            return invalid("environment name cannot end with '.lock'");
        }
        if name.ends_with('/') {
            return invalid("environment name cannot end with '/'");
        }
        for seq in ["..", "@{", "//"] {
            if name.contains(seq) {
                return Err(TypeError::InvalidEnvironmentName(format!(
                    "environment name cannot contain '{seq}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        for c in INVALID_CHARS {
            if name.contains(c) {
                return Err(TypeError::InvalidEnvironmentName(format!(
                    "environment name cannot contain '{c}'"
                )));
            }
        }

        if name.chars().any(|c| c.is_ascii_control()) {
            return invalid("environment name cannot contain control characters");
        }

        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') {
                return invalid("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return invalid("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the environment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EnvironmentName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EnvironmentName> for String {
    fn from(name: EnvironmentName) -> Self {
        name.0
    }
}

impl AsRef<str> for EnvironmentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a pinned module.
///
/// Either an internal module (`risrole_base`) or a namespaced external
/// module (`puppetlabs/stdlib`). Every name part is restricted to
/// `[A-Za-z0-9_]+`, the character set the pin file grammar accepts, so any
/// identity can be rendered and parsed back.
///
/// # Example
///
/// ```
/// use rispuppet::core::types::ModuleId;
///
/// let internal = ModuleId::new("risprof_web").unwrap();
/// assert!(!internal.is_external());
///
/// let external = ModuleId::new("puppetlabs/stdlib").unwrap();
/// assert_eq!(external.namespace(), Some("puppetlabs"));
/// assert_eq!(external.name(), "stdlib");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Create an identity from `name` or `namespace/name`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidModuleName` if a part is empty or contains
    /// characters outside `[A-Za-z0-9_]`.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        let mut parts = id.splitn(2, '/');
        for part in parts.by_ref() {
            validate_part(part)?;
        }
        Ok(Self(id))
    }

    /// Create an external identity `namespace/name`.
    pub fn external(namespace: &str, name: &str) -> Result<Self, TypeError> {
        validate_part(namespace)?;
        validate_part(name)?;
        Ok(Self(format!("{namespace}/{name}")))
    }

    /// The namespace of an external module.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once('/').map(|(ns, _)| ns)
    }

    /// The bare module name (without namespace).
    pub fn name(&self) -> &str {
        self.0.split_once('/').map_or(&self.0, |(_, name)| name)
    }

    /// Whether this is a namespaced (external) module.
    pub fn is_external(&self) -> bool {
        self.0.contains('/')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_part(part: &str) -> Result<(), TypeError> {
    if part.is_empty() {
        return Err(TypeError::InvalidModuleName(
            "module name parts cannot be empty".into(),
        ));
    }
    if let Some(c) = part
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(TypeError::InvalidModuleName(format!(
            "'{part}' contains '{c}', only letters, digits and '_' are allowed"
        )));
    }
    Ok(())
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use rispuppet::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(9), "abc123def");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().trim().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Check whether a string looks like a full object id.
    pub fn is_full_hex(s: &str) -> bool {
        Self::validate(s).is_ok()
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters. If `len` exceeds the OID length,
    /// returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
