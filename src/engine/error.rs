//! engine::error
//!
//! Workflow error taxonomy.
//!
//! Every failure terminates the current action where it is raised. Nothing
//! is retried and nothing already committed is rolled back. Each error maps
//! to exactly one [`ErrorKind`]:
//!
//! | Kind            | Raised for                                              |
//! |-----------------|---------------------------------------------------------|
//! | `Configuration` | missing/invalid setting or command option               |
//! | `Precondition`  | dirty tree, unpushed commits, protected environment,    |
//! |                 | unresolvable or remotely invisible ref, branch conflicts|
//! | `ExternalTool`  | git (or another tool) exiting non-zero or not starting  |
//! | `Parse`         | pin file missing or unreadable                          |

use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::pinfile::PinFileError;
use crate::core::types::{EnvironmentName, TypeError};
use crate::git::GitError;
use crate::validate::ValidationError;

/// The four failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Precondition,
    ExternalTool,
    Parse,
}

/// Preconditions checked by the workflows themselves (the repository
/// handle's guards report through [`GitError`]).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("you must use a merge request to perform an action in the '{environment}' environment (use --force for emergencies only)")]
    ProtectedEnvironment { environment: EnvironmentName },

    #[error("unable to resolve '{reference}'")]
    UnresolvableRef { reference: String },

    #[error("ref {reference:?} contains a quote and cannot be written to the Puppetfile")]
    QuotedRef { reference: String },

    #[error("'{reference}' does not exist at origin")]
    RefNotOnRemote { reference: String },

    #[error("control repository has no {environment} branch, please use 'environment create' to create a new environment")]
    MissingEnvironment { environment: EnvironmentName },

    #[error("module repository {path} has no origin remote")]
    NoOrigin { path: PathBuf },

    #[error("cannot determine group and project from origin url '{url}'")]
    UnknownOrigin { url: String },

    #[error("unsupported git group: {group}")]
    UnsupportedGroup { group: String },

    #[error("'{project}' is not a valid module name: {reason}")]
    InvalidModule { project: String, reason: String },

    #[error("validation failed for {failures} file(s)")]
    ValidationFailed { failures: usize },
}

/// Errors from running an action.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} is required")]
    MissingOption(&'static str),

    #[error(transparent)]
    InvalidOption(#[from] TypeError),

    #[error(transparent)]
    Precondition(#[from] Violation),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    PinFile(#[from] PinFileError),

    #[error("failed to prepare scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Config(_)
            | WorkflowError::MissingOption(_)
            | WorkflowError::InvalidOption(_) => ErrorKind::Configuration,
            WorkflowError::Precondition(_) => ErrorKind::Precondition,
            WorkflowError::Git(e) if e.is_precondition() => ErrorKind::Precondition,
            WorkflowError::Git(_) | WorkflowError::Scratch(_) | WorkflowError::Validation(_) => {
                ErrorKind::ExternalTool
            }
            WorkflowError::PinFile(_) => ErrorKind::Parse,
        }
    }

    /// The underlying git error, if any.
    pub fn git_error(&self) -> Option<&GitError> {
        match self {
            WorkflowError::Git(e) => Some(e),
            _ => None,
        }
    }

    /// The violated precondition, if this is a workflow-level violation.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            WorkflowError::Precondition(v) => Some(v),
            _ => None,
        }
    }
}
