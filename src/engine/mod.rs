//! engine
//!
//! Orchestrates actions against module and control repositories.
//!
//! # Architecture
//!
//! The engine is the central coordinator for every ris-puppet action:
//!
//! 1. **Dispatch**: resolve the [`Action`] through the closed dispatch table
//! 2. **Gate**: check the environment policy before touching any repository
//! 3. **Prepare**: verify module repository state, prepare the control repo
//! 4. **Mutate**: rewrite the pin file, commit, optionally push
//!
//! # Invariants
//!
//! - Settings are an explicit immutable value handed to each workflow
//! - All repository access flows through [`crate::git::RepositoryHandle`]
//! - Scratch clones never outlive the action that created them
//! - Failures are not retried and committed steps are not rolled back
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rispuppet::engine::{dispatch, Action, ActionOptions, Context};
//! use rispuppet::git::SystemRunner;
//!
//! let outcome = dispatch(Action::List, &ActionOptions::default(), &Context::default(),
//!     Arc::new(SystemRunner::new()))?;
//! ```

pub mod action;
pub mod environment;
pub mod error;
pub mod module;
pub mod scratch;

pub use action::{dispatch, dispatch_with, Action, ActionOptions, ActionOutcome};
pub use environment::EnvironmentWorkflow;
pub use error::{ErrorKind, Violation, WorkflowError};
pub use module::{
    parse_origin_url, ModuleAction, ModuleRequest, ModuleWorkflow, WorkflowResult, WorkflowState,
};
pub use scratch::ScratchSpace;

use std::path::PathBuf;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Explicit settings file.
    pub config: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Print full diagnostics on failure.
    pub trace: bool,
}

impl Context {
    /// The directory actions run from.
    pub fn work_dir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}
