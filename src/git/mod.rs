//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Every repository read and
//! write flows through [`RepositoryHandle`], which shells out to the git
//! CLI through the [`CommandRunner`] capability. No other module spawns git.
//!
//! # Responsibilities
//!
//! - Repository discovery and cloning
//! - Working tree state (clean, unpushed commits)
//! - Ref resolution and remote visibility (branches, tags, commits)
//! - Branch checkout, creation and deletion
//! - Staging, committing and pushing
//!
//! # Invariants
//!
//! - A handle is bound to one working directory and its `origin` remote
//! - Nothing is cached between calls
//! - No operation retries; a failing git invocation is immediately an error

mod interface;
pub mod mock;
mod runner;

pub use interface::{GitError, RepositoryHandle, ORIGIN};
pub use runner::{format_command, CommandOutput, CommandRunner, SystemRunner};
