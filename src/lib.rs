//! ris-puppet - Manage module pins in an r10k control repository
//!
//! ris-puppet records, per environment (a branch of the control repository),
//! which version of each Puppet module is deployed, by rewriting the
//! control repository's Puppetfile through git.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Action dispatch and the module/environment workflows
//! - [`core`] - Domain types, the Puppetfile model, policy and configuration
//! - [`git`] - Single interface for all Git operations
//! - [`validate`] - Syntax checks for module repositories
//! - [`ui`] - Output formatting
//! - [`logging`] - Diagnostic tracing setup
//!
//! # Correctness Invariants
//!
//! 1. Protected environments are never changed without `--force`
//! 2. Only commits visible at the module's origin are pinned
//! 3. The Puppetfile is rewritten from a clean, freshly pulled checkout
//! 4. Scratch clones are removed when the action ends

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod logging;
pub mod ui;
pub mod validate;
