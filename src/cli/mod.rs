//! cli
//!
//! Command-line interface layer for ris-puppet.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT perform repository mutations directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`], which owns every workflow.

pub mod args;
pub mod commands;

pub use args::{usage_error_summary, Cli, Shell};

use crate::engine;
use anyhow::Result;

/// Build the execution context from global flags.
pub fn context(cli: &Cli) -> engine::Context {
    engine::Context {
        cwd: cli.cwd.clone(),
        config: cli.config.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        trace: cli.trace,
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = context(&cli);
    commands::dispatch(cli.command, &ctx)
}
