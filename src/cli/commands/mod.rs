//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Maps its arguments onto an engine [`crate::engine::Action`]
//! 2. Calls the engine to execute the action
//! 3. Formats and displays output
//!
//! Handlers do NOT touch repositories directly.

mod completion;
mod environment;
mod module;

pub use completion::{completion, write_completion};
pub use environment::environment;
pub use module::module;

use crate::cli::args::Command;
use crate::engine::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Module { action } => module::module(ctx, action),
        Command::Environment { action } => environment::environment(ctx, action),
        Command::Completion { shell } => completion::completion(shell),
    }
}
