//! environment command - List, create and destroy environments

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::args::EnvironmentCommand;
use crate::engine::{self, Action, ActionOptions, ActionOutcome, Context};
use crate::git::SystemRunner;
use crate::ui::output::{self, Verbosity};

/// Run an environment subcommand; no subcommand lists.
pub fn environment(ctx: &Context, command: Option<EnvironmentCommand>) -> Result<()> {
    let command = command.unwrap_or(EnvironmentCommand::List { json: false });
    let json = matches!(command, EnvironmentCommand::List { json: true });
    let (action, options) = match command {
        EnvironmentCommand::List { .. } => (Action::List, ActionOptions::default()),
        EnvironmentCommand::Create { from, environment } => (
            Action::Create,
            ActionOptions {
                from: Some(from),
                environment: Some(environment),
                ..Default::default()
            },
        ),
        EnvironmentCommand::Destroy { environment } => (
            Action::Destroy,
            ActionOptions {
                environment: Some(environment),
                ..Default::default()
            },
        ),
    };

    let runner = Arc::new(SystemRunner::new());
    let outcome = engine::dispatch(action, &options, ctx, runner)?;

    if let (true, ActionOutcome::Environments(names)) = (json, &outcome) {
        let rendered =
            serde_json::to_string_pretty(names).context("Failed to serialize environments")?;
        println!("{}", rendered);
        return Ok(());
    }

    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    output::print(output::format_outcome(&outcome, verbosity), verbosity);
    Ok(())
}
