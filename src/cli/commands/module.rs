//! module command - Pin, deploy, unpin, remove and validate the current module

use std::sync::Arc;

use anyhow::Result;

use crate::cli::args::{ModuleCommand, PinArgs, RemoveArgs};
use crate::engine::{self, Action, ActionOptions, ActionOutcome, Context, Violation, WorkflowError};
use crate::git::{CommandRunner, SystemRunner};
use crate::ui::output::{self, Verbosity};
use crate::validate;

/// Map a module subcommand onto its action and options.
pub fn resolve(command: ModuleCommand) -> (Action, ActionOptions) {
    match command {
        ModuleCommand::Deploy(args) => (Action::Deploy, pin_options(args)),
        ModuleCommand::Pin(args) => (Action::Pin, pin_options(args)),
        ModuleCommand::Remove(args) => (Action::Remove, remove_options(args)),
        ModuleCommand::Unpin(args) => (Action::Unpin, remove_options(args)),
        ModuleCommand::Validate => (Action::Validate, ActionOptions::default()),
    }
}

fn pin_options(args: PinArgs) -> ActionOptions {
    ActionOptions {
        environment: args.environment,
        reference: args.reference,
        comment: args.comment,
        force: args.force,
        ..Default::default()
    }
}

fn remove_options(args: RemoveArgs) -> ActionOptions {
    ActionOptions {
        environment: args.environment,
        module: args.module,
        comment: args.comment,
        force: args.force,
        ..Default::default()
    }
}

/// Run a module subcommand.
pub fn module(ctx: &Context, command: ModuleCommand) -> Result<()> {
    let (action, options) = resolve(command);
    let runner: Arc<dyn CommandRunner> = match action {
        Action::Validate => Arc::new(validate::checker_runner()),
        _ => Arc::new(SystemRunner::new()),
    };
    let outcome = engine::dispatch(action, &options, ctx, runner)?;

    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let rendered = output::format_outcome(&outcome, verbosity);
    if !rendered.is_empty() {
        output::print(rendered, verbosity);
    }

    if let ActionOutcome::Validated(report) = &outcome {
        if !report.passed() {
            let failures = report.failed_files();
            return Err(WorkflowError::from(Violation::ValidationFailed { failures }).into());
        }
    }
    Ok(())
}
