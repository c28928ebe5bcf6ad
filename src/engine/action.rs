//! engine::action
//!
//! The closed set of actions and their dispatch table.
//!
//! Every user-facing action resolves to one [`Action`] variant and is routed
//! by [`dispatch`] to its workflow. Settings are loaded once, and only for
//! actions that touch the control repository.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::environment::EnvironmentWorkflow;
use super::error::WorkflowError;
use super::module::{ModuleAction, ModuleRequest, ModuleWorkflow, WorkflowResult};
use super::Context;
use crate::core::config::Settings;
use crate::core::types::{EnvironmentName, ModuleId};
use crate::git::{CommandRunner, RepositoryHandle};
use crate::validate::{self, ValidationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Deploy,
    Pin,
    Remove,
    Unpin,
    Validate,
    List,
    Create,
    Destroy,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Deploy,
        Action::Pin,
        Action::Remove,
        Action::Unpin,
        Action::Validate,
        Action::List,
        Action::Create,
        Action::Destroy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Deploy => "deploy",
            Action::Pin => "pin",
            Action::Remove => "remove",
            Action::Unpin => "unpin",
            Action::Validate => "validate",
            Action::List => "list",
            Action::Create => "create",
            Action::Destroy => "destroy",
        }
    }

    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.name() == name)
    }

    pub fn needs_settings(self) -> bool {
        self != Action::Validate
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed options, shared by every action. Each action reads the subset
/// it understands.
#[derive(Debug, Clone, Default)]
pub struct ActionOptions {
    pub environment: Option<EnvironmentName>,
    pub from: Option<EnvironmentName>,
    pub reference: Option<String>,
    pub module: Option<ModuleId>,
    pub comment: Option<String>,
    pub force: bool,
}

#[derive(Debug)]
pub enum ActionOutcome {
    Module(WorkflowResult),
    Validated(ValidationReport),
    Environments(Vec<String>),
    Created {
        from: EnvironmentName,
        environment: EnvironmentName,
    },
    Destroyed {
        environment: EnvironmentName,
    },
}

/// Run `action` to completion.
pub fn dispatch(
    action: Action,
    options: &ActionOptions,
    ctx: &Context,
    runner: Arc<dyn CommandRunner>,
) -> Result<ActionOutcome, WorkflowError> {
    let work_dir = ctx.work_dir().map_err(WorkflowError::Scratch)?;
    debug!(%action, work_dir = %work_dir.display(), "dispatching");

    if !action.needs_settings() {
        return validate_module(runner, &work_dir);
    }
    let settings = Settings::load(ctx.config.as_deref())?;
    dispatch_with(action, options, &settings, runner, &work_dir)
}

/// Dispatch against already loaded settings.
pub fn dispatch_with(
    action: Action,
    options: &ActionOptions,
    settings: &Settings,
    runner: Arc<dyn CommandRunner>,
    work_dir: &Path,
) -> Result<ActionOutcome, WorkflowError> {
    match action {
        Action::Deploy => run_module(ModuleAction::Deploy, options, settings, runner, work_dir),
        Action::Pin => run_module(ModuleAction::Pin, options, settings, runner, work_dir),
        Action::Remove => run_module(ModuleAction::Remove, options, settings, runner, work_dir),
        Action::Unpin => run_module(ModuleAction::Unpin, options, settings, runner, work_dir),
        Action::Validate => validate_module(runner, work_dir),
        Action::List => {
            let environments = EnvironmentWorkflow::new(settings, runner).list()?;
            Ok(ActionOutcome::Environments(environments))
        }
        Action::Create => {
            let from = options
                .from
                .clone()
                .ok_or(WorkflowError::MissingOption("--from"))?;
            let environment = options
                .environment
                .clone()
                .ok_or(WorkflowError::MissingOption("--env"))?;
            EnvironmentWorkflow::new(settings, runner).create(&from, &environment)?;
            Ok(ActionOutcome::Created { from, environment })
        }
        Action::Destroy => {
            let environment = options
                .environment
                .clone()
                .ok_or(WorkflowError::MissingOption("--env"))?;
            EnvironmentWorkflow::new(settings, runner).destroy(&environment)?;
            Ok(ActionOutcome::Destroyed { environment })
        }
    }
}

fn run_module(
    action: ModuleAction,
    options: &ActionOptions,
    settings: &Settings,
    runner: Arc<dyn CommandRunner>,
    work_dir: &Path,
) -> Result<ActionOutcome, WorkflowError> {
    let request = ModuleRequest {
        environment: options.environment.clone(),
        reference: options.reference.clone(),
        module: options.module.clone(),
        comment: options.comment.clone(),
        force: options.force,
    };
    let result = ModuleWorkflow::new(settings, runner, work_dir).run(action, &request)?;
    Ok(ActionOutcome::Module(result))
}

fn validate_module(
    runner: Arc<dyn CommandRunner>,
    work_dir: &Path,
) -> Result<ActionOutcome, WorkflowError> {
    let repo = RepositoryHandle::discover(runner.clone(), work_dir)?;
    let files = validate::list_files(repo.work_dir())?;
    debug!(count = files.len(), "validating files");
    Ok(ActionOutcome::Validated(validate::validate_files(
        runner.as_ref(),
        &files,
    )))
}
