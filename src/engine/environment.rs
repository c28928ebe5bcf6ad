//! engine::environment
//!
//! Environment (control repository branch) lifecycle: list, create, destroy.
//!
//! `create` and `destroy` work in a scratch clone of the control repository
//! that is removed when the action ends, whatever the outcome.

use std::sync::Arc;

use tracing::info;

use super::error::WorkflowError;
use super::scratch::ScratchSpace;
use crate::core::config::Settings;
use crate::core::types::EnvironmentName;
use crate::git::{CommandRunner, RepositoryHandle, ORIGIN};

pub struct EnvironmentWorkflow<'a> {
    settings: &'a Settings,
    runner: Arc<dyn CommandRunner>,
}

impl<'a> EnvironmentWorkflow<'a> {
    pub fn new(settings: &'a Settings, runner: Arc<dyn CommandRunner>) -> Self {
        Self { settings, runner }
    }

    /// Environment names, as published on the control repository.
    pub fn list(&self) -> Result<Vec<String>, WorkflowError> {
        let mut heads =
            RepositoryHandle::list_remote_heads_at(self.runner.as_ref(), self.settings.control_repo_url())?;
        heads.sort();
        Ok(heads)
    }

    /// Branch `environment` off `from` and publish it.
    ///
    /// Fails before any local branch exists when `from` is not on the
    /// remote or `environment` already is.
    pub fn create(
        &self,
        from: &EnvironmentName,
        environment: &EnvironmentName,
    ) -> Result<(), WorkflowError> {
        let scratch = ScratchSpace::create(self.settings.scratch_dir())?;
        let control = self.clone_control(&scratch)?;
        control
            .assert_remote_branch_exists(from.as_str())?
            .assert_no_remote_branch_exists(environment.as_str())?;
        let source = format!("{ORIGIN}/{from}");
        control.create_branch_from(environment.as_str(), &source)?;
        info!(%from, %environment, "created environment");
        Ok(())
    }

    /// Delete the `environment` branch from the control repository.
    pub fn destroy(&self, environment: &EnvironmentName) -> Result<(), WorkflowError> {
        let scratch = ScratchSpace::create(self.settings.scratch_dir())?;
        let control = self.clone_control(&scratch)?;
        control
            .assert_remote_branch_exists(environment.as_str())?
            .destroy_remote_branch(environment.as_str())?;
        info!(%environment, "destroyed environment");
        Ok(())
    }

    fn clone_control(&self, scratch: &ScratchSpace) -> Result<RepositoryHandle, WorkflowError> {
        let control = RepositoryHandle::new(self.runner.clone(), scratch.control_repo_dir());
        control.clone_from(self.settings.control_repo_url())?;
        Ok(control)
    }
}
