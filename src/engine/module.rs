//! engine::module
//!
//! The module workflow: pin, deploy, unpin and remove a module in one
//! environment of the control repository.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> PreconditionCheck -> RepoPreparation -> PinFileMutation -> Commit -> [Push] -> Done
//!                     \_______________\________________\______________\_________\__> Failed
//! ```
//!
//! Each action walks the states in order. Any error moves the workflow to
//! `Failed` and aborts the remaining steps; a commit already made in the
//! control repository is not undone.
//!
//! # Preconditions
//!
//! - Protected environments require `force`; checked before any repository
//!   is touched.
//! - The module repository must be clean with nothing to push, so only
//!   published commits can be pinned.
//! - The reference to pin must resolve and be visible at the module's
//!   origin (as a tag, or as a commit reachable from a remote branch). This
//!   holds even when the commit exists locally.
//! - The control repository must be clean and is pulled right before the
//!   pin file is rewritten. Concurrent runs against the same environment
//!   still race; a diverged push fails rather than being rebased.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::{Violation, WorkflowError};
use super::scratch::{ScratchSpace, CONTROL_REPO_DIR};
use crate::core::config::Settings;
use crate::core::pinfile::PinFile;
use crate::core::policy::EnvironmentPolicy;
use crate::core::types::{EnvironmentName, ModuleId, Oid};
use crate::git::{CommandRunner, RepositoryHandle};

/// Commit ids in messages are shortened to this many characters.
const SHORT_REF_LEN: usize = 9;

/// The four pin-file actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleAction {
    /// Pin and push.
    Deploy,
    /// Pin, commit locally.
    Pin,
    /// Remove and push.
    Remove,
    /// Remove, commit locally.
    Unpin,
}

impl ModuleAction {
    /// Whether the resulting commit is pushed.
    pub fn pushes(self) -> bool {
        matches!(self, ModuleAction::Deploy | ModuleAction::Remove)
    }

    /// Whether the action upserts a pin (as opposed to removing one).
    pub fn pins(self) -> bool {
        matches!(self, ModuleAction::Deploy | ModuleAction::Pin)
    }
}

/// Workflow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    PreconditionCheck,
    RepoPreparation,
    PinFileMutation,
    Commit,
    Push,
    Done,
    Failed,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::PreconditionCheck => "precondition-check",
            WorkflowState::RepoPreparation => "repo-preparation",
            WorkflowState::PinFileMutation => "pin-file-mutation",
            WorkflowState::Commit => "commit",
            WorkflowState::Push => "push",
            WorkflowState::Done => "done",
            WorkflowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Caller-supplied options for one action.
#[derive(Debug, Clone, Default)]
pub struct ModuleRequest {
    /// Target environment; the configured default when `None`.
    pub environment: Option<EnvironmentName>,
    /// Reference to pin (deploy/pin); the module's tag or HEAD commit when
    /// `None`.
    pub reference: Option<String>,
    /// Module to remove (remove/unpin); the current module when `None`.
    pub module: Option<ModuleId>,
    /// Appended to the commit message.
    pub comment: Option<String>,
    /// Allow mutating a protected environment.
    pub force: bool,
}

/// Outcome of a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowResult {
    pub action: ModuleAction,
    pub environment: EnvironmentName,
    pub module: ModuleId,
    /// Pinned reference (deploy/pin only).
    pub reference: Option<String>,
    /// Control repository HEAD after the action.
    pub commit: Oid,
    /// `false` when the pin file was already in the requested state.
    pub committed: bool,
    pub pushed: bool,
}

/// Orchestrates one module action against the control repository.
pub struct ModuleWorkflow<'a> {
    settings: &'a Settings,
    policy: EnvironmentPolicy,
    runner: Arc<dyn CommandRunner>,
    module_dir: PathBuf,
    state: WorkflowState,
}

impl<'a> ModuleWorkflow<'a> {
    /// `module_dir` is any directory inside the module repository.
    pub fn new(
        settings: &'a Settings,
        runner: Arc<dyn CommandRunner>,
        module_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            policy: settings.policy(),
            settings,
            runner,
            module_dir: module_dir.into(),
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Run one action to completion.
    pub fn run(
        &mut self,
        action: ModuleAction,
        request: &ModuleRequest,
    ) -> Result<WorkflowResult, WorkflowError> {
        match self.execute(action, request) {
            Ok(result) => {
                self.transition(WorkflowState::Done);
                Ok(result)
            }
            Err(err) => {
                warn!(state = %self.state, error = %err, "module {:?} failed", action);
                self.state = WorkflowState::Failed;
                Err(err)
            }
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        debug!(from = %self.state, to = %next, "workflow transition");
        self.state = next;
    }

    fn execute(
        &mut self,
        action: ModuleAction,
        request: &ModuleRequest,
    ) -> Result<WorkflowResult, WorkflowError> {
        self.transition(WorkflowState::PreconditionCheck);
        let environment = request
            .environment
            .clone()
            .unwrap_or_else(|| self.settings.default_environment().clone());
        if !self.policy.allows(&environment, request.force) {
            return Err(Violation::ProtectedEnvironment { environment }.into());
        }

        self.transition(WorkflowState::RepoPreparation);
        // Declared before the control handle so the scratch clone outlives it.
        let scratch: Option<ScratchSpace>;
        let current: Option<RepositoryHandle>;
        let module: ModuleId;
        let mut reference = None;
        let control = match (&request.module, action.pins()) {
            (Some(name), false) => {
                let space = ScratchSpace::create(self.settings.scratch_dir())?;
                let control = self.prepare_control_repo(space.path())?;
                scratch = Some(space);
                current = None;
                module = name.clone();
                control
            }
            _ => {
                scratch = None;
                let repo = self.prepare_current_repo()?;
                module = module_identity(self.settings, &repo)?;
                if action.pins() {
                    reference = Some(desired_ref(&repo, request.reference.as_deref())?);
                }
                let parent = repo.work_dir().parent().unwrap_or(repo.work_dir());
                let control = self.prepare_control_repo(parent)?;
                current = Some(repo);
                control
            }
        };
        checkout_environment(&control, &environment)?;

        self.transition(WorkflowState::PinFileMutation);
        control.pull()?;
        let mut pinfile = PinFile::load(&control.work_dir().join(self.settings.puppetfile()))?;
        match &reference {
            Some(r) => pinfile.set_module(&module, Some(r.as_str())),
            None => pinfile.unset_module(&module),
        };
        pinfile.store()?;

        self.transition(WorkflowState::Commit);
        let message = match &reference {
            Some(r) => {
                let base = format!("Pinned {} to {}", module, short_ref(r));
                let fallback = match &current {
                    Some(repo) => repo.last_commit_subject()?,
                    None => None,
                };
                append_comment(base, request.comment.as_deref().or(fallback.as_deref()))
            }
            None => append_comment(format!("Removed {module}"), request.comment.as_deref()),
        };

        let committed = if control.is_clean()? {
            warn!(%module, %environment, "pin file unchanged, nothing to commit");
            false
        } else {
            control.add(self.settings.puppetfile())?;
            control.commit(&message)?;
            info!(%module, %environment, message = %message, "committed pin file change");
            true
        };

        let mut pushed = false;
        if committed && action.pushes() {
            self.transition(WorkflowState::Push);
            control.push_current_branch()?;
            info!(%environment, "pushed control repository");
            pushed = true;
        }

        let commit = control.current_commit()?;
        drop(control);
        drop(scratch);

        Ok(WorkflowResult {
            action,
            environment,
            module,
            reference,
            commit,
            committed,
            pushed,
        })
    }

    /// Discover the module repository and check it is publishable.
    fn prepare_current_repo(&self) -> Result<RepositoryHandle, WorkflowError> {
        let repo = RepositoryHandle::discover(self.runner.clone(), &self.module_dir)?;
        repo.must_be_clean()?.must_have_nothing_to_push()?.fetch()?;
        Ok(repo)
    }

    /// Open (clean and fetch) or clone the control repository under `parent`.
    fn prepare_control_repo(&self, parent: &Path) -> Result<RepositoryHandle, WorkflowError> {
        let control = RepositoryHandle::new(self.runner.clone(), parent.join(CONTROL_REPO_DIR));
        if control.exists() {
            control.must_be_clean()?.fetch()?;
        } else {
            control.clone_from(self.settings.control_repo_url())?;
        }
        Ok(control)
    }
}

fn checkout_environment(
    control: &RepositoryHandle,
    environment: &EnvironmentName,
) -> Result<(), WorkflowError> {
    if !control.has_remote_branch(environment.as_str())? {
        return Err(Violation::MissingEnvironment {
            environment: environment.clone(),
        }
        .into());
    }
    control.checkout(environment.as_str(), None)?;
    Ok(())
}

/// The reference to pin, checked for visibility at origin.
fn desired_ref(repo: &RepositoryHandle, explicit: Option<&str>) -> Result<String, WorkflowError> {
    let reference = match explicit {
        Some(r) => r.to_string(),
        None => repo.current_tag_or_commit()?,
    };
    // Pin values are single-quoted Ruby strings.
    if reference.contains('\'') {
        return Err(Violation::QuotedRef { reference }.into());
    }
    if repo.remote_has_tag(&reference)? {
        return Ok(reference);
    }
    let oid = repo
        .resolve_ref(&reference)?
        .ok_or_else(|| Violation::UnresolvableRef {
            reference: reference.clone(),
        })?;
    if !repo.remote_has_commit(&oid)? {
        return Err(Violation::RefNotOnRemote { reference }.into());
    }
    Ok(reference)
}

/// Module identity from the module repository's origin URL.
fn module_identity(settings: &Settings, repo: &RepositoryHandle) -> Result<ModuleId, WorkflowError> {
    let url = repo
        .get_config("remote.origin.url")?
        .ok_or_else(|| Violation::NoOrigin {
            path: repo.work_dir().to_path_buf(),
        })?;
    let (group, project) = parse_origin_url(&url).ok_or_else(|| Violation::UnknownOrigin {
        url: url.clone(),
    })?;
    if !settings.is_module_group(&group) {
        return Err(Violation::UnsupportedGroup { group }.into());
    }
    let name = project.replacen('-', "/", 1);
    ModuleId::new(name).map_err(|e| {
        WorkflowError::from(Violation::InvalidModule {
            project,
            reason: e.to_string(),
        })
    })
}

/// Split an origin URL into `(group, project)`.
///
/// Accepts scp-like (`git@host:group/project.git`), URL
/// (`https://host/group/project.git`) and local path forms. The last two
/// path segments are used.
pub fn parse_origin_url(url: &str) -> Option<(String, String)> {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);

    let path = if let Some((_, rest)) = url.split_once("://") {
        rest.split_once('/').map_or("", |(_, path)| path)
    } else {
        match url.split_once(':') {
            // scp-like syntax has no slash before the colon
            Some((host, path)) if !host.contains('/') => path,
            _ => url,
        }
    };

    let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
    let project = segments.next()?;
    let group = segments.next()?;
    Some((group.to_string(), project.to_string()))
}

/// Full commit ids are shortened, anything else is kept.
fn short_ref(reference: &str) -> &str {
    if Oid::is_full_hex(reference) {
        &reference[..SHORT_REF_LEN]
    } else {
        reference
    }
}

fn append_comment(message: String, comment: Option<&str>) -> String {
    match comment.map(str::trim).filter(|c| !c.is_empty()) {
        Some(comment) => format!("{message}: {comment}"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ErrorKind;
    use crate::git::mock::ScriptedRunner;

    const SETTINGS: &str = r#"
        control_repo_url = "git@git.example.com:puppet-config/control_repo.git"
        default_environment = "development"
        protected_environments = ["production"]
        module_groups = ["puppet-modules-int", "puppet-modules-ext"]
    "#;

    fn settings() -> Settings {
        Settings::from_toml_str(SETTINGS).unwrap()
    }

    fn env(name: &str) -> EnvironmentName {
        EnvironmentName::new(name).unwrap()
    }

    mod origin_url {
        use super::*;

        #[test]
        fn scp_like() {
            assert_eq!(
                parse_origin_url("git@git.example.com:puppet-modules-int/risrole_base.git"),
                Some(("puppet-modules-int".into(), "risrole_base".into()))
            );
        }

        #[test]
        fn https() {
            assert_eq!(
                parse_origin_url("https://git.example.com/puppet-modules-ext/puppetlabs-stdlib.git"),
                Some(("puppet-modules-ext".into(), "puppetlabs-stdlib".into()))
            );
        }

        #[test]
        fn local_path() {
            assert_eq!(
                parse_origin_url("/srv/git/puppet-modules-int/risprof_web.git/"),
                Some(("puppet-modules-int".into(), "risprof_web".into()))
            );
        }

        #[test]
        fn single_segment_is_unknown() {
            assert_eq!(parse_origin_url("git@host:project.git"), None);
            assert_eq!(parse_origin_url("https://host"), None);
        }
    }

    mod messages {
        use super::*;

        #[test]
        fn commit_ids_are_shortened() {
            let oid = "0123456789abcdef0123456789abcdef01234567";
            assert_eq!(short_ref(oid), "012345678");
            assert_eq!(short_ref("v1.2.3-release"), "v1.2.3-release");
        }

        #[test]
        fn comment_is_appended() {
            assert_eq!(append_comment("Removed x".into(), Some("cleanup")), "Removed x: cleanup");
            assert_eq!(append_comment("Removed x".into(), Some("  ")), "Removed x");
            assert_eq!(append_comment("Removed x".into(), None), "Removed x");
        }
    }

    mod preconditions {
        use super::*;

        #[test]
        fn protected_environment_fails_before_any_git_call() {
            let settings = settings();
            for action in [
                ModuleAction::Deploy,
                ModuleAction::Pin,
                ModuleAction::Remove,
                ModuleAction::Unpin,
            ] {
                let runner = ScriptedRunner::new();
                let mut workflow = ModuleWorkflow::new(&settings, Arc::new(runner.clone()), "/work/m");
                let request = ModuleRequest {
                    environment: Some(env("production")),
                    ..Default::default()
                };
                let err = workflow.run(action, &request).unwrap_err();
                assert!(matches!(
                    err.violation(),
                    Some(Violation::ProtectedEnvironment { .. })
                ));
                assert_eq!(runner.call_count(), 0, "{action:?} touched git");
                assert_eq!(workflow.state(), WorkflowState::Failed);
            }
        }

        #[test]
        fn force_overrides_protection() {
            let settings = settings();
            let runner = ScriptedRunner::new();
            runner.on_fail(&["--show-toplevel"], 128, "fatal: not a git repository");
            let mut workflow = ModuleWorkflow::new(&settings, Arc::new(runner.clone()), "/work/m");
            let request = ModuleRequest {
                environment: Some(env("production")),
                force: true,
                ..Default::default()
            };
            let err = workflow.run(ModuleAction::Deploy, &request).unwrap_err();
            // Got past the gate and failed on repository discovery instead.
            assert!(matches!(err.git_error(), Some(crate::git::GitError::NotARepo { .. })));
        }

        #[test]
        fn dirty_module_repo_performs_no_commit_or_push() {
            let settings = settings();
            let runner = ScriptedRunner::new();
            runner
                .on(&["--show-toplevel"], "/work/m\n")
                .on(&["status", "--porcelain"], " M manifests/init.pp\n");
            let mut workflow = ModuleWorkflow::new(&settings, Arc::new(runner.clone()), "/work/m");

            let err = workflow
                .run(ModuleAction::Deploy, &ModuleRequest::default())
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Precondition);
            assert!(!runner.invoked(&["commit"]));
            assert!(!runner.invoked(&["push"]));
            assert!(!runner.invoked(&["clone"]));
        }

        #[test]
        fn invisible_ref_fails_before_control_repo_is_touched() {
            let settings = settings();
            let runner = ScriptedRunner::new();
            runner
                .on(&["--show-toplevel"], "/work/m\n")
                .on(&["--symbolic-full-name"], "main\n")
                .on(&["rev-list", "--count"], "0\n")
                .on(
                    &["config", "--get", "remote.origin.url"],
                    "git@git.example.com:puppet-modules-int/risrole_base.git\n",
                )
                .on(&["ls-remote", "--tags"], "")
                .on(&["rev-parse", "--verify"], &format!("{}\n", "c".repeat(40)))
                .on(&["for-each-ref"], "");
            let mut workflow = ModuleWorkflow::new(&settings, Arc::new(runner.clone()), "/work/m");
            let request = ModuleRequest {
                reference: Some("local-only".into()),
                ..Default::default()
            };

            let err = workflow.run(ModuleAction::Deploy, &request).unwrap_err();
            assert_eq!(
                err.violation(),
                Some(&Violation::RefNotOnRemote {
                    reference: "local-only".into()
                })
            );
            assert!(!runner.invoked(&["clone"]));
            assert!(!runner
                .calls()
                .iter()
                .any(|call| call.iter().any(|a| a.ends_with(CONTROL_REPO_DIR))));
        }

        #[test]
        fn unresolvable_ref_is_precondition() {
            let settings = settings();
            let runner = ScriptedRunner::new();
            runner
                .on(&["--show-toplevel"], "/work/m\n")
                .on(&["rev-list", "--count"], "0\n")
                .on(
                    &["config", "--get", "remote.origin.url"],
                    "git@git.example.com:puppet-modules-int/risrole_base.git\n",
                )
                .on_fail(&["rev-parse", "--verify"], 1, "");
            let mut workflow = ModuleWorkflow::new(&settings, Arc::new(runner.clone()), "/work/m");
            let request = ModuleRequest {
                reference: Some("nope".into()),
                ..Default::default()
            };

            let err = workflow.run(ModuleAction::Pin, &request).unwrap_err();
            assert!(matches!(
                err.violation(),
                Some(Violation::UnresolvableRef { .. })
            ));
        }

        #[test]
        fn quoted_ref_is_rejected_before_remote_lookup() {
            let settings = settings();
            let runner = ScriptedRunner::new();
            runner
                .on(&["--show-toplevel"], "/work/m\n")
                .on(&["rev-list", "--count"], "0\n")
                .on(
                    &["config", "--get", "remote.origin.url"],
                    "git@git.example.com:puppet-modules-int/risrole_base.git\n",
                );
            let mut workflow = ModuleWorkflow::new(&settings, Arc::new(runner.clone()), "/work/m");
            let request = ModuleRequest {
                reference: Some("v1'x".into()),
                ..Default::default()
            };

            let err = workflow.run(ModuleAction::Pin, &request).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Precondition);
            assert_eq!(
                err.violation(),
                Some(&Violation::QuotedRef {
                    reference: "v1'x".into()
                })
            );
            assert!(!runner.invoked(&["ls-remote"]));
            assert!(!runner.invoked(&["commit"]));
        }

        #[test]
        fn unsupported_group_is_rejected() {
            let settings = settings();
            let runner = ScriptedRunner::new();
            runner
                .on(&["--show-toplevel"], "/work/m\n")
                .on(&["rev-list", "--count"], "0\n")
                .on(
                    &["config", "--get", "remote.origin.url"],
                    "git@git.example.com:someone-else/risrole_base.git\n",
                );
            let mut workflow = ModuleWorkflow::new(&settings, Arc::new(runner.clone()), "/work/m");
            let err = workflow
                .run(ModuleAction::Deploy, &ModuleRequest::default())
                .unwrap_err();
            assert_eq!(
                err.violation(),
                Some(&Violation::UnsupportedGroup {
                    group: "someone-else".into()
                })
            );
        }
    }

    #[test]
    fn actions_push_and_pin_flags() {
        assert!(ModuleAction::Deploy.pushes() && ModuleAction::Deploy.pins());
        assert!(!ModuleAction::Pin.pushes() && ModuleAction::Pin.pins());
        assert!(ModuleAction::Remove.pushes() && !ModuleAction::Remove.pins());
        assert!(!ModuleAction::Unpin.pushes() && !ModuleAction::Unpin.pins());
    }
}
