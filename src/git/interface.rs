//! git::interface
//!
//! The repository handle: the **single doorway** to git.
//!
//! A [`RepositoryHandle`] is bound to exactly one working directory and its
//! `origin` remote. Every method is one synchronous invocation of the git
//! CLI through a [`CommandRunner`]; nothing is cached between calls, so each
//! query reflects the repository as it is right now.
//!
//! # Error Handling
//!
//! A non-zero exit from git surfaces as [`GitError::CommandFailed`]. The
//! guard helpers ([`RepositoryHandle::must_be_clean`] and friends) raise
//! precondition variants that callers can tell apart via
//! [`GitError::is_precondition`]. There is no retry or backoff anywhere:
//! callers order their preconditions before mutations.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rispuppet::git::{RepositoryHandle, SystemRunner};
//!
//! let repo = RepositoryHandle::discover(Arc::new(SystemRunner::new()), ".".as_ref())?;
//! repo.must_be_clean()?.must_have_nothing_to_push()?.fetch()?;
//! println!("on {} at {}", repo.current_branch()?, repo.current_commit()?);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::runner::{format_command, CommandOutput, CommandRunner};
use crate::core::types::Oid;

/// The git binary invoked by every handle.
const GIT: &str = "git";

/// Remote every handle operates against.
pub const ORIGIN: &str = "origin";

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Clone target already exists.
    #[error("cannot create repository in {path}, directory already exists")]
    AlreadyExists { path: PathBuf },

    /// Working tree has uncommitted changes.
    #[error("working directory {path} is dirty, please clean up or commit your changes")]
    DirtyWorktree { path: PathBuf },

    /// Local branch is ahead of its remote counterpart.
    #[error("working directory {path} has {count} unpushed commits for branch {branch}")]
    UnpushedCommits {
        path: PathBuf,
        branch: String,
        count: usize,
    },

    /// Local branch has never been pushed to `origin`.
    #[error("working directory {path} has branch {branch} which does not exist on origin, please push it first")]
    NoUpstream { path: PathBuf, branch: String },

    #[error("there is no such remote branch: {branch}")]
    NoRemoteBranch { branch: String },

    #[error("remote branch already exists: {branch}")]
    RemoteBranchExists { branch: String },

    /// git exited non-zero.
    #[error("{summary} failed ({}){}", display_status(.status), first_line(.stderr))]
    CommandFailed {
        /// Short form, e.g. `git push`
        summary: String,
        /// Full command line
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// git could not be started.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// git succeeded but printed something we cannot interpret.
    #[error("unexpected output from {command}: {output}")]
    UnexpectedOutput { command: String, output: String },
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "killed by signal".to_string(),
    }
}

fn first_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| format!(": {l}"))
        .unwrap_or_default()
}

impl GitError {
    /// Whether this error is a violated precondition rather than a tool
    /// failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GitError::NotARepo { .. }
                | GitError::AlreadyExists { .. }
                | GitError::DirtyWorktree { .. }
                | GitError::UnpushedCommits { .. }
                | GitError::NoUpstream { .. }
                | GitError::NoRemoteBranch { .. }
                | GitError::RemoteBranchExists { .. }
        )
    }

    /// The full failing command line, for tool failures.
    pub fn command_line(&self) -> Option<&str> {
        match self {
            GitError::CommandFailed { command, .. }
            | GitError::Spawn { command, .. }
            | GitError::UnexpectedOutput { command, .. } => Some(command),
            _ => None,
        }
    }

    /// Captured stderr of a failed command.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            GitError::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Handle on one working copy and its `origin` remote.
#[derive(Clone)]
pub struct RepositoryHandle {
    work_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl RepositoryHandle {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Bind a handle to `work_dir`. The directory need not exist yet
    /// (see [`RepositoryHandle::clone_from`]).
    pub fn new(runner: Arc<dyn CommandRunner>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            runner,
        }
    }

    /// Find the repository containing `start` and bind to its top level.
    pub fn discover(runner: Arc<dyn CommandRunner>, start: &Path) -> Result<Self, GitError> {
        let args = vec![
            "-C".to_string(),
            start.display().to_string(),
            "rev-parse".to_string(),
            "--show-toplevel".to_string(),
        ];
        let output = run(runner.as_ref(), &args)?;
        if !output.success() {
            return Err(GitError::NotARepo {
                path: start.to_path_buf(),
            });
        }
        let top = output.stdout_trimmed().to_string();
        Ok(Self::new(runner, top))
    }

    /// List branch names on a remote URL without a working copy.
    pub fn list_remote_heads_at(
        runner: &dyn CommandRunner,
        url: &str,
    ) -> Result<Vec<String>, GitError> {
        let args = vec!["ls-remote".to_string(), "--heads".to_string(), url.to_string()];
        let output = checked(runner, &args)?;
        Ok(parse_ls_remote(&output.stdout, "refs/heads/"))
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Whether the working directory exists on disk.
    pub fn exists(&self) -> bool {
        self.work_dir.is_dir()
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    fn args(&self, args: &[&str]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.push("-C".to_string());
        full.push(self.work_dir.display().to_string());
        full.extend(args.iter().map(|a| a.to_string()));
        full
    }

    /// Run git, requiring success, returning chomped stdout.
    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        let output = checked(self.runner.as_ref(), &self.args(args))?;
        Ok(output.stdout_trimmed().to_string())
    }

    /// Run git where a non-zero exit is an answer, not a failure.
    fn probe(&self, args: &[&str]) -> Result<Option<String>, GitError> {
        let output = run(self.runner.as_ref(), &self.args(args))?;
        Ok(output
            .success()
            .then(|| output.stdout_trimmed().to_string()))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// No staged, unstaged or untracked changes.
    pub fn is_clean(&self) -> Result<bool, GitError> {
        Ok(self.git(&["status", "--porcelain"])?.is_empty())
    }

    /// Number of commits on HEAD that are not on `origin/<branch>`.
    ///
    /// A branch with no remote-tracking ref has never been pushed and is
    /// reported as [`GitError::NoUpstream`].
    pub fn unpushed_commits(&self, branch: &str) -> Result<usize, GitError> {
        if !self.has_remote_tracking_branch(branch)? {
            return Err(GitError::NoUpstream {
                path: self.work_dir.clone(),
                branch: branch.to_string(),
            });
        }
        let range = format!("refs/remotes/{ORIGIN}/{branch}..HEAD");
        let count = self.git(&["rev-list", "--count", &range])?;
        count
            .trim()
            .parse()
            .map_err(|_| GitError::UnexpectedOutput {
                command: format!("git rev-list --count {range}"),
                output: count,
            })
    }

    /// Symbolic name of HEAD (`HEAD` when detached).
    pub fn current_branch(&self) -> Result<String, GitError> {
        self.git(&["rev-parse", "--symbolic-full-name", "--abbrev-ref", "HEAD"])
    }

    pub fn current_commit(&self) -> Result<Oid, GitError> {
        self.resolve_ref("HEAD")?
            .ok_or_else(|| GitError::UnexpectedOutput {
                command: "git rev-parse --verify HEAD".into(),
                output: "HEAD does not resolve to a commit".into(),
            })
    }

    /// Resolve a branch, tag or commit to a commit id. `None` if it does not
    /// resolve locally.
    pub fn resolve_ref(&self, reference: &str) -> Result<Option<Oid>, GitError> {
        let spec = format!("{reference}^{{commit}}");
        match self.probe(&["rev-parse", "--verify", "--quiet", &spec])? {
            Some(hash) => Oid::new(hash.clone())
                .map(Some)
                .map_err(|_| GitError::UnexpectedOutput {
                    command: format!("git rev-parse --verify {spec}"),
                    output: hash,
                }),
            None => Ok(None),
        }
    }

    /// Whether a local branch of that name exists.
    pub fn has_branch(&self, branch: &str) -> Result<bool, GitError> {
        let refname = format!("refs/heads/{branch}");
        Ok(self
            .probe(&["show-ref", "--verify", "--quiet", &refname])?
            .is_some())
    }

    /// Whether `refs/remotes/origin/<branch>` exists locally.
    pub fn has_remote_tracking_branch(&self, branch: &str) -> Result<bool, GitError> {
        let refname = format!("refs/remotes/{ORIGIN}/{branch}");
        Ok(self
            .probe(&["show-ref", "--verify", "--quiet", &refname])?
            .is_some())
    }

    pub fn list_remote_branches(&self) -> Result<Vec<String>, GitError> {
        let out = self.git(&["ls-remote", "--heads", ORIGIN])?;
        Ok(parse_ls_remote(&out, "refs/heads/"))
    }

    pub fn list_remote_tags(&self) -> Result<Vec<String>, GitError> {
        let out = self.git(&["ls-remote", "--tags", ORIGIN])?;
        let mut tags: Vec<String> = parse_ls_remote(&out, "refs/tags/")
            .into_iter()
            .map(|t| t.trim_end_matches("^{}").to_string())
            .collect();
        tags.dedup();
        Ok(tags)
    }

    pub fn has_remote_branch(&self, branch: &str) -> Result<bool, GitError> {
        Ok(self.list_remote_branches()?.iter().any(|b| b == branch))
    }

    pub fn remote_has_tag(&self, tag: &str) -> Result<bool, GitError> {
        Ok(self.list_remote_tags()?.iter().any(|t| t == tag))
    }

    /// Whether `oid` is reachable from any `origin` remote-tracking ref.
    pub fn remote_has_commit(&self, oid: &Oid) -> Result<bool, GitError> {
        let remotes = format!("refs/remotes/{ORIGIN}");
        let refs = self.git(&[
            "for-each-ref",
            "--format=%(refname)",
            "--contains",
            oid.as_str(),
            &remotes,
        ])?;
        Ok(!refs.is_empty())
    }

    /// The tag pointing exactly at `revision`, if any.
    pub fn tag_name(&self, revision: &str) -> Result<Option<String>, GitError> {
        Ok(self
            .probe(&["describe", "--tags", "--exact-match", revision])?
            .filter(|t| !t.is_empty()))
    }

    /// The tag on HEAD, falling back to the HEAD commit id.
    pub fn current_tag_or_commit(&self) -> Result<String, GitError> {
        let commit = self.current_commit()?;
        Ok(self
            .tag_name(commit.as_str())?
            .unwrap_or_else(|| commit.to_string()))
    }

    /// Subject line of the HEAD commit.
    pub fn last_commit_subject(&self) -> Result<Option<String>, GitError> {
        let subject = self.git(&["log", "-1", "--pretty=%s"])?;
        Ok((!subject.is_empty()).then_some(subject))
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>, GitError> {
        self.probe(&["config", "--get", key])
    }

    // =========================================================================
    // Guards
    // =========================================================================

    pub fn must_be_clean(&self) -> Result<&Self, GitError> {
        if !self.is_clean()? {
            return Err(GitError::DirtyWorktree {
                path: self.work_dir.clone(),
            });
        }
        Ok(self)
    }

    /// The current branch has no commits missing from `origin`.
    pub fn must_have_nothing_to_push(&self) -> Result<&Self, GitError> {
        let branch = self.current_branch()?;
        let count = self.unpushed_commits(&branch)?;
        if count > 0 {
            return Err(GitError::UnpushedCommits {
                path: self.work_dir.clone(),
                branch,
                count,
            });
        }
        Ok(self)
    }

    pub fn assert_remote_branch_exists(&self, branch: &str) -> Result<&Self, GitError> {
        if !self.has_remote_branch(branch)? {
            return Err(GitError::NoRemoteBranch {
                branch: branch.to_string(),
            });
        }
        Ok(self)
    }

    pub fn assert_no_remote_branch_exists(&self, branch: &str) -> Result<&Self, GitError> {
        if self.has_remote_branch(branch)? {
            return Err(GitError::RemoteBranchExists {
                branch: branch.to_string(),
            });
        }
        Ok(self)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Clone `url` into this handle's working directory.
    pub fn clone_from(&self, url: &str) -> Result<&Self, GitError> {
        if self.exists() {
            return Err(GitError::AlreadyExists {
                path: self.work_dir.clone(),
            });
        }
        let args = vec![
            "clone".to_string(),
            "-q".to_string(),
            url.to_string(),
            self.work_dir.display().to_string(),
        ];
        checked(self.runner.as_ref(), &args)?;
        Ok(self)
    }

    pub fn fetch(&self) -> Result<&Self, GitError> {
        self.git(&["fetch", "-q", "--all", "--tags"])?;
        Ok(self)
    }

    /// Fast-forward the current branch; fails when local and remote diverged.
    pub fn pull(&self) -> Result<&Self, GitError> {
        self.git(&["pull", "-q", "--ff-only"])?;
        Ok(self)
    }

    /// Switch to local `branch` (defaults to `reference`), creating it from
    /// `origin/<reference>` when it does not exist locally.
    pub fn checkout(&self, reference: &str, branch: Option<&str>) -> Result<&Self, GitError> {
        let branch = branch.unwrap_or(reference);
        if self.has_branch(branch)? {
            self.git(&["checkout", "-q", branch])?;
        } else {
            let start = format!("{ORIGIN}/{reference}");
            self.git(&["checkout", "-q", "-b", branch, &start])?;
        }
        Ok(self)
    }

    /// Create `branch` from `source` and publish it. Fails if `branch`
    /// already exists on the remote.
    pub fn create_branch_from(&self, branch: &str, source: &str) -> Result<&Self, GitError> {
        self.assert_no_remote_branch_exists(branch)?;
        self.git(&["checkout", "-q", "-b", branch, source])?;
        self.git(&["push", "-q", "-u", ORIGIN, branch])?;
        Ok(self)
    }

    pub fn destroy_remote_branch(&self, branch: &str) -> Result<&Self, GitError> {
        let refspec = format!(":{branch}");
        self.git(&["push", "-q", ORIGIN, &refspec])?;
        Ok(self)
    }

    pub fn add(&self, path: &Path) -> Result<&Self, GitError> {
        let path = path.display().to_string();
        self.git(&["add", "--", &path])?;
        Ok(self)
    }

    pub fn commit(&self, message: &str) -> Result<&Self, GitError> {
        self.git(&["commit", "-q", "-m", message])?;
        Ok(self)
    }

    pub fn push(&self) -> Result<&Self, GitError> {
        self.git(&["push", "-q"])?;
        Ok(self)
    }

    /// Push the current branch to `origin`, setting upstream.
    pub fn push_current_branch(&self) -> Result<&Self, GitError> {
        let branch = self.current_branch()?;
        self.git(&["push", "-q", "-u", ORIGIN, &branch])?;
        Ok(self)
    }
}

fn run(runner: &dyn CommandRunner, args: &[String]) -> Result<CommandOutput, GitError> {
    runner.run(GIT, args).map_err(|source| GitError::Spawn {
        command: format_command(GIT, args),
        source,
    })
}

fn checked(runner: &dyn CommandRunner, args: &[String]) -> Result<CommandOutput, GitError> {
    let output = run(runner, args)?;
    if output.success() {
        return Ok(output);
    }
    Err(GitError::CommandFailed {
        summary: summarize(args),
        command: format_command(GIT, args),
        status: output.status,
        stderr: output.stderr,
    })
}

/// `git <subcommand>`, skipping a leading `-C <dir>`.
fn summarize(args: &[String]) -> String {
    let sub = match args {
        [flag, _, sub, ..] if flag == "-C" => sub.as_str(),
        [sub, ..] => sub.as_str(),
        [] => "",
    };
    format!("{GIT} {sub}").trim_end().to_string()
}

/// Last whitespace-separated field of each line, with `prefix` stripped.
fn parse_ls_remote(out: &str, prefix: &str) -> Vec<String> {
    out.lines()
        .filter_map(|line| line.split_whitespace().last())
        .filter_map(|refname| refname.strip_prefix(prefix))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::ScriptedRunner;

    fn handle(runner: &ScriptedRunner) -> RepositoryHandle {
        RepositoryHandle::new(Arc::new(runner.clone()), "/work/repo")
    }

    const HEADS: &str = "\
1111111111111111111111111111111111111111\trefs/heads/development
2222222222222222222222222222222222222222\trefs/heads/production
";

    const TAGS: &str = "\
3333333333333333333333333333333333333333\trefs/tags/v1.0
4444444444444444444444444444444444444444\trefs/tags/v1.0^{}
";

    #[test]
    fn commands_run_inside_work_dir() {
        let runner = ScriptedRunner::new();
        handle(&runner).is_clean().unwrap();
        assert_eq!(
            runner.calls()[0],
            vec!["git", "-C", "/work/repo", "status", "--porcelain"]
        );
    }

    #[test]
    fn dirty_tree_fails_guard() {
        let runner = ScriptedRunner::new();
        runner.on(&["status", "--porcelain"], " M manifests/init.pp\n");
        let err = handle(&runner).must_be_clean().unwrap_err();
        assert!(matches!(err, GitError::DirtyWorktree { .. }));
        assert!(err.is_precondition());
    }

    #[test]
    fn unpushed_commits_fail_guard() {
        let runner = ScriptedRunner::new();
        runner
            .on(&["rev-parse", "--symbolic-full-name"], "main\n")
            .on(&["rev-list", "--count"], "2\n");
        let err = handle(&runner).must_have_nothing_to_push().unwrap_err();
        match err {
            GitError::UnpushedCommits { branch, count, .. } => {
                assert_eq!(branch, "main");
                assert_eq!(count, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(runner.invoked(&["refs/remotes/origin/main..HEAD"]));
    }

    #[test]
    fn never_pushed_branch_is_a_precondition() {
        let runner = ScriptedRunner::new();
        runner
            .on(&["rev-parse", "--symbolic-full-name"], "feature\n")
            .on_fail(
                &["show-ref", "--verify", "--quiet", "refs/remotes/origin/feature"],
                1,
                "",
            );
        let err = handle(&runner).must_have_nothing_to_push().unwrap_err();
        assert!(matches!(err, GitError::NoUpstream { ref branch, .. } if branch == "feature"));
        assert!(err.is_precondition());
        assert!(!runner.invoked(&["rev-list"]));
    }

    #[test]
    fn remote_branches_and_guards() {
        let runner = ScriptedRunner::new();
        runner.on(&["ls-remote", "--heads"], HEADS);
        let repo = handle(&runner);

        assert_eq!(
            repo.list_remote_branches().unwrap(),
            vec!["development", "production"]
        );
        assert!(repo.assert_remote_branch_exists("production").is_ok());
        assert!(matches!(
            repo.assert_remote_branch_exists("staging"),
            Err(GitError::NoRemoteBranch { .. })
        ));
        assert!(matches!(
            repo.assert_no_remote_branch_exists("development"),
            Err(GitError::RemoteBranchExists { .. })
        ));
    }

    #[test]
    fn remote_tags_strip_peeled_entries() {
        let runner = ScriptedRunner::new();
        runner.on(&["ls-remote", "--tags"], TAGS);
        let repo = handle(&runner);
        assert_eq!(repo.list_remote_tags().unwrap(), vec!["v1.0"]);
        assert!(repo.remote_has_tag("v1.0").unwrap());
        assert!(!repo.remote_has_tag("v2.0").unwrap());
    }

    #[test]
    fn resolve_ref_none_when_unresolvable() {
        let runner = ScriptedRunner::new();
        runner.on_fail(&["rev-parse", "--verify"], 1, "");
        assert_eq!(handle(&runner).resolve_ref("nope").unwrap(), None);
    }

    #[test]
    fn resolve_ref_peels_to_commit() {
        let runner = ScriptedRunner::new();
        runner.on(&["rev-parse", "--verify"], &format!("{}\n", "a".repeat(40)));
        let oid = handle(&runner).resolve_ref("v1.0").unwrap().unwrap();
        assert_eq!(oid.as_str(), "a".repeat(40));
        assert!(runner.invoked(&["v1.0^{commit}"]));
    }

    #[test]
    fn checkout_creates_tracking_branch_when_missing() {
        let runner = ScriptedRunner::new();
        runner.on_fail(&["show-ref", "--verify"], 1, "");
        handle(&runner).checkout("production", None).unwrap();
        assert!(runner.invoked(&["checkout", "-q", "-b", "production", "origin/production"]));
    }

    #[test]
    fn checkout_switches_to_existing_branch() {
        let runner = ScriptedRunner::new();
        handle(&runner).checkout("production", None).unwrap();
        assert!(runner.invoked(&["checkout", "-q", "production"]));
        assert!(!runner.invoked(&["-b"]));
    }

    #[test]
    fn create_branch_refuses_existing_remote() {
        let runner = ScriptedRunner::new();
        runner.on(&["ls-remote", "--heads"], HEADS);
        let err = handle(&runner)
            .create_branch_from("production", "origin/development")
            .unwrap_err();
        assert!(matches!(err, GitError::RemoteBranchExists { .. }));
        assert!(!runner.invoked(&["checkout"]));
    }

    #[test]
    fn non_zero_exit_is_command_failure() {
        let runner = ScriptedRunner::new();
        runner.on_fail(&["push"], 1, "! [rejected] production -> production (fetch first)\n");
        let err = handle(&runner).push().unwrap_err();
        assert!(!err.is_precondition());
        assert_eq!(err.command_line(), Some("git -C /work/repo push -q"));
        assert_eq!(
            err.to_string(),
            "git push failed (exit status 1): ! [rejected] production -> production (fetch first)"
        );
    }

    #[test]
    fn discover_outside_repo_is_not_a_repo() {
        let runner = ScriptedRunner::new();
        runner.on_fail(&["--show-toplevel"], 128, "fatal: not a git repository");
        let err = RepositoryHandle::discover(Arc::new(runner), Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, GitError::NotARepo { .. }));
    }

    #[test]
    fn tag_or_commit_prefers_exact_tag() {
        let runner = ScriptedRunner::new();
        runner
            .on(&["rev-parse", "--verify"], &"b".repeat(40))
            .on(&["describe", "--tags"], "v1.2\n");
        assert_eq!(handle(&runner).current_tag_or_commit().unwrap(), "v1.2");

        let runner = ScriptedRunner::new();
        runner
            .on(&["rev-parse", "--verify"], &"b".repeat(40))
            .on_fail(&["describe", "--tags"], 128, "fatal: no tag exactly matches");
        assert_eq!(handle(&runner).current_tag_or_commit().unwrap(), "b".repeat(40));
    }

    #[test]
    fn summarize_skips_directory_flag() {
        let args: Vec<String> = ["-C", "/x", "fetch", "--all"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(summarize(&args), "git fetch");
    }
}
