//! git::mock
//!
//! Scripted command runner for deterministic testing.
//!
//! # Design
//!
//! [`ScriptedRunner`] answers invocations from a list of rules. A rule
//! matches when its pattern appears as a contiguous run inside the
//! invocation's arguments; the first matching rule wins. Unmatched
//! invocations succeed with empty output, which reads as "clean tree",
//! "nothing to push" or "no output" for most git queries.
//!
//! Every invocation is recorded so tests can assert what did (and did not)
//! run.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rispuppet::git::mock::ScriptedRunner;
//! use rispuppet::git::RepositoryHandle;
//!
//! let runner = ScriptedRunner::new();
//! runner.on(&["status", "--porcelain"], "?? scratch.txt\n");
//!
//! let repo = RepositoryHandle::new(Arc::new(runner.clone()), "/work/module");
//! assert!(repo.must_be_clean().is_err());
//! assert!(!runner.invoked(&["commit"]));
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use super::runner::{CommandOutput, CommandRunner};

/// Scripted runner. Clones share rules and the call log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    inner: Arc<Mutex<ScriptedRunnerInner>>,
}

#[derive(Debug, Default)]
struct ScriptedRunnerInner {
    rules: Vec<Rule>,
    calls: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: Vec<String>,
    output: CommandOutput,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedRunnerInner> {
        // A poisoned lock only means another test thread panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer invocations containing `pattern` with a successful `stdout`.
    pub fn on(&self, pattern: &[&str], stdout: &str) -> &Self {
        self.respond(pattern, CommandOutput::ok(stdout))
    }

    /// Answer invocations containing `pattern` with a failure.
    pub fn on_fail(&self, pattern: &[&str], status: i32, stderr: &str) -> &Self {
        self.respond(pattern, CommandOutput::failed(status, stderr))
    }

    /// Answer invocations containing `pattern` with `output`.
    pub fn respond(&self, pattern: &[&str], output: CommandOutput) -> &Self {
        self.lock().rules.push(Rule {
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            output,
        });
        self
    }

    /// All recorded invocations, program first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.lock().calls.clone()
    }

    /// Whether any recorded invocation contains `pattern`.
    pub fn invoked(&self, pattern: &[&str]) -> bool {
        self.lock()
            .calls
            .iter()
            .any(|call| contains_window(&call[1..], pattern))
    }

    /// Number of recorded invocations.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        let mut inner = self.lock();
        let mut call = Vec::with_capacity(args.len() + 1);
        call.push(program.to_string());
        call.extend(args.iter().cloned());
        inner.calls.push(call);

        let output = inner
            .rules
            .iter()
            .find(|rule| contains_window(args, rule.pattern.as_slice()))
            .map(|rule| rule.output.clone())
            .unwrap_or_else(|| CommandOutput::ok(""));
        Ok(output)
    }
}

fn contains_window<S: AsRef<str>, P: AsRef<str>>(haystack: &[S], pattern: &[P]) -> bool {
    if pattern.is_empty() {
        return true;
    }
    haystack.windows(pattern.len()).any(|window| {
        window
            .iter()
            .zip(pattern)
            .all(|(a, b)| a.as_ref() == b.as_ref())
    })
}
