//! validate
//!
//! Syntax validation battery for a module repository.
//!
//! Every file of the repository (`.git` excluded) is matched against a fixed
//! dispatch table of checks keyed by file extension. Checks run in table
//! order; a file failing any check fails the battery. External checkers run
//! through the same [`CommandRunner`] capability as git, YAML is parsed
//! in-process.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::git::{format_command, CommandRunner, SystemRunner};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("failed to list files under {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// How a check inspects one file.
#[derive(Debug, Clone, Copy)]
enum Checker {
    /// External program; failure is a non-zero exit.
    Program {
        program: &'static str,
        args: &'static [&'static str],
    },
    Yaml,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct Check {
    pub header: &'static str,
    extensions: &'static [&'static str],
    checker: Checker,
}

/// Fixed search path for the external checkers.
pub const CHECKER_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Inherited variables that would point the checkers at a bundler or gem
/// setup other than the system one.
const SCRUBBED_ENV: &[&str] = &[
    "RUBYOPT",
    "BUNDLE_BIN_PATH",
    "BUNDLE_GEMFILE",
    "GEM_PATH",
    "GEM_HOME",
];

/// A runner for the checkers: Ruby and bundler variables removed, `PATH`
/// pinned to [`CHECKER_PATH`], and `HOME` supplied when missing.
pub fn checker_runner() -> SystemRunner {
    let mut runner = SCRUBBED_ENV
        .iter()
        .fold(SystemRunner::new(), |runner, key| runner.without_env(*key))
        .with_env("PATH", CHECKER_PATH);
    if std::env::var_os("HOME").is_none() {
        if let Some(home) = dirs::home_dir() {
            runner = runner.with_env("HOME", home);
        }
    }
    runner
}

/// `$1` is the file path; the shell keeps the pipe out of our hands.
const ERB_PIPELINE: &str = r#"erb -P -x -T - "$1" | ruby -c"#;

pub const CHECKS: &[Check] = &[
    Check {
        header: "Checking Puppet manifest syntax",
        extensions: &["pp"],
        checker: Checker::Program {
            program: "puppet",
            args: &["parser", "validate"],
        },
    },
    Check {
        header: "Validating Puppet style (lint)",
        extensions: &["pp"],
        checker: Checker::Program {
            program: "puppet-lint",
            args: &[
                "--no-80chars-check",
                "--no-class_inherits_from_params_class-check",
                "--with-filename",
            ],
        },
    },
    Check {
        header: "Checking ERB syntax",
        extensions: &["erb"],
        checker: Checker::Program {
            program: "sh",
            args: &["-c", ERB_PIPELINE, "sh"],
        },
    },
    Check {
        header: "Checking Ruby syntax",
        extensions: &["rb"],
        checker: Checker::Program {
            program: "ruby",
            args: &["-c"],
        },
    },
    Check {
        header: "Checking YAML syntax",
        extensions: &["yaml", "yml"],
        checker: Checker::Yaml,
    },
];

impl Check {
    pub fn applies_to(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    fn run(&self, runner: &dyn CommandRunner, path: &Path) -> FileResult {
        let (passed, output) = match self.checker {
            Checker::Program { program, args } => {
                let mut argv: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                argv.push(path.display().to_string());
                debug!(command = %format_command(program, &argv), "running check");
                match runner.run(program, &argv) {
                    Ok(out) => {
                        let passed = out.success();
                        let mut text = out.stdout;
                        text.push_str(&out.stderr);
                        (passed, text.trim_end().to_string())
                    }
                    Err(e) => (false, format!("failed to run {program}: {e}")),
                }
            }
            Checker::Yaml => match check_yaml(path) {
                Ok(()) => (true, String::new()),
                Err(message) => (false, format!("YAML error: {message}")),
            },
        };
        FileResult {
            header: self.header,
            path: path.to_path_buf(),
            passed,
            output,
        }
    }
}

fn check_yaml(path: &Path) -> Result<(), String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    for document in serde_yaml::Deserializer::from_str(&text) {
        serde_yaml::Value::deserialize(document).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Outcome of one check on one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub header: &'static str,
    pub path: PathBuf,
    pub passed: bool,
    /// Checker output; lint warnings can appear on passing files.
    pub output: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub results: Vec<FileResult>,
}

impl ValidationReport {
    pub fn failures(&self) -> impl Iterator<Item = &FileResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Number of distinct files with at least one failing check.
    pub fn failed_files(&self) -> usize {
        let mut paths: Vec<&Path> = self.failures().map(|r| r.path.as_path()).collect();
        paths.sort();
        paths.dedup();
        paths.len()
    }
}

/// All regular files under `root`, skipping `.git`, sorted.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, ValidationError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(|source| ValidationError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Run every applicable check over `files`, in table order.
pub fn validate_files(runner: &dyn CommandRunner, files: &[PathBuf]) -> ValidationReport {
    let mut report = ValidationReport::default();
    for check in CHECKS {
        for path in files.iter().filter(|p| check.applies_to(p)) {
            report.results.push(check.run(runner, path));
        }
    }
    report
}
