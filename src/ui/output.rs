//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag. Errors always print, on
//! stdout, with the `ERROR:` prefix wrappers and scripts match on.

use std::fmt::Display;

use crate::engine::{ActionOutcome, WorkflowResult};
use crate::validate::ValidationReport;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    println!("{}", format_error(message));
}

pub fn format_error(message: impl Display) -> String {
    format!("ERROR: {}", message)
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line summary of a module action.
pub fn format_module_result(result: &WorkflowResult) -> String {
    let what = match &result.reference {
        Some(reference) => format!("{} pinned to {}", result.module, reference),
        None => format!("{} removed", result.module),
    };
    let state = if !result.committed {
        "unchanged"
    } else if result.pushed {
        "pushed"
    } else {
        "committed locally"
    };
    format!(
        "{} in {} ({}, {})",
        what,
        result.environment,
        state,
        result.commit.short(9)
    )
}

/// Checker report: each header once, followed by its output.
pub fn format_validation(report: &ValidationReport, verbosity: Verbosity) -> String {
    let mut lines = Vec::new();
    let mut last_header = None;
    for result in &report.results {
        if last_header != Some(result.header) {
            lines.push(format!(" * {}", result.header));
            last_header = Some(result.header);
        }
        if verbosity == Verbosity::Debug {
            lines.push(format!("   - {}", result.path.display()));
        }
        if !result.output.is_empty() {
            lines.push(result.output.clone());
        } else if !result.passed {
            lines.push(format!("{}: failed", result.path.display()));
        }
    }
    lines.join("\n")
}

/// Human-readable rendering of an outcome.
pub fn format_outcome(outcome: &ActionOutcome, verbosity: Verbosity) -> String {
    match outcome {
        ActionOutcome::Module(result) => format_module_result(result),
        ActionOutcome::Validated(report) => format_validation(report, verbosity),
        ActionOutcome::Environments(names) => format_list(names, ""),
        ActionOutcome::Created { from, environment } => {
            format!("Created environment {} from {}", environment, from)
        }
        ActionOutcome::Destroyed { environment } => {
            format!("Destroyed environment {}", environment)
        }
    }
}
