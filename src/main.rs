//! ris-puppet binary entry point.

use std::process::ExitCode;

use rispuppet::cli::{self, Cli};
use rispuppet::engine::WorkflowError;
use rispuppet::logging;
use rispuppet::ui::output;

fn main() -> ExitCode {
    let cli = match Cli::parse_args() {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            output::error(cli::usage_error_summary(&err));
            return ExitCode::FAILURE;
        }
    };
    logging::init(cli.debug);
    let trace = cli.trace;

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(&err);
            if trace {
                print_trace(&err);
            }
            ExitCode::FAILURE
        }
    }
}

/// Full error chain, plus the failing command for tool failures.
fn print_trace(err: &anyhow::Error) {
    eprintln!("{err:?}");
    let Some(workflow) = err.downcast_ref::<WorkflowError>() else {
        return;
    };
    eprintln!("kind: {:?}", workflow.kind());
    if let Some(git) = workflow.git_error() {
        if let Some(command) = git.command_line() {
            eprintln!("command: {command}");
        }
        if let Some(stderr) = git.stderr().filter(|s| !s.trim().is_empty()) {
            eprintln!("stderr:\n{}", stderr.trim_end());
        }
    }
}
