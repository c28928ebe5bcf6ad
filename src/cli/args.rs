//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Settings file to load
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--trace`: Print full diagnostics on failure
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::{EnvironmentName, ModuleId, TypeError};

/// ris-puppet - Manage module pins in the r10k control repository
#[derive(Parser, Debug)]
#[command(name = "ris-puppet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (default: $RIS_PUPPET_CONFIG, then the usual locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run as if ris-puppet was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print the full error chain and failing command on errors
    #[arg(long, global = true)]
    pub trace: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    ///
    /// Help and version requests come back as errors too; see
    /// [`clap::Error::use_stderr`].
    pub fn parse_args() -> Result<Self, clap::Error> {
        Parser::try_parse()
    }
}

/// One-line summary of a usage error: the first paragraph of clap's
/// message, without the `error:` prefix.
pub fn usage_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let summary = rendered
        .lines()
        .map(str::trim)
        .take_while(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    summary
        .strip_prefix("error:")
        .map(str::trim_start)
        .unwrap_or(&summary)
        .to_string()
}

fn parse_environment(value: &str) -> Result<EnvironmentName, TypeError> {
    EnvironmentName::new(value)
}

fn parse_module(value: &str) -> Result<ModuleId, TypeError> {
    ModuleId::new(value)
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pin, deploy, unpin or remove the current module
    #[command(
        name = "module",
        long_about = "Manage the current module's pin in an environment.\n\n\
            Run from inside a module repository. The control repository is cloned \
            next to it (as control_repo) on first use. The module repository must be \
            clean and fully pushed, and the pinned reference must exist at origin.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Pin the current tag (or HEAD commit) in the default environment and push
    ris-puppet module deploy

    # Pin a specific tag in a feature environment, commit locally only
    ris-puppet module pin -e feature_x -r v1.2.0

    # Remove another module from an environment without a module checkout
    ris-puppet module remove -m puppetlabs/stdlib -e feature_x

    # Check manifest, template, Ruby and YAML syntax
    ris-puppet module validate"
    )]
    Module {
        #[command(subcommand)]
        action: ModuleCommand,
    },

    /// List, create or destroy environments
    #[command(
        name = "environment",
        after_help = "\
WORKFLOW EXAMPLES:
    # List environments
    ris-puppet environment

    # Branch a new environment off production
    ris-puppet environment create -f production -e feature_x

    # Drop it again
    ris-puppet environment destroy -e feature_x"
    )]
    Environment {
        /// Defaults to `list`
        #[command(subcommand)]
        action: Option<EnvironmentCommand>,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    ris-puppet completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    ris-puppet completion zsh >> ~/.zshrc"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by `deploy` and `pin`.
#[derive(Args, Debug, Clone)]
pub struct PinArgs {
    /// Target environment (default: the configured default_environment)
    #[arg(short, long = "env", value_name = "ENV", value_parser = parse_environment)]
    pub environment: Option<EnvironmentName>,

    /// Branch, tag or commit to pin (default: tag on HEAD, else HEAD commit)
    #[arg(short, long = "ref", value_name = "REF")]
    pub reference: Option<String>,

    /// Appended to the commit message
    #[arg(short, long)]
    pub comment: Option<String>,

    /// Allow changing a protected environment
    #[arg(short, long)]
    pub force: bool,
}

/// Options shared by `remove` and `unpin`.
#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Module to remove (default: the current module)
    #[arg(short, long, value_name = "MODULE", value_parser = parse_module)]
    pub module: Option<ModuleId>,

    /// Target environment (default: the configured default_environment)
    #[arg(short, long = "env", value_name = "ENV", value_parser = parse_environment)]
    pub environment: Option<EnvironmentName>,

    /// Appended to the commit message
    #[arg(short, long)]
    pub comment: Option<String>,

    /// Allow changing a protected environment
    #[arg(short, long)]
    pub force: bool,
}

/// Module subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ModuleCommand {
    /// Pin the module and push the control repository
    Deploy(PinArgs),
    /// Pin the module and commit locally
    Pin(PinArgs),
    /// Remove the module's pin and push the control repository
    Remove(RemoveArgs),
    /// Remove the module's pin and commit locally
    Unpin(RemoveArgs),
    /// Run syntax checks over the module repository
    Validate,
}

/// Environment subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum EnvironmentCommand {
    /// List environments of the control repository
    List {
        /// Print a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Create an environment from an existing one
    Create {
        /// Environment to branch from
        #[arg(short, long, value_name = "ENV", value_parser = parse_environment)]
        from: EnvironmentName,

        /// Name of the new environment
        #[arg(short, long = "env", value_name = "ENV", value_parser = parse_environment)]
        environment: EnvironmentName,
    },
    /// Delete an environment
    Destroy {
        /// Environment to delete
        #[arg(short, long = "env", value_name = "ENV", value_parser = parse_environment)]
        environment: EnvironmentName,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_options() {
        let cli = parse(&[
            "ris-puppet", "module", "deploy", "-e", "development", "-r", "v1.0", "-c", "hotfix", "-f",
        ]);
        match cli.command {
            Command::Module {
                action: ModuleCommand::Deploy(args),
            } => {
                assert_eq!(args.environment.unwrap().as_str(), "development");
                assert_eq!(args.reference.as_deref(), Some("v1.0"));
                assert_eq!(args.comment.as_deref(), Some("hotfix"));
                assert!(args.force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn remove_accepts_external_module() {
        let cli = parse(&["ris-puppet", "module", "remove", "-m", "puppetlabs/stdlib"]);
        match cli.command {
            Command::Module {
                action: ModuleCommand::Remove(args),
            } => {
                assert_eq!(args.module.unwrap().as_str(), "puppetlabs/stdlib");
                assert!(args.environment.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn invalid_environment_is_rejected() {
        assert!(Cli::try_parse_from(["ris-puppet", "module", "pin", "-e", "bad..name"]).is_err());
    }

    #[test]
    fn environment_defaults_to_list() {
        let cli = parse(&["ris-puppet", "environment"]);
        assert!(matches!(cli.command, Command::Environment { action: None }));
    }

    #[test]
    fn create_requires_both_names() {
        assert!(Cli::try_parse_from(["ris-puppet", "environment", "create", "-e", "x"]).is_err());
        let cli = parse(&["ris-puppet", "environment", "create", "-f", "production", "-e", "x"]);
        assert!(matches!(
            cli.command,
            Command::Environment {
                action: Some(EnvironmentCommand::Create { .. })
            }
        ));
    }

    #[test]
    fn missing_option_summary_is_one_line() {
        let err = Cli::try_parse_from(["ris-puppet", "environment", "create", "-e", "x"]).unwrap_err();
        let summary = usage_error_summary(&err);
        assert!(!summary.contains('\n'));
        assert!(!summary.starts_with("error:"));
        assert!(summary.contains("--from"), "{summary}");
    }

    #[test]
    fn invalid_value_summary_names_the_value() {
        let err = Cli::try_parse_from(["ris-puppet", "module", "pin", "-e", "bad..name"]).unwrap_err();
        let summary = usage_error_summary(&err);
        assert!(summary.contains("bad..name"), "{summary}");
        assert!(!summary.contains("Usage:"));
    }

    #[test]
    fn help_is_not_a_usage_error() {
        let err = Cli::try_parse_from(["ris-puppet", "--help"]).unwrap_err();
        assert!(!err.use_stderr());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["ris-puppet", "environment", "list", "--trace", "-q", "--config", "/x.toml"]);
        assert!(cli.trace);
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/x.toml")));
    }
}
