//! # CLI Argument Parsing
//!
//! This module defines the command-line interface for the `monomaker` tool
//! using the `clap` library. It is responsible for:
//!
//! - Defining the CLI surface, including global output arguments like
//!   `--color` and `--log-level`.
//! - Initializing the logger from those arguments.
//! - Installing the SIGINT handler that requests cooperative cancellation.
//! - Running the orchestrator and mapping its outcome to a process exit
//!   code.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::{error, LevelFilter};

use monomaker::error::exit_codes;
use monomaker::phases::orchestrator::{self, CancelFlag, RunOptions, RunStatus};

/// Monomaker - Convert a meta-repository of submodules into a monorepo
#[derive(Parser, Debug)]
#[command(name = "monomaker")]
#[command(
    version,
    about,
    long_about = "Monomaker - Convert a meta-repository of git submodules into a monorepo, \
                  preserving every branch known to any participating repository"
)]
pub struct Cli {
    /// Path or URL of the meta-repository to convert
    #[arg(value_name = "METAREPO")]
    metarepo: String,

    /// Workspace directory for sources, the monorepo and the report
    #[arg(long, value_name = "DIR", default_value = "monomaker-workspace")]
    workspace: PathBuf,

    /// JSON file with an array of branch names to import (default branches
    /// are always included)
    #[arg(long, value_name = "PATH")]
    branches_whitelist: Option<PathBuf>,

    /// JSON file mapping submodule path to { "url", "consume_branches" };
    /// an opted-out submodule is not imported and stays a pinned submodule
    /// entry in the monorepo
    #[arg(long, value_name = "PATH")]
    migration_strategy: Option<PathBuf>,

    /// Where to write the migration report (defaults to <workspace>/report.json)
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Number of parallel discovery workers
    #[arg(long, value_name = "N", default_value_t = 4)]
    workers: usize,

    /// Keep the sources/ clones on disk when the run fails, for inspection
    #[arg(long)]
    keep_on_failure: bool,

    /// Never reproduce meta-repo merge topology; always graft linearly
    #[arg(long)]
    flatten_merges: bool,

    /// Colorize log output
    #[arg(
        long,
        global = true,
        value_name = "WHEN",
        value_parser = ["always", "never", "auto"],
        default_value = "auto"
    )]
    color: String,

    /// Log level when neither --verbose nor --quiet is given
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        value_parser = ["error", "warn", "info", "debug", "trace", "off"],
        default_value = "info"
    )]
    log_level: String,

    /// Increase output verbosity (can be repeated: --verbose --verbose)
    #[arg(long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Suppress output except errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Run the conversion and return the process exit code.
    pub fn execute(self) -> i32 {
        if let Err(e) = self.init_logger() {
            eprintln!("Error: {e}");
            return exit_codes::USAGE;
        }
        if self.workers == 0 {
            error!("--workers must be at least 1");
            return exit_codes::USAGE;
        }

        let cancel = CancelFlag::new();
        let handler_flag = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || handler_flag.cancel()) {
            error!("could not install interrupt handler: {e}");
        }

        let options = RunOptions {
            metarepo: self.metarepo,
            workspace: self.workspace,
            whitelist_path: self.branches_whitelist,
            strategy_path: self.migration_strategy,
            report_path: self.report,
            workers: self.workers,
            keep_on_failure: self.keep_on_failure,
            flatten_merges: self.flatten_merges,
        };

        match orchestrator::run(&options, &cancel) {
            Ok(RunStatus::Success) => exit_codes::SUCCESS,
            Ok(RunStatus::Partial { failed_branches }) => {
                error!(
                    "{} branch(es) failed: {}",
                    failed_branches.len(),
                    failed_branches.join(", ")
                );
                exit_codes::PARTIAL
            }
            Ok(RunStatus::Cancelled) => {
                error!("run cancelled; workspace left in place");
                exit_codes::CANCELLED
            }
            Err(e) => {
                error!("{e}");
                e.exit_code()
            }
        }
    }

    /// Wire up `env_logger`. Monomaker logs on stderr without timestamps;
    /// clap has already validated the `--color` and `--log-level` values.
    fn init_logger(&self) -> anyhow::Result<()> {
        let style = if self.color_enabled() {
            env_logger::WriteStyle::Auto
        } else {
            env_logger::WriteStyle::Never
        };
        env_logger::Builder::from_default_env()
            .filter_level(self.log_filter())
            .write_style(style)
            .format_timestamp(None)
            .format_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("logger setup failed: {e}"))?;
        Ok(())
    }

    /// The effective log filter: `--quiet` silences everything below
    /// errors, repeated `--verbose` opens things up, and otherwise the
    /// `--log-level` value applies as-is.
    fn log_filter(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => self.log_level.parse().unwrap_or(LevelFilter::Info),
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Whether log output should be styled. Auto mode probes stderr, the
    /// stream the logs actually go to.
    fn color_enabled(&self) -> bool {
        match self.color.as_str() {
            "always" => true,
            "never" => false,
            _ => console::Term::stderr().features().colors_supported(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(log_level: &str, verbose: u8, quiet: bool) -> Cli {
        Cli {
            metarepo: "/tmp/meta".to_string(),
            workspace: PathBuf::from("ws"),
            branches_whitelist: None,
            migration_strategy: None,
            report: None,
            workers: 4,
            keep_on_failure: false,
            flatten_merges: false,
            color: "auto".to_string(),
            log_level: log_level.to_string(),
            verbose,
            quiet,
        }
    }

    #[test]
    fn test_verbose_raises_the_filter() {
        assert_eq!(cli_with("info", 1, false).log_filter(), LevelFilter::Debug);
        assert_eq!(cli_with("info", 3, false).log_filter(), LevelFilter::Trace);
    }

    #[test]
    fn test_quiet_drops_to_errors_only() {
        assert_eq!(cli_with("debug", 0, true).log_filter(), LevelFilter::Error);
    }

    #[test]
    fn test_explicit_level_applies_without_modifiers() {
        assert_eq!(cli_with("warn", 0, false).log_filter(), LevelFilter::Warn);
        assert_eq!(cli_with("off", 0, false).log_filter(), LevelFilter::Off);
    }

    #[test]
    fn test_unknown_log_level_is_rejected_at_parse_time() {
        let result = Cli::try_parse_from(["monomaker", "/tmp/meta", "--log-level", "loud"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_color_value_is_rejected_at_parse_time() {
        let result = Cli::try_parse_from(["monomaker", "/tmp/meta", "--color", "sometimes"]);
        assert!(result.is_err());
    }
}
