//! Recast CLI: the command-line driver for the incremental compiler and merger.
//!
//! `recast compile` and `recast merge` bring their outputs up to date, doing a
//! full run only when no usable state exists. `recast status` tells which kind
//! of run comes next, and `recast clean` forgets all state and outputs.

#![warn(missing_docs)]

mod clean;
mod compile;
mod logging;
mod merge;
mod pipeline;
mod status;

use std::process;

use clap::{Parser, Subcommand};

/// Recast: incremental recomputation for build pipelines.
#[derive(Parser, Debug)]
#[command(name = "recast", version, about = "Recast incremental build steps")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print run reports as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Override the number of worker threads from `recast.toml`.
    #[arg(short = 'j', long, global = true)]
    pub threads: Option<usize>,

    /// Path to a custom `recast.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Compile every main file affected since the last run.
    Compile,
    /// Merge the configured inputs into the output directory.
    Merge,
    /// Report whether the next runs will be full or incremental.
    Status,
    /// Delete state files and outputs.
    Clean(CleanArgs),
}

/// Arguments for the `recast clean` subcommand.
#[derive(Parser, Debug, PartialEq, Eq)]
pub struct CleanArgs {
    /// Clean only the compile step.
    #[arg(long, conflicts_with = "merge")]
    pub compile: bool,

    /// Clean only the merge step.
    #[arg(long)]
    pub merge: bool,
}

impl CleanArgs {
    /// Whether the compile step is cleaned.
    pub fn includes_compile(&self) -> bool {
        self.compile || !self.merge
    }

    /// Whether the merge step is cleaned.
    pub fn includes_merge(&self) -> bool {
        self.merge || !self.compile
    }
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether reports are printed as JSON.
    pub json: bool,
    /// Worker thread override.
    pub threads: Option<usize>,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        json: cli.json,
        threads: cli.threads,
        config: cli.config,
    };
    logging::init(&global);

    let result = match cli.command {
        Command::Compile => compile::run(&global),
        Command::Merge => merge::run(&global),
        Command::Status => status::run(&global),
        Command::Clean(ref args) => clean::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {}", pipeline::error_chain(e.as_ref()));
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_compile() {
        let cli = Cli::parse_from(["recast", "compile"]);
        assert_eq!(cli.command, Command::Compile);
        assert!(!cli.quiet);
        assert!(!cli.json);
        assert!(cli.threads.is_none());
    }

    #[test]
    fn parse_merge_with_threads() {
        let cli = Cli::parse_from(["recast", "merge", "-j", "4"]);
        assert_eq!(cli.command, Command::Merge);
        assert_eq!(cli.threads, Some(4));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["recast", "--quiet", "--json", "status"]);
        assert!(cli.quiet);
        assert!(cli.json);
        assert!(!cli.verbose);
        assert_eq!(cli.command, Command::Status);
    }

    #[test]
    fn parse_verbose_after_subcommand() {
        let cli = Cli::parse_from(["recast", "compile", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["recast", "--config", "/path/to/recast.toml", "merge"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/recast.toml"));
    }

    #[test]
    fn parse_clean_default_cleans_both() {
        let cli = Cli::parse_from(["recast", "clean"]);
        match cli.command {
            Command::Clean(ref args) => {
                assert!(args.includes_compile());
                assert!(args.includes_merge());
            }
            _ => panic!("expected Clean command"),
        }
    }

    #[test]
    fn parse_clean_compile_only() {
        let cli = Cli::parse_from(["recast", "clean", "--compile"]);
        match cli.command {
            Command::Clean(ref args) => {
                assert!(args.includes_compile());
                assert!(!args.includes_merge());
            }
            _ => panic!("expected Clean command"),
        }
    }

    #[test]
    fn parse_clean_conflicting_flags_rejected() {
        assert!(Cli::try_parse_from(["recast", "clean", "--compile", "--merge"]).is_err());
    }

    #[test]
    fn missing_subcommand_rejected() {
        assert!(Cli::try_parse_from(["recast"]).is_err());
    }
}
