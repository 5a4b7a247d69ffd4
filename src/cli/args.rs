//! Defines the command-line arguments and subcommands for the Rectify CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "rectify",
    version,
    about = "Bug checkers and before/after template rules that propose fixes for Java sources."
)]
pub struct RectifyArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// A YAML or JSON configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// A checker flag, `Check:Flag=value`. May be repeated.
    #[arg(long = "flag", global = true, value_name = "CHECK:FLAG=VALUE")]
    pub flags: Vec<String>,

    /// The Java language level of the analysed sources.
    #[arg(long, global = true, value_name = "N")]
    pub language_level: Option<u32>,

    /// Output format for diagnostics.
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report diagnostics for Java files or directories.
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Apply proposed fixes in place.
    Fix {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print a diff instead of writing files.
        #[arg(long)]
        dry_run: bool,
    },
    /// List all available checkers and template rules.
    Checks,
    /// Show the syntax tree of a Java file.
    Parse {
        #[arg(required = true)]
        file: PathBuf,
    },
}
