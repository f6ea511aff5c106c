//! Defines the command-line arguments and subcommands.
//!
//! Uses the `clap` derive API; there is no configuration file, every setting
//! comes from here.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use termcolor::ColorChoice;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "sas-lineage",
    version,
    about = "Parse DATA/PROC step programs and report dataset lineage."
)]
pub struct LineageArgs {
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG also applies.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// When to colour output.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse every .sas file under a path and report errors.
    Check {
        /// A .sas file or a directory to search.
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Show the syntax tree for a program.
    Ast {
        /// The program to parse.
        #[arg(required = true)]
        file: PathBuf,
        /// Print JSON instead of the debug tree.
        #[arg(long)]
        json: bool,
        /// Print the parse tree before AST building.
        #[arg(long, conflicts_with = "json")]
        tree: bool,
    },
    /// Print the canonical rendering of a program.
    Format {
        /// The program to format.
        #[arg(required = true)]
        file: PathBuf,
        /// Show a line diff against the input instead.
        #[arg(long)]
        diff: bool,
    },
    /// Extract dataset lineage from a file or every .sas file under a directory.
    Lineage {
        /// A .sas file or a directory to search.
        #[arg(required = true)]
        path: PathBuf,
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// The termcolor choice for stdout. `auto` colours only a terminal.
    pub fn choice(self) -> ColorChoice {
        match self {
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
            ColorMode::Auto if std::io::stdout().is_terminal() => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}
