//! Command line options of the `leef` binary.

use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, FromArgMatches, Parser, Subcommand};

/// Convert between LEEF lines and newline-delimited JSON events.
#[derive(Parser, Debug)]
#[command(name = "leef", rename_all = "kebab-case")]
pub struct Opts {
    /// Options shared by every command.
    #[command(flatten)]
    pub root: RootOpts,

    /// The conversion to run.
    #[command(subcommand)]
    pub sub_command: SubCommand,
}

impl Opts {
    /// Parses the process arguments.
    ///
    /// # Errors
    ///
    /// Returns the `clap` error for invalid arguments and for `--help` and
    /// `--version`, which the caller is expected to print.
    pub fn get_matches() -> Result<Self, clap::Error> {
        let command = Self::command().version(env!("CARGO_PKG_VERSION"));
        Self::from_arg_matches(&command.try_get_matches()?)
    }

    /// The level of the crate's own log output.
    pub const fn log_level(&self) -> &'static str {
        match self.root.quiet {
            0 => match self.root.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            },
            1 => "warn",
            2 => "error",
            _ => "off",
        }
    }
}

/// Options shared by every command.
#[derive(Args, Debug)]
#[command(rename_all = "kebab-case")]
pub struct RootOpts {
    /// Read configuration from a TOML file.
    ///
    /// Without a file the built-in defaults are used.
    #[arg(short, long, env = "LEEF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable more detailed internal logging. Repeat to increase level. Overridden by `--quiet`.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce detail of internal logging. Repeat to reduce further. Overrides `--verbose`.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

/// The conversions the binary can run.
#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_all = "kebab-case")]
pub enum SubCommand {
    /// Read LEEF lines from stdin and write one JSON event per line to stdout.
    Decode,

    /// Read one JSON object per line from stdin and write LEEF lines to stdout.
    Encode,
}
