use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

const DEFAULT_FILE: &str = ".env";

/// Load `.env` files with shell `source` semantics.
#[derive(Debug, Parser)]
#[command(name = "dotsource", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse dotenv files and print the resolved variables.
    Print(PrintArgs),
    /// Load dotenv files and execute a command.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct FileArgs {
    /// Dotenv file path(s). Repeat or pass comma-separated paths.
    #[arg(
        short = 'f',
        long = "file",
        value_name = "PATHS",
        value_delimiter = ',',
        default_value = DEFAULT_FILE
    )]
    pub files: Vec<PathBuf>,

    /// Ignore missing dotenv files.
    #[arg(short = 'i', long = "ignore-missing", visible_alias = "ignore")]
    pub ignore_missing: bool,

    /// Search parent directories for relative dotenv files.
    #[arg(short = 'u', long)]
    pub search_upward: bool,

    /// Reject keys that are not shell identifiers.
    #[arg(long)]
    pub shell_keys: bool,
}

impl FileArgs {
    /// Selected files with empty comma segments dropped.
    pub fn paths(&self) -> Result<Vec<PathBuf>, String> {
        let paths: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|path| !path.as_os_str().is_empty())
            .cloned()
            .collect();
        if paths.is_empty() {
            return Err("`-f/--file` requires at least one path".to_owned());
        }
        Ok(paths)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// `KEY='value'` lines that can be sourced again.
    #[default]
    Shell,
    /// A JSON object in file order.
    Json,
}

#[derive(Debug, Args)]
pub struct PrintArgs {
    #[command(flatten)]
    pub files: FileArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Shell)]
    pub format: Format,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub files: FileArgs,

    /// Override existing environment variables.
    #[arg(short = 'o', long = "override", visible_alias = "overload")]
    pub override_existing: bool,

    /// Command to execute, followed by its arguments.
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<OsString>,
}
