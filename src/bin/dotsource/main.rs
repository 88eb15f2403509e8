//! `dotsource` command-line entry point.
//!
//! ```text
//! Cli::parse() --> init_logging --> print | run
//! ```

mod cli;
mod logging;

use std::ffi::OsString;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Command as ProcessCommand, ExitCode};

use clap::Parser;
use dotsource::{EnvLoader, EnvironmentMap, KeyMode};
use tracing::{debug, info};

use crate::cli::{Cli, Command, FileArgs, Format, PrintArgs, RunArgs};
use crate::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Print(args) => print(args),
        Command::Run(args) => run(args),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("dotsource: {err}");
            ExitCode::FAILURE
        }
    }
}

fn loader_for(files: &FileArgs) -> Result<EnvLoader, String> {
    let key_mode = if files.shell_keys {
        KeyMode::Shell
    } else {
        KeyMode::Verbatim
    };
    Ok(EnvLoader::new()
        .paths(files.paths()?)
        .required(!files.ignore_missing)
        .search_upward(files.search_upward)
        .key_mode(key_mode))
}

fn print(args: PrintArgs) -> Result<ExitCode, String> {
    let map = loader_for(&args.files)?
        .parse_only()
        .map_err(|err| err.to_string())?;
    info!(entries = map.len(), "parsed dotenv files");

    let rendered = match args.format {
        Format::Shell => render_shell(&map),
        Format::Json => render_json(&map).map_err(|err| err.to_string())?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| format!("failed to write output: {err}"))?;
    Ok(ExitCode::SUCCESS)
}

fn render_shell(map: &EnvironmentMap) -> String {
    let mut out = String::new();
    for (key, value) in map.iter() {
        out.push_str(key);
        out.push('=');
        out.push_str(&shell_quote(value));
        out.push('\n');
    }
    out
}

fn render_json(map: &EnvironmentMap) -> Result<String, serde_json::Error> {
    let object: serde_json::Map<String, serde_json::Value> = map
        .iter()
        .map(|(key, value)| (key.to_owned(), serde_json::Value::from(value)))
        .collect();
    let mut out = serde_json::to_string_pretty(&object)?;
    out.push('\n');
    Ok(out)
}

/// Single-quote `value` so a shell reads it back byte-for-byte.
///
/// An embedded `'` becomes `'\''`, which relies on the shell joining
/// adjacent quoted words. This crate's parser ignores text after a closing
/// quote, so such values only round-trip through a real shell.
fn shell_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

fn run(args: RunArgs) -> Result<ExitCode, String> {
    let map = loader_for(&args.files)?
        .parse_only()
        .map_err(|err| err.to_string())?;

    let Some((program, program_args)) = args.command.split_first() else {
        return Err("missing command after `run`".to_owned());
    };

    let mut command = ProcessCommand::new(program);
    command.args(program_args);

    for (key, value) in map.iter() {
        if !args.override_existing && std::env::var_os(key).is_some() {
            debug!(key, "keeping inherited value");
            continue;
        }
        command.env(key, value);
    }

    execute_command(command, program)
}

#[cfg(unix)]
fn execute_command(mut command: ProcessCommand, program: &OsString) -> Result<ExitCode, String> {
    let err = command.exec();
    Err(format!(
        "failed to execute `{}`: {err}",
        program.to_string_lossy()
    ))
}

#[cfg(not(unix))]
fn execute_command(mut command: ProcessCommand, program: &OsString) -> Result<ExitCode, String> {
    let status = command
        .status()
        .map_err(|err| format!("failed to execute `{}`: {err}", program.to_string_lossy()))?;
    let code = status.code().unwrap_or(1);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
