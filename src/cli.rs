//! Command-line interface for accurev-exec.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::execution::parse_max_concurrency;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Program to launch (overrides config file).
    pub program: Option<String>,
    /// Concurrency limit for the async path.
    pub max_concurrency: Option<usize>,
    /// Working directory for launched processes.
    pub working_dir: Option<PathBuf>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Run commands one by one on the blocking path.
    pub sync: bool,
    /// Command texts to run.
    pub commands: Vec<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('p') | Long("program") => {
                result.program = Some(parser.value()?.parse()?);
            }
            Short('j') | Long("max-concurrency") => {
                let value: String = parser.value()?.parse()?;
                let n = parse_max_concurrency(&value)
                    .ok_or(ArgsError::InvalidValue("max-concurrency", value))?;
                result.max_concurrency = Some(n);
            }
            Short('C') | Long("cwd") => {
                result.working_dir = Some(parser.value()?.parse()?);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("sync") => {
                result.sync = true;
            }
            Value(val) => {
                let text = val
                    .into_string()
                    .map_err(|v| ArgsError::InvalidCommand(v.to_string_lossy().into()))?;
                result.commands.push(text);
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"accurev-exec {version}
Run AccuRev CLI commands with bounded concurrency

USAGE:
    accurev-exec [OPTIONS] <COMMAND TEXT>...

Each COMMAND TEXT is one full argument string for the wrapped program,
e.g. "hist -fx -p ProjectX -t 453". Quote names containing spaces with
double quotes inside the text.

OPTIONS:
    -p, --program <PATH>        Program to launch [default: accurev]
    -j, --max-concurrency <N>   Max concurrent commands [default: 8]
    -C, --cwd <DIR>             Working directory for launched processes
    -c, --config <FILE>         Path to configuration file (JSON)
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
        --sync                  Run commands one by one, bypassing the scheduler
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT VARIABLES:
    ACCUREV_MAX_CONCURRENCY     Concurrency limit (overrides config)
    ACCUREV_EXEC_PROGRAM        Program to launch (overrides config)
    ACCUREV_EXEC_LOG_LEVEL      Log level (overrides config)
    RUST_LOG                    Alternative log level setting

EXAMPLES:
    # Show the current user's info
    accurev-exec info

    # Fetch several transactions, at most 4 at a time
    accurev-exec -j 4 "hist -fx -p ProjectX -t 453" "hist -fx -p ProjectX -t 454"

    # Diff two versions (exit code 1 means differences, not failure)
    accurev-exec "diff -b 10 -v 20"
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("accurev-exec {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Command text that is not valid UTF-8.
    InvalidCommand(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::InvalidCommand(text) => {
                write!(f, "command text is not valid UTF-8: '{}'", text)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
