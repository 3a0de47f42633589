//! Command-line argument parsing for the `lox` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Run a Lox script, or start a REPL when no script is given.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a `.lox` script. Omit to start an interactive REPL.
    #[arg(index = 1)]
    pub file: Option<PathBuf>,

    /// Log level for diagnostics.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    #[default]
    #[value(alias("0"))]
    Error,
    #[value(alias("1"))]
    Warn,
    #[value(alias("2"))]
    Info,
    #[value(alias("3"))]
    Debug,
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
