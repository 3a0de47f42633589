//! Error types shared by every stage of the pipeline.
//!
//! Mirrors the reference interpreter's `sysexits`-flavoured error taxonomy:
//! each error carries a fixed exit code so a wrapping CLI can distinguish
//! fatal categories without downcasting.

use std::{error::Error, fmt::Display};

/// BSD sysexits, as used by the reference implementation's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    Usage = 64,
    DataErr = 65,
    NoInput = 66,
    NoUser = 67,
    NoHost = 68,
    Unavailable = 69,
    Software = 70,
    OsErr = 71,
    OsFile = 72,
    CantCreat = 73,
    IoErr = 74,
    TempFail = 75,
    Protocol = 76,
    NoPerm = 77,
    Config = 78,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// A source position used for caret diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The kind of failure, driving both the exit code and the message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Resolution,
    Runtime,
}

impl ErrorKind {
    fn exit_code(self) -> ExitCode {
        match self {
            ErrorKind::Syntax => ExitCode::Usage,
            ErrorKind::Resolution => ExitCode::Software,
            ErrorKind::Runtime => ExitCode::Usage,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Resolution => "ResolutionError",
            ErrorKind::Runtime => "RuntimeError",
        }
    }
}

/// A single diagnostic produced anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoxError {
    pub kind: ErrorKind,
    pub message: String,
    pub position: Option<Position>,
    pub source_line: Option<String>,
    exit_code: ExitCode,
}

impl LoxError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            exit_code: kind.exit_code(),
            kind,
            message: message.into(),
            position: None,
            source_line: None,
        }
    }

    pub fn at(mut self, position: Position, source_line: Option<&str>) -> Self {
        self.position = Some(position);
        self.source_line = source_line.map(str::to_owned);
        self
    }

    pub fn with_exit_code(mut self, exit_code: ExitCode) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn data_err(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message).with_exit_code(ExitCode::DataErr)
    }

    pub fn no_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message).with_exit_code(ExitCode::NoInput)
    }

    /// A failed write or other OS-level I/O failure.
    pub fn io_err(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message).with_exit_code(ExitCode::IoErr)
    }

    /// A failed network request.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message).with_exit_code(ExitCode::Protocol)
    }

    /// A missing-attribute/method error. Classified with the resolver's exit
    /// code rather than the generic runtime one, per the reference
    /// taxonomy's "resolution and attribute errors use EX_SOFTWARE".
    pub fn attribute(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message).with_exit_code(ExitCode::Software)
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }
}

impl Display for LoxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(position) = self.position else {
            return write!(f, "{}: {}", self.kind.label(), self.message);
        };

        write!(
            f,
            "{} at line {}:{}",
            self.kind.label(),
            position.line,
            position.column
        )?;

        if let Some(line) = &self.source_line {
            let caret_offset = position.column.saturating_sub(1);
            let padding: String = "~".repeat(caret_offset);
            write!(f, "\n{line}\n{padding}^\n{}", self.message)
        } else {
            write!(f, "\n{}", self.message)
        }
    }
}

impl Error for LoxError {}
