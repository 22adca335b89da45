// File: src/errors.rs
//
// Error handling and reporting for the pushvm interpreter.
// The core deliberately has a narrow error taxonomy: running Push programs
// never fails (underflow and divide-by-zero are silent no-ops), so errors
// only surface from state serialization and I/O.

use colored::Colorize;
use once_cell::sync::Lazy;
use std::fmt;

/// Types of errors that can occur in pushvm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed serialized state
    ParseError,
    /// A structurally valid document that cannot be applied
    StateError,
    /// Underlying I/O failure
    IoError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::ParseError => write!(f, "Parse Error"),
            ErrorKind::StateError => write!(f, "State Error"),
            ErrorKind::IoError => write!(f, "I/O Error"),
        }
    }
}

/// A structured error with an optional byte position into the source document
#[derive(Debug, Clone)]
pub struct PushError {
    pub kind: ErrorKind,
    pub message: String,
    pub position: Option<u64>,
}

impl PushError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), position: None }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StateError, message)
    }

    /// Attach the byte offset at which the error was detected
    pub fn at(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind_str = format!("{}", self.kind);
        write!(f, "{}: {}", kind_str.red().bold(), self.message.bold())?;
        if let Some(pos) = self.position {
            let location_str = format!("  --> byte {}", pos);
            write!(f, "\n{}", location_str.bright_blue())?;
        }
        Ok(())
    }
}

impl std::error::Error for PushError {}

impl From<std::io::Error> for PushError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::IoError, err.to_string())
    }
}

impl From<quick_xml::Error> for PushError {
    fn from(err: quick_xml::Error) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for PushError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for PushError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for PushError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<std::num::ParseIntError> for PushError {
    fn from(err: std::num::ParseIntError) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for PushError {
    fn from(err: std::num::ParseFloatError) -> Self {
        Self::parse(err.to_string())
    }
}

static QUIET: Lazy<bool> = Lazy::new(|| std::env::var_os("PUSHVM_QUIET").is_some());

/// Non-fatal observability sink. Unknown instructions in a serialized state,
/// missing configuration keys and similar recoverable conditions end up here.
/// Set PUSHVM_QUIET to suppress the output.
pub fn warn(message: &str) {
    if *QUIET {
        return;
    }
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}
