//! Error types for the CAM tools crate.
//!
//! Parse failures carry the 1-based line number and the offending
//! command so a caller can point at the exact spot in the source file.

use pcbcam_core::{FormatError, ToolTableError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during CAM operations.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// Malformed coordinate text outside of a file parse.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// A Gerber or Excellon file is structurally invalid.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// An isolation pass degenerated.
    #[error(transparent)]
    Isolation(#[from] IsolationError),

    /// Every tool of a job came out empty.
    #[error("Empty job: no tool produced any motion")]
    EmptyJob,

    /// Reading or writing a file failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid parameters were provided to an operation.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// A tool table operation failed.
    #[error("Tool table error: {0}")]
    ToolTable(#[from] ToolTableError),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Formatting output text failed.
    #[error("Write error: {0}")]
    Write(#[from] std::fmt::Error),
}

impl CamToolError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CamToolError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while parsing Gerber or Excellon text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The command is not part of the supported vocabulary.
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    /// The command is valid but this engine does not implement it.
    #[error("line {line}: unsupported command '{command}' ({feature})")]
    Unsupported {
        line: usize,
        command: String,
        feature: String,
    },

    /// Coordinates appeared before the format was known.
    #[error("line {line}: coordinate '{command}' before format specification")]
    MissingFormat { line: usize, command: String },

    /// A coordinate could not be decoded.
    #[error("line {line}: bad coordinate in '{command}': {source}")]
    InvalidCoordinate {
        line: usize,
        command: String,
        #[source]
        source: FormatError,
    },

    /// An aperture was used before being defined.
    #[error("line {line}: aperture D{id} is not defined")]
    UndefinedAperture { line: usize, id: u32 },

    /// A tool was selected before being defined.
    #[error("line {line}: tool T{tool} is not defined")]
    UndefinedTool { line: usize, tool: u32 },

    /// The command is recognised but its arguments are wrong.
    #[error("line {line}: malformed '{command}': {reason}")]
    Malformed {
        line: usize,
        command: String,
        reason: String,
    },

    /// The input ended inside a block.
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),
}

impl ParseError {
    pub fn malformed(line: usize, command: &str, reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            line,
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unknown(line: usize, command: &str) -> Self {
        ParseError::UnknownCommand {
            line,
            command: command.to_string(),
        }
    }

    pub fn unsupported(line: usize, command: &str, feature: &str) -> Self {
        ParseError::Unsupported {
            line,
            command: command.to_string(),
            feature: feature.to_string(),
        }
    }
}

/// An isolation pass produced no usable geometry.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Isolation pass {pass} failed: {reason}")]
pub struct IsolationError {
    pub pass: usize,
    pub reason: String,
}

/// Result type alias for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;

/// Result type alias for file parsing.
pub type ParseResult<T> = Result<T, ParseError>;
