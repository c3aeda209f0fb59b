//! Error types for the core crate.
//!
//! Coordinate text formatting/parsing failures and tool table failures.

use thiserror::Error;

/// Errors raised by the fixed-point coordinate codec.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// The digit string contained something other than digits, a sign or a decimal point.
    #[error("Invalid digit string '{raw}'")]
    InvalidDigits { raw: String },

    /// The digit string was empty.
    #[error("Empty digit string")]
    Empty,

    /// The digit string holds more digits than the format allows.
    #[error("Digit string '{raw}' exceeds {max} digits")]
    TooManyDigits { raw: String, max: usize },

    /// The value does not fit in the configured number of integer digits.
    #[error("Value {value} does not fit in {int_digits} integer digits")]
    Overflow { value: f64, int_digits: u8 },

    /// The digit layout itself is unusable.
    #[error("Invalid coordinate format {int_digits}.{dec_digits}")]
    InvalidLayout { int_digits: u8, dec_digits: u8 },
}

/// Errors raised by tool table operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolTableError {
    /// No tool with the given id exists.
    #[error("Tool {0} not found")]
    UnknownTool(u32),

    /// A persisted tool key could not be coerced into an integer id.
    #[error("Invalid tool key '{0}'")]
    InvalidKey(String),
}

/// Result type alias for codec operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type alias for tool table operations.
pub type ToolTableResult<T> = Result<T, ToolTableError>;
