//! Error handling types and utilities for the PLC language toolchain.
//!
//! One lightweight error type serves every pass. Parse errors always carry
//! the byte offset of the offending token (or of the end of the last
//! consumed token when the stream ran out); analysis and runtime errors
//! usually carry a message alone.
//!
//! # Examples
//!
//! ```rust
//! use plc_syntax::error::{Error, Result, error, error_at};
//!
//! // A runtime error with no position
//! let plain = Error::new("Division by zero");
//! assert_eq!(plain.to_string(), "Division by zero");
//!
//! // A parse error pointing at byte 17
//! let positioned = Error::at(17, "Missing semicolon");
//! assert_eq!(positioned.to_string(), "Missing semicolon at index 17");
//!
//! fn might_fail(flag: bool) -> Result<i32> {
//!     if flag { error("Operation failed") } else { Ok(1) }
//! }
//! ```

use std::fmt;

/// An error from any pass of the PLC toolchain.
///
/// # Fields
///
/// - `msg`: human-readable description
/// - `index`: optional byte offset into the source (0-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Human-readable error message
    pub msg: String,

    /// Optional byte offset into the source file (0-based)
    pub index: Option<usize>,
}

impl Error {
    /// Creates an error with the given message and no source position.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            index: None,
        }
    }

    /// Creates an error pointing at the given byte offset.
    pub fn at(index: usize, msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(i) = self.index {
            write!(f, "{} at index {}", self.msg, i)
        } else {
            write!(f, "{}", self.msg)
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::new(s)
    }
}
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::new(s)
    }
}

/// A specialized `Result` type for PLC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to create an error result.
///
/// Shorthand for `Err(Error::new(msg))`.
pub fn error<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::new(msg))
}

/// Convenience function to create an error result with a source position.
///
/// Shorthand for `Err(Error::at(index, msg))`.
pub fn error_at<T>(index: usize, msg: impl Into<String>) -> Result<T> {
    Err(Error::at(index, msg))
}
