//! Unified error types for voicepack.
//!
//! This module provides a single [`VoicepackError`] enum that covers all
//! error cases in the library.
//!
//! # Error Handling Philosophy
//!
//! - **Library users** get typed errors they can match on
//! - **Application users** get clear, actionable error messages
//! - **Developers** get source error chains for debugging
//!
//! Per-fragment failures never surface through this type during a run:
//! the engine catches them, records a [`Warning`](crate::diagnostics::Warning)
//! and continues with the remaining fragments. Only configuration problems
//! abort before processing starts.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for voicepack operations.
///
/// # Example
///
/// ```rust
/// use voicepack::error::Result;
///
/// fn my_function() -> Result<()> {
///     // ... operations that may fail
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, VoicepackError>;

/// The error type for all voicepack operations.
///
/// Each variant contains context about what went wrong and, where
/// applicable, the underlying source error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VoicepackError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - An input fragment or the attachments directory doesn't exist
    /// - Permission denied
    /// - Disk is full (when writing output)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse an export fragment.
    ///
    /// Contains the underlying parse error and optionally the file path.
    /// During an engine run this is caught per fragment and downgraded to
    /// a skipped-fragment warning.
    #[error("Failed to parse fragment{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Parse {
        /// The underlying parse error
        #[source]
        source: ParseErrorKind,
        /// The file path, if available
        path: Option<PathBuf>,
    },

    /// The file doesn't match the expected Takeout structure.
    ///
    /// This occurs when:
    /// - The filename carries no recognizable record kind
    /// - A message block has no parseable timestamp
    #[error("Invalid fragment format: {message}")]
    InvalidFormat {
        /// Description of what's wrong
        message: String,
    },

    /// Invalid date in filter configuration.
    ///
    /// Date bounds expect YYYY-MM-DD format.
    #[error("Invalid date '{input}'. Expected format: {expected}")]
    InvalidDate {
        /// The invalid date string that was provided
        input: String,
        /// Expected format description
        expected: &'static str,
    },

    /// Invalid or contradictory engine configuration.
    ///
    /// Fatal before any fragment processing begins (an unparseable own
    /// number, a date range with `newer_than` after `older_than`, a zero
    /// worker count).
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the contradiction
        message: String,
    },

    /// A phone number token could not be normalized to E.164.
    #[error("Invalid phone number '{input}'")]
    InvalidPhoneNumber {
        /// The token that failed normalization
        input: String,
    },

    /// CSV writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing/serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Kinds of parse errors that can occur inside a fragment.
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// A timestamp attribute that chrono could not parse
    #[error("unparseable timestamp '{0}'")]
    Timestamp(String),
    /// Markup missing a required structural element
    #[error("missing {0}")]
    MissingElement(&'static str),
    /// Generic parsing error
    #[error("{0}")]
    Other(String),
}

impl VoicepackError {
    /// Creates a [`VoicepackError::Parse`] for a fragment file.
    pub fn parse(source: ParseErrorKind, path: impl Into<PathBuf>) -> Self {
        VoicepackError::Parse {
            source,
            path: Some(path.into()),
        }
    }

    /// Creates a [`VoicepackError::InvalidFormat`] error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        VoicepackError::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a [`VoicepackError::InvalidDate`] error.
    pub fn invalid_date(input: impl Into<String>) -> Self {
        VoicepackError::InvalidDate {
            input: input.into(),
            expected: "YYYY-MM-DD",
        }
    }

    /// Creates a [`VoicepackError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        VoicepackError::Config {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is fatal at startup rather than
    /// recoverable per fragment.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            VoicepackError::Config { .. } | VoicepackError::InvalidDate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VoicepackError::invalid_date("01-01-2024");
        let msg = err.to_string();
        assert!(msg.contains("01-01-2024"));
        assert!(msg.contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_parse_error_includes_path() {
        let err = VoicepackError::parse(
            ParseErrorKind::MissingElement("participants"),
            "/tmp/x.html",
        );
        let msg = err.to_string();
        assert!(msg.contains("x.html"));
        assert!(msg.contains("participants"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: VoicepackError = io_err.into();
        assert!(matches!(err, VoicepackError::Io(_)));
    }

    #[test]
    fn test_config_error_is_fatal() {
        assert!(VoicepackError::config("bad range").is_config_error());
        assert!(VoicepackError::invalid_date("x").is_config_error());
        assert!(!VoicepackError::invalid_format("x").is_config_error());
    }
}
