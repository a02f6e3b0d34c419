/*!
 * Error types for the subtitle-forge application.
 *
 * This module contains custom error types for the conversion pipeline and
 * the job submission surface, using the thiserror crate for ergonomic error
 * definitions.
 */

use thiserror::Error;

/// Errors that can end a conversion job
///
/// Every stage of the pipeline reports one of these. The supervisor maps
/// them onto a terminal job state; `Cancelled` is the only variant that does
/// not become a failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// Bad file type or an out-of-range option
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An external binary (normalizer or engine) could not be found
    #[error("External tool unavailable: {tool}")]
    ExternalToolUnavailable {
        /// Name of the missing tool
        tool: String,
    },

    /// An external tool ran but exited non-zero or produced malformed output
    #[error("External tool '{tool}' failed: {message}")]
    ExternalToolFailed {
        /// Name of the failing tool
        tool: String,
        /// Filtered diagnostic output
        message: String,
    },

    /// The engine returned no utterances or words
    #[error("No speech detected in the audio. Check that the recording contains audible speech and that the language hint is correct.")]
    NoSpeechDetected,

    /// A cancellation checkpoint fired
    #[error("Job cancelled at checkpoint: {0}")]
    Cancelled(String),

    /// Anything unexpected (I/O on scratch files, panics, join failures)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConversionError {
    /// Whether a client should retry by resubmitting the same job
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExternalToolUnavailable { .. } | Self::ExternalToolFailed { .. } | Self::Internal(_)
        )
    }

    /// Short machine-readable kind, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ExternalToolUnavailable { .. } => "external_tool_unavailable",
            Self::ExternalToolFailed { .. } => "external_tool_failed",
            Self::NoSpeechDetected => "no_speech_detected",
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn tool_unavailable(tool: &str) -> Self {
        Self::ExternalToolUnavailable {
            tool: tool.to_string(),
        }
    }

    pub fn tool_failed(tool: &str, message: impl Into<String>) -> Self {
        Self::ExternalToolFailed {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConversionError {
    fn from(error: std::io::Error) -> Self {
        Self::Internal(error.to_string())
    }
}

/// Reasons a submission is refused before any job is registered
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// Options or file type failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The access gate refused the caller
    #[error("Access denied: {0}")]
    AccessDenied(String),
}

/// Reasons a result download fails
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResultError {
    /// Unknown, expired or already retrieved token
    #[error("Result not found")]
    NotFound,

    /// The stored artifact could not be read
    #[error("Failed to read stored result: {0}")]
    Unreadable(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the conversion pipeline
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Submission was refused
    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    /// Result download failed
    #[error("Result error: {0}")]
    Result(#[from] ResultError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
