//! Error types for Docportal
//!
//! This module defines the error taxonomy used throughout the client,
//! using `thiserror` for ergonomic error handling:
//!
//! - [`ValidationError`] -- local, pre-network problems with a file selection
//! - [`GatewayError`] -- transport-level failures of a single call
//! - [`PortalError`] -- everything an entry point of the client can report

use thiserror::Error;

/// A single violated file-selection rule.
///
/// Validation collects every violated rule so all of them can be shown
/// together; none of these ever reaches the network layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No files were selected
    #[error("No files selected")]
    Empty,

    /// More files than a single request may carry
    #[error("Too many files: {count} selected, at most {max} allowed")]
    TooManyFiles {
        /// Number of files in the selection
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// A file exceeds the per-file size limit
    #[error("{name} is too large ({size} bytes, limit {max} bytes)")]
    FileTooLarge {
        /// File name as selected
        name: String,
        /// File size in bytes
        size: u64,
        /// Configured maximum in bytes
        max: u64,
    },

    /// A file has an extension outside the allowed set
    #[error("{name} has an unsupported type (allowed: {allowed})")]
    UnsupportedExtension {
        /// File name as selected
        name: String,
        /// Comma separated list of allowed extensions
        allowed: String,
    },

    /// A zero-byte file
    #[error("{name} is empty")]
    EmptyFile {
        /// File name as selected
        name: String,
    },
}

/// Failure of a single gateway call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status}{}", suffix(.message))]
    Http {
        /// HTTP status code
        status: u16,
        /// `error` field of the response envelope, when one could be read
        message: Option<String>,
    },

    /// No response reached the client (connection failure or timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The response body was not a valid envelope
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The call was cancelled before it settled
    #[error("Request cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Returns true for [`GatewayError::Cancelled`]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }
}

/// Error returned by the client's entry points.
#[derive(Error, Debug)]
pub enum PortalError {
    /// The file selection violated one or more rules
    #[error("Invalid file selection: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    /// Transport failure
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The server answered but reported `success: false`
    #[error("Server error: {0}")]
    Domain(String),

    /// The operation needs an active session
    #[error("No active session")]
    NoSession,

    /// The question was empty after trimming
    #[error("Question is empty")]
    EmptyQuestion,

    /// Session recovery has not run yet
    #[error("Session recovery has not completed")]
    NotReady,

    /// The user declined a destructive action
    #[error("Action cancelled by user")]
    ConfirmationDeclined,

    /// Reading a selected file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PortalError {
    /// Returns true when the failure is an intentional cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PortalError::Gateway(GatewayError::Cancelled))
    }

    /// The message shown to the user for this failure.
    ///
    /// Server-supplied messages are passed through; transport details are not.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Validation(errors) => join_validation(errors),
            PortalError::Gateway(GatewayError::Http {
                message: Some(message),
                ..
            }) => message.clone(),
            PortalError::Gateway(GatewayError::Http { status, .. }) => {
                format!("The server rejected the request (HTTP {})", status)
            }
            PortalError::Gateway(GatewayError::Network(_)) => {
                "Could not reach the server. Please try again.".to_string()
            }
            PortalError::Gateway(GatewayError::Protocol(_)) => {
                "The server sent an unexpected response.".to_string()
            }
            PortalError::Gateway(GatewayError::Cancelled) => "Request cancelled".to_string(),
            PortalError::Domain(message) => message.clone(),
            PortalError::NoSession => "Please upload documents first.".to_string(),
            PortalError::EmptyQuestion => "Please enter a question.".to_string(),
            PortalError::NotReady => "Still restoring your session, please wait.".to_string(),
            PortalError::ConfirmationDeclined => "Nothing was cleared.".to_string(),
            PortalError::Io(e) => format!("Could not read file: {}", e),
            PortalError::Config(message) => message.clone(),
        }
    }
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for CLI and configuration code
///
/// The client core returns typed [`PortalError`]s; the outer layers use
/// `anyhow::Error` for rich context and easy propagation.
pub type Result<T> = anyhow::Result<T>;
