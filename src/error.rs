use reqwest::StatusCode;
use thiserror::Error;

use crate::exit_codes::VinfraExitCode;

/// Error types raised by the client core
///
/// Every failure the core can produce falls into one of these variants. The
/// binary translates them once, at the top, into a single-line message and a
/// process exit code.
#[derive(Debug, Error)]
pub enum VinfraError {
    /// The portal answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: StatusCode, message: String },

    /// The portal could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Missing credential input, empty password or rejected login
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Malformed user input
    #[error("{0}")]
    Validation(String),

    /// Resource not found, ambiguous reference and similar business failures
    #[error("{0}")]
    Command(String),

    /// A backend task finished in the error state
    #[error("{0}")]
    TaskFailed(String),

    /// An operation or a wait exceeded its allotted time
    #[error("{0}")]
    Timeout(String),

    /// Local failure: filesystem, serialization, client construction
    #[error("{0}")]
    Client(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("Broken pipe")]
    BrokenPipe,
}

impl VinfraError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> VinfraExitCode {
        match self {
            VinfraError::Http { .. } => VinfraExitCode::HttpError,
            VinfraError::Authentication(_) => VinfraExitCode::HttpError,
            VinfraError::Client(_) => VinfraExitCode::HttpError,
            VinfraError::Validation(_) => VinfraExitCode::CommandError,
            VinfraError::Command(_) => VinfraExitCode::CommandError,
            VinfraError::TaskFailed(_) => VinfraExitCode::CommandError,
            VinfraError::Connection(_) => VinfraExitCode::ConnectionError,
            VinfraError::Timeout(_) => VinfraExitCode::TimeoutError,
            VinfraError::Interrupted => VinfraExitCode::Interrupted,
            VinfraError::BrokenPipe => VinfraExitCode::BrokenPipe,
        }
    }

    /// Message shown to the user on the error stream
    pub fn user_message(&self) -> String {
        match self {
            VinfraError::TaskFailed(detail) => format!("Command failed: {}", detail),
            VinfraError::Timeout(message) => format!(
                "{}. Re-run the command with a longer --timeout value to wait more.",
                message
            ),
            other => other.to_string(),
        }
    }

    /// Whether this is an HTTP error carrying the given status
    pub fn is_status(&self, expected: StatusCode) -> bool {
        matches!(self, VinfraError::Http { status, .. } if *status == expected)
    }

    pub(crate) fn http(status: StatusCode, body: &str) -> Self {
        VinfraError::Http {
            status,
            message: extract_error_message(status, body),
        }
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Pull a human readable message out of an error response body.
///
/// The portal usually answers with `{"error": "..."}` or `{"message": "..."}`.
/// Anything else is shown raw, truncated.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message", "detail", "details"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }
}

impl From<reqwest::Error> for VinfraError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            VinfraError::Timeout(format!("Request timed out: {}", error))
        } else if error.is_connect() {
            VinfraError::Connection(error.to_string())
        } else if let Some(status) = error.status() {
            VinfraError::Http {
                status,
                message: error.to_string(),
            }
        } else {
            VinfraError::Client(error.to_string())
        }
    }
}

impl From<std::io::Error> for VinfraError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::BrokenPipe {
            VinfraError::BrokenPipe
        } else {
            VinfraError::Client(error.to_string())
        }
    }
}

impl From<serde_json::Error> for VinfraError {
    fn from(error: serde_json::Error) -> Self {
        VinfraError::Client(format!("JSON error: {}", error))
    }
}

impl From<serde_yaml::Error> for VinfraError {
    fn from(error: serde_yaml::Error) -> Self {
        VinfraError::Client(format!("YAML error: {}", error))
    }
}

impl From<url::ParseError> for VinfraError {
    fn from(error: url::ParseError) -> Self {
        VinfraError::Validation(format!("Invalid URL: {}", error))
    }
}

pub type Result<T, E = VinfraError> = std::result::Result<T, E>;
