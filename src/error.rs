//! Error types for the coin market client

use std::fmt::Display;
use thiserror::Error;

/// Errors that can occur when fetching the coin list
///
/// The controller swallows these with respect to its callers; they are only
/// surfaced through logs, the published state and the event channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The endpoint could not be turned into a request target
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport failure or a status other than 200
    #[error("Bad response (status: {}): {message}", display_status(.status))]
    BadResponse {
        status: Option<u16>,
        message: String,
    },

    /// The body did not match the expected markets payload
    #[error("Decode error: {0}")]
    DecodeError(String),
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl FetchError {
    /// Creates a BadResponse error for an unexpected status code
    pub fn bad_status(status: u16) -> Self {
        Self::BadResponse {
            status: Some(status),
            message: format!("expected HTTP 200, got {}", status),
        }
    }

    /// Creates a BadResponse error for a failure with no status (transport level)
    pub fn transport(err: impl Display) -> Self {
        Self::BadResponse {
            status: None,
            message: err.to_string(),
        }
    }

    /// Creates a DecodeError
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Returns the observed HTTP status, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadResponse { status, .. } => *status,
            _ => None,
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::BadResponse { .. } => "bad_response",
            Self::DecodeError(_) => "decode_error",
        }
    }
}
