//! Error types for the management API client.

use thiserror::Error;

/// Errors raised by [`super::ApiClient`] and its transports.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// Raised when the service answers with a non-success status.
    #[error("request to {url} failed with HTTP {status}: {body}")]
    Remote {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// Raised when the request never produced a response.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Message reported by the HTTP stack.
        message: String,
    },
    /// Raised when a response body does not match the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Parser error message.
        message: String,
    },
}

impl ApiError {
    /// Returns the HTTP status for [`Self::Remote`] errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }
}
