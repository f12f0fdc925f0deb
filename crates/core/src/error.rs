//! Error types for the Quiver client
//!
//! Every failure a caller can observe through a `Deferred` is one of the
//! variants below. Errors are `Clone` because a resolved deferred replays
//! the same error to every consumer, and serializable so SDK layers can
//! forward them unchanged.
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | `Transport` | connection refused, DNS, timeout (never retried) |
//! | `Status` | any HTTP status outside 200..=299 |
//! | `Configuration` | missing/invalid option, reset without `allow_reset` |
//! | `Protocol` | undecodable body, misaligned columns |
//! | `InvalidInput` | bad arguments rejected before any network call |
//! | `Internal` | producer panicked or dropped its resolver |

use serde::{Deserialize, Serialize};

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Client errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    /// Transport-level failure: the request never produced an HTTP response.
    #[error("transport error: {reason} ({context})")]
    Transport {
        /// Redacted description of the request
        context: String,
        /// What the transport reported
        reason: String,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP status {code}: {body} ({context})")]
    Status {
        /// HTTP status code
        code: u16,
        /// Response body, with secrets scrubbed
        body: String,
        /// Redacted description of the request
        context: String,
    },

    /// A required option is missing or invalid.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Which option and why
        reason: String,
    },

    /// The server response did not have the expected shape.
    #[error("protocol error: {reason}")]
    Protocol {
        /// What was malformed
        reason: String,
    },

    /// Caller-supplied arguments were rejected before any network call.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong
        reason: String,
    },

    /// Invariant violation inside the client (bug, panic, dropped producer).
    #[error("internal error: {reason}")]
    Internal {
        /// Details
        reason: String,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Error::Protocol {
            reason: reason.into(),
        }
    }

    /// Create an invalid-input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }

    /// HTTP status code, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether a caller-side retry has a reasonable chance of succeeding.
    ///
    /// The client itself never retries; this is a hint for callers that
    /// wrap operations in their own retry loop.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::Status { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Protocol {
            reason: e.to_string(),
        }
    }
}
