//! Error types for the client engine.
//!
//! Failures never escape a public store or channel operation: request
//! failures become a per-session message string, persistence failures are
//! swallowed, and transport failures surface only as connectivity state.
//! These enums exist for the internal seams where a typed error is still
//! useful (the conversation API client and the state store).

use thiserror::Error;

/// Fixed message recorded when sending without an active conversation.
pub const NO_ACTIVE_CONVERSATION: &str = "No active conversation";

/// Fallback message when a request failure carries no useful text.
pub const GENERIC_REQUEST_FAILURE: &str = "Request failed";

/// Conversation API failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// Request never reached the server.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The user-facing string the session store records.
    ///
    /// Always non-empty; falls back to [`GENERIC_REQUEST_FAILURE`].
    #[must_use]
    pub fn message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            GENERIC_REQUEST_FAILURE.to_owned()
        } else {
            text
        }
    }
}

/// State persistence failure. Always swallowed at the store boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem read/write failed.
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted record did not parse.
    #[error("state parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message() {
        let err = ApiError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.message(), "server returned 502: bad gateway");
    }

    #[test]
    fn transport_error_message() {
        let err = ApiError::Transport("connection refused".into());
        assert!(err.message().contains("connection refused"));
    }

    #[test]
    fn storage_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StorageError::from(io);
        assert!(err.to_string().contains("denied"));
    }
}
