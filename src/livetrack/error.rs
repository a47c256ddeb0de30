//! LiveTrack error types

use thiserror::Error;

/// Errors that can occur when talking to LiveTrack
#[derive(Error, Debug)]
pub enum LiveTrackError {
    /// Transport-level failure (DNS, TLS, connection reset, ...)
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status from the upstream endpoint
    #[error("{operation} failed with status {status}")]
    Status { operation: &'static str, status: u16 },

    /// GraphQL error payload
    #[error("{operation} returned errors: {}", .messages.join("; "))]
    GraphQl {
        operation: &'static str,
        messages: Vec<String>,
    },

    /// Session lookup succeeded but returned no session
    #[error("Session not found or invalid")]
    SessionNotFound,

    /// URL is not a LiveTrack link
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// Short link resolved to something that is not a session URL
    #[error("Failed to expand {url}: {reason}")]
    Expansion { url: String, reason: String },
}

impl LiveTrackError {
    /// Whether the upstream answered but rejected the query
    pub fn is_upstream_rejection(&self) -> bool {
        matches!(
            self,
            LiveTrackError::GraphQl { .. } | LiveTrackError::SessionNotFound
        )
    }
}

pub type LiveTrackResult<T> = Result<T, LiveTrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LiveTrackError::GraphQl {
            operation: "getSession",
            messages: vec!["bad token".to_string(), "expired".to_string()],
        };
        assert_eq!(err.to_string(), "getSession returned errors: bad token; expired");
        assert!(err.is_upstream_rejection());

        let err = LiveTrackError::Status {
            operation: "getTrackPoints",
            status: 503,
        };
        assert_eq!(err.to_string(), "getTrackPoints failed with status 503");
        assert!(!err.is_upstream_rejection());
    }
}
