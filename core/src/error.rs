//! Error types for the lembaas API client.
//!
//! # Design
//! Every failed call is classified exactly once and handed back to the
//! caller. `NotFound` is a specialization of `UnexpectedStatus` reserved for
//! lookup-by-identifier routes, so callers can run existence checks without
//! matching on raw status codes. `Api` covers responses whose status matched
//! but whose body still carries an error message.

use thiserror::Error;

/// Failures raised by a `Transport` before a complete response was read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// The caller's deadline passed before the request could be sent.
    #[error("deadline exceeded before the request was sent")]
    DeadlineExceeded,

    /// DNS, connect or protocol failure.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Coarse classification of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Transport,
    Serialization,
    Decode,
    UnexpectedStatus,
    NotFound,
    Api,
}

/// Errors returned by `RestClient` and the resource clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid client configuration, or an authenticated call without a token.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Decode(String),

    /// The server returned 404 for a lookup by identifier.
    #[error("resource not found{}", detail(.body_error))]
    NotFound { body_error: Option<String> },

    /// The server returned a status the route does not accept.
    #[error("expected status {expected}, got {actual}{}", detail(.body_error))]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        body_error: Option<String>,
    },

    /// The status matched but the body carried a non-empty error message.
    #[error("api error: {message}")]
    Api { message: String },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Config(_) => ErrorKind::Config,
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Serialization(_) => ErrorKind::Serialization,
            ApiError::Decode(_) => ErrorKind::Decode,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            ApiError::Api { .. } => ErrorKind::Api,
        }
    }

    /// HTTP status behind a status-classified error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Error text the server embedded in the response body, if any.
    pub fn body_error(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { body_error } | ApiError::UnexpectedStatus { body_error, .. } => {
                body_error.as_deref()
            }
            ApiError::Api { message } => Some(message),
            _ => None,
        }
    }
}

fn detail(body_error: &Option<String>) -> String {
    match body_error {
        Some(text) => format!(" ({text})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_display_includes_body_error() {
        let err = ApiError::UnexpectedStatus {
            expected: 201,
            actual: 409,
            body_error: Some("email already registered".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "expected status 201, got 409 (email already registered)"
        );
    }

    #[test]
    fn unexpected_status_display_without_body_error() {
        let err = ApiError::UnexpectedStatus {
            expected: 204,
            actual: 500,
            body_error: None,
        };
        assert_eq!(err.to_string(), "expected status 204, got 500");
    }

    #[test]
    fn not_found_is_distinguishable_from_other_statuses() {
        let not_found = ApiError::NotFound { body_error: None };
        let server_error = ApiError::UnexpectedStatus {
            expected: 200,
            actual: 500,
            body_error: None,
        };
        assert!(not_found.is_not_found());
        assert!(!server_error.is_not_found());
        assert_eq!(not_found.status(), Some(404));
        assert_eq!(server_error.status(), Some(500));
        assert_ne!(not_found.kind(), server_error.kind());
    }

    #[test]
    fn transport_error_converts_with_question_mark() {
        fn fails() -> Result<(), ApiError> {
            Err(TransportError::Timeout)?
        }
        let err = fails().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.to_string(), "transport error: request timed out");
    }

    #[test]
    fn body_error_exposes_embedded_text() {
        let err = ApiError::Api {
            message: "role is in use".to_string(),
        };
        assert_eq!(err.body_error(), Some("role is in use"));
        assert_eq!(ApiError::Config("x".into()).body_error(), None);
    }
}
