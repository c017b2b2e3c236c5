//! Typed errors for the remote collaborators and for field edits.
//!
//! - `RemoteError` is what every record-store and enrichment call fails with
//! - `FieldError` covers user input that does not name a valid field/value

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The service could not be reached, or the request timed out.
    Network,
    /// The service answered with a non-success status.
    HttpStatus(u16),
    /// The response body was not what we expected.
    Decode,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteErrorKind::Network => f.write_str("network error"),
            RemoteErrorKind::HttpStatus(code) => write!(f, "HTTP {}", code),
            RemoteErrorKind::Decode => f.write_str("malformed response"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub detail: String,
}

impl RemoteError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Network,
            detail: detail.into(),
        }
    }

    pub fn http_status(code: u16, detail: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::HttpStatus(code),
            detail: detail.into(),
        }
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Decode,
            detail: detail.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RemoteErrorKind::HttpStatus(404)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::decode(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::http_status(status.as_u16(), err.to_string())
        } else {
            // connect, timeout, request building, body I/O
            RemoteError::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::decode(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_detail() {
        let err = RemoteError::http_status(503, "service unavailable");
        assert_eq!(err.to_string(), "HTTP 503: service unavailable");

        let err = RemoteError::network("connection refused");
        assert_eq!(err.to_string(), "network error: connection refused");
    }

    #[test]
    fn test_is_not_found() {
        assert!(RemoteError::http_status(404, "").is_not_found());
        assert!(!RemoteError::http_status(500, "").is_not_found());
        assert!(!RemoteError::decode("bad json").is_not_found());
    }

    #[test]
    fn test_serde_error_maps_to_decode() {
        let err: RemoteError = serde_json::from_str::<Vec<i32>>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind, RemoteErrorKind::Decode);
    }
}
