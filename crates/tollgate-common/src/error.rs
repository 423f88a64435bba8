//! Error types for the token verification pipeline.

use std::fmt;
use thiserror::Error;

/// Failure category of a single upstream verification call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// No answer within the timeout bound
    Timeout,
    /// Connect/network failure, or a non-2xx status without a usable body
    Transport,
    /// 2xx status whose body is not a siteverify result
    ParseFailure,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::ParseFailure => "parse failure",
        };
        f.write_str(name)
    }
}

/// Error returned by the upstream verification client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upstream {kind}: {detail}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub detail: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Timeout, detail)
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Transport, detail)
    }

    pub fn parse_failure(detail: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::ParseFailure, detail)
    }
}

/// Errors that end a verify request before a policy decision is made.
///
/// Policy rejections are not errors; they are a normal [`crate::Decision`].
#[derive(Debug, Error)]
pub enum TollgateError {
    /// Client sent a request we cannot act on (missing token, bad body)
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] crate::types::InvalidReason),

    /// Operator left required configuration empty
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream verification call failed
    #[error(transparent)]
    Upstream(#[from] ClientError),
}

impl TollgateError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Config(_) => 500,
            Self::Upstream(_) => 500,
        }
    }

    /// Returns true if the same request could succeed when retried later.
    /// Tollgate itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upstream(ClientError {
                kind: ClientErrorKind::Timeout | ClientErrorKind::Transport,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvalidReason;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TollgateError::InvalidInput(InvalidReason::MissingToken).status_code(),
            400
        );
        assert_eq!(TollgateError::Config("no secret".into()).status_code(), 500);
        assert_eq!(
            TollgateError::from(ClientError::timeout("3000ms")).status_code(),
            500
        );
    }

    #[test]
    fn test_retryable() {
        assert!(TollgateError::from(ClientError::timeout("slow")).is_retryable());
        assert!(TollgateError::from(ClientError::transport("refused")).is_retryable());
        assert!(!TollgateError::from(ClientError::parse_failure("html")).is_retryable());
        assert!(!TollgateError::Config("no secret".into()).is_retryable());
    }

    #[test]
    fn test_client_error_display() {
        let err = ClientError::parse_failure("expected value at line 1");
        assert_eq!(
            err.to_string(),
            "upstream parse failure: expected value at line 1"
        );
    }
}
