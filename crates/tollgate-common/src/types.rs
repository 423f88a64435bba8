//! Core types shared across Tollgate components.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::constants::error_codes;
use crate::error::{ClientError, ClientErrorKind, TollgateError};

/// Body of `POST /verify-token`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Opaque client-supplied token; `null` and absent are both "missing"
    #[serde(default)]
    pub token: Option<String>,
}

impl VerificationRequest {
    /// The token, if one was actually supplied (non-blank)
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Parsed siteverify answer.
///
/// Produced once per request and owned by the handler for the duration
/// of the call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,

    /// Confidence in [0, 1]. Missing, `null` or non-numeric values are `None`.
    #[serde(
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,

    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_ts: Option<String>,
}

impl VerificationResult {
    pub fn passed(score: f64) -> Self {
        Self {
            success: true,
            score: Some(score),
            ..Default::default()
        }
    }

    pub fn failed(error_codes: Vec<String>) -> Self {
        Self {
            success: false,
            error_codes,
            ..Default::default()
        }
    }
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|s| s.is_finite()))
}

/// Why the policy refused a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Provider answered `success: false`
    VerificationFailed,
    /// Provider answered `success: true` without a comparable score
    MissingScore,
    /// Score below the threshold
    LowScore,
}

/// Why the request itself was unusable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidReason {
    #[error("token is missing or empty")]
    MissingToken,
    #[error("request body is not valid JSON")]
    MalformedBody,
}

impl InvalidReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => error_codes::MISSING_TOKEN,
            Self::MalformedBody => error_codes::MALFORMED_BODY,
        }
    }
}

/// What went wrong when no decision could be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Secret key not configured; upstream never called
    Misconfigured,
    Timeout,
    Transport,
    ParseFailure,
}

impl FailureKind {
    /// Generic code shown to callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::Misconfigured => error_codes::SERVER_MISCONFIGURED,
            Self::Timeout | Self::Transport | Self::ParseFailure => {
                error_codes::VERIFICATION_UNAVAILABLE
            }
        }
    }
}

impl From<ClientErrorKind> for FailureKind {
    fn from(kind: ClientErrorKind) -> Self {
        match kind {
            ClientErrorKind::Timeout => Self::Timeout,
            ClientErrorKind::Transport => Self::Transport,
            ClientErrorKind::ParseFailure => Self::ParseFailure,
        }
    }
}

/// Final verdict for one request. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Accepted {
        score: f64,
        redirect: String,
    },
    Rejected {
        reason: RejectReason,
        score: Option<f64>,
    },
    Invalid {
        reason: InvalidReason,
    },
    UpstreamError {
        failure: FailureKind,
        detail: String,
    },
}

impl Decision {
    /// Returns the HTTP status code for this decision
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Accepted { .. } => 200,
            Self::Invalid { .. } => 400,
            Self::Rejected { .. } => 403,
            Self::UpstreamError { .. } => 500,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Invalid { .. } => "invalid",
            Self::UpstreamError { .. } => "upstream_error",
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Accepted { score, .. } => Some(*score),
            Self::Rejected { score, .. } => *score,
            Self::Invalid { .. } | Self::UpstreamError { .. } => None,
        }
    }
}

impl From<ClientError> for Decision {
    fn from(err: ClientError) -> Self {
        Self::UpstreamError {
            failure: err.kind.into(),
            detail: err.detail,
        }
    }
}

impl From<TollgateError> for Decision {
    fn from(err: TollgateError) -> Self {
        match err {
            TollgateError::InvalidInput(reason) => Self::Invalid { reason },
            TollgateError::Config(detail) => Self::UpstreamError {
                failure: FailureKind::Misconfigured,
                detail,
            },
            TollgateError::Upstream(err) => err.into(),
        }
    }
}

/// JSON body returned by `POST /verify-token`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VerifyResponse {
    /// Build the caller-facing body. `expose_detail` is false in production,
    /// where upstream/config failure details stay in the server log.
    pub fn from_decision(decision: &Decision, expose_detail: bool) -> Self {
        let mut body = Self {
            success: decision.is_accepted(),
            redirect: None,
            score: decision.score(),
            reason: None,
            error: None,
            detail: None,
        };

        match decision {
            Decision::Accepted { redirect, .. } => body.redirect = Some(redirect.clone()),
            Decision::Rejected { reason, .. } => body.reason = Some(*reason),
            Decision::Invalid { reason } => body.error = Some(reason.code().to_string()),
            Decision::UpstreamError { failure, detail } => {
                body.error = Some(failure.code().to_string());
                if expose_detail {
                    body.detail = Some(detail.clone());
                }
            }
        }

        body
    }

    /// Body for requests refused by the rate limiter
    pub fn rate_limited() -> Self {
        Self {
            success: false,
            redirect: None,
            score: None,
            reason: None,
            error: Some(error_codes::RATE_LIMITED.to_string()),
            detail: None,
        }
    }
}
