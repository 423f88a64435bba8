//! Token verification endpoint.

use axum::{
    Json,
    extract::{FromRequest, Request, State},
    http::StatusCode,
};
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tollgate_common::{
    Decision, InvalidReason, TollgateError, VerificationRequest, VerificationResult,
    VerifyResponse,
};

use crate::ratelimit::client_ip;
use crate::state::AppState;

/// Verify a client token against siteverify
///
/// Returns:
/// - 200: Token accepted, body carries the redirect
/// - 400: Token missing or body unreadable
/// - 403: Provider refused the token, or score below threshold
/// - 500: Secret not configured, or the upstream call failed
pub async fn verify_token(
    State(state): State<AppState>,
    request: Request,
) -> (StatusCode, Json<VerifyResponse>) {
    let started = Instant::now();
    let request_id = generate_request_id();
    let remote_ip = client_ip(&request);

    let payload = Json::<VerificationRequest>::from_request(request, &())
        .await
        .map(|Json(payload)| payload)
        .map_err(|rejection| {
            tracing::debug!(request_id = %request_id, error = %rejection, "Unreadable verify body");
            InvalidReason::MalformedBody
        });

    let fingerprint = payload
        .as_ref()
        .ok()
        .and_then(VerificationRequest::token)
        .map(token_fingerprint);

    let outcome = Outcome::settle(process(&state, payload, remote_ip).await);

    log_outcome(&request_id, fingerprint.as_deref(), &outcome, started.elapsed());

    let body = VerifyResponse::from_decision(
        &outcome.decision,
        state.config.expose_error_detail(),
    );

    (outcome.status, Json(body))
}

/// A finished request, ready to be logged and answered
struct Outcome {
    decision: Decision,
    status: StatusCode,
    /// Provider error codes, empty unless siteverify answered
    error_codes: Vec<String>,
    /// Set only when the request ended in a [`TollgateError`]
    retryable: Option<bool>,
}

impl Outcome {
    fn settle(processed: Result<(Decision, VerificationResult), TollgateError>) -> Self {
        match processed {
            Ok((decision, result)) => Self {
                status: status_from(decision.status_code()),
                decision,
                error_codes: result.error_codes,
                retryable: None,
            },
            Err(err) => {
                let status = status_from(err.status_code());
                let retryable = err.is_retryable();
                let decision = Decision::from(err);
                debug_assert_eq!(status.as_u16(), decision.status_code());

                Self {
                    decision,
                    status,
                    error_codes: Vec::new(),
                    retryable: Some(retryable),
                }
            }
        }
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Validate, call upstream once, decide.
///
/// Validation failures return before any outbound call is made.
async fn process(
    state: &AppState,
    payload: Result<VerificationRequest, InvalidReason>,
    remote_ip: Option<IpAddr>,
) -> Result<(Decision, VerificationResult), TollgateError> {
    let payload = payload?;
    let token = payload.token().ok_or(InvalidReason::MissingToken)?;

    if !state.config.has_secret() {
        return Err(TollgateError::Config(
            "SECRET_KEY is not configured".to_string(),
        ));
    }

    let result = state
        .verifier
        .verify(token, &state.config.secret_key, remote_ip)
        .await?;

    Ok((state.policy.decide(&result), result))
}

/// One line per request. Rejections are business outcomes, not errors.
fn log_outcome(request_id: &str, fingerprint: Option<&str>, outcome: &Outcome, elapsed: Duration) {
    let decision = &outcome.decision;
    let status = outcome.status.as_u16();
    let elapsed_ms = elapsed.as_millis() as u64;

    match decision {
        Decision::Accepted { score, .. } => tracing::info!(
            request_id = %request_id,
            token = ?fingerprint,
            verdict = decision.label(),
            status,
            score,
            elapsed_ms,
            "Token accepted"
        ),
        Decision::Rejected { reason, score } => tracing::info!(
            request_id = %request_id,
            token = ?fingerprint,
            verdict = decision.label(),
            status,
            reason = ?reason,
            score = ?score,
            error_codes = ?outcome.error_codes,
            elapsed_ms,
            "Token rejected"
        ),
        Decision::Invalid { reason } => tracing::warn!(
            request_id = %request_id,
            verdict = decision.label(),
            status,
            reason = reason.code(),
            retryable = ?outcome.retryable,
            elapsed_ms,
            "Invalid verify request"
        ),
        Decision::UpstreamError { failure, detail } => tracing::error!(
            request_id = %request_id,
            token = ?fingerprint,
            verdict = decision.label(),
            status,
            failure = ?failure,
            detail = %detail,
            retryable = ?outcome.retryable,
            elapsed_ms,
            "Token verification failed"
        ),
    }
}

/// Short, non-reversible token identifier for log correlation
fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Random per-request identifier
fn generate_request_id() -> String {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use rand::Rng;

    let mut bytes = [0u8; 12];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
