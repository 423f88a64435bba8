//! Siteverify HTTP client.

use anyhow::{Context, Result};
use std::net::IpAddr;
use std::time::Duration;

use tollgate_common::constants::{form_fields, UPSTREAM_MAX_BODY_BYTES, UPSTREAM_TIMEOUT_MS};
use tollgate_common::{ClientError, VerificationResult};

/// Client for one siteverify-compatible endpoint
pub struct SiteVerifyClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl SiteVerifyClient {
    /// Client with the fixed upstream timeout
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_millis(UPSTREAM_TIMEOUT_MS))
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build siteverify HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the provider about `token`, exactly once.
    ///
    /// Callers must reject empty tokens and secrets before calling.
    pub async fn verify(
        &self,
        token: &str,
        secret: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<VerificationResult, ClientError> {
        let mut form = vec![
            (form_fields::SECRET, secret.to_string()),
            (form_fields::RESPONSE, token.to_string()),
        ];
        if let Some(ip) = remote_ip {
            form.push((form_fields::REMOTE_IP, ip.to_string()));
        }

        let mut response = self
            .http
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let oversized = || {
            let detail = format!("siteverify body exceeds {UPSTREAM_MAX_BODY_BYTES} bytes");
            if status.is_success() {
                ClientError::parse_failure(detail)
            } else {
                ClientError::transport(detail)
            }
        };

        if response
            .content_length()
            .is_some_and(|len| len > UPSTREAM_MAX_BODY_BYTES as u64)
        {
            return Err(oversized());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            if body.len() + chunk.len() > UPSTREAM_MAX_BODY_BYTES {
                return Err(oversized());
            }
            body.extend_from_slice(&chunk);
        }

        match serde_json::from_slice::<VerificationResult>(&body) {
            Ok(result) => {
                if !status.is_success() {
                    tracing::warn!(%status, "Siteverify answered with non-2xx status but a usable body");
                }
                Ok(result)
            }
            Err(e) if status.is_success() => Err(ClientError::parse_failure(format!(
                "unreadable siteverify body: {e}"
            ))),
            Err(_) => Err(ClientError::transport(format!(
                "siteverify returned {status}"
            ))),
        }
    }

    fn classify(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::timeout(format!(
                "no answer from siteverify within {} ms",
                self.timeout.as_millis()
            ))
        } else if err.is_decode() {
            ClientError::parse_failure(err.to_string())
        } else {
            ClientError::transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Form, Router, http::StatusCode, routing::post};
    use std::collections::HashMap;
    use std::time::Instant;
    use tollgate_common::ClientErrorKind;

    /// Start a mock siteverify endpoint and return its URL
    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{port}/siteverify")
    }

    #[tokio::test]
    async fn test_sends_form_fields_and_parses_result() {
        let app = Router::new().route(
            "/siteverify",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                assert_eq!(form.get("secret").map(String::as_str), Some("s3cret"));
                assert_eq!(form.get("response").map(String::as_str), Some("valid123"));
                assert_eq!(form.get("remoteip").map(String::as_str), Some("203.0.113.7"));
                axum::Json(serde_json::json!({
                    "success": true,
                    "score": 0.9,
                    "action": "login",
                    "hostname": "example.com"
                }))
            }),
        );
        let client = SiteVerifyClient::new(spawn_upstream(app).await).unwrap();

        let result = client
            .verify("valid123", "s3cret", Some("203.0.113.7".parse().unwrap()))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.score, Some(0.9));
        assert_eq!(result.action.as_deref(), Some("login"));
    }

    #[tokio::test]
    async fn test_remote_ip_is_optional() {
        let app = Router::new().route(
            "/siteverify",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                assert!(!form.contains_key("remoteip"));
                axum::Json(serde_json::json!({ "success": true, "score": 0.7 }))
            }),
        );
        let client = SiteVerifyClient::new(spawn_upstream(app).await).unwrap();

        let result = client.verify("tok", "s3cret", None).await.unwrap();
        assert_eq!(result.score, Some(0.7));
    }

    #[tokio::test]
    async fn test_success_false_is_a_result_not_an_error() {
        let app = Router::new().route(
            "/siteverify",
            post(|| async {
                axum::Json(serde_json::json!({
                    "success": false,
                    "error-codes": ["invalid-input-response"]
                }))
            }),
        );
        let client = SiteVerifyClient::new(spawn_upstream(app).await).unwrap();

        let result = client.verify("bad", "s3cret", None).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_codes, vec!["invalid-input-response"]);
    }

    #[tokio::test]
    async fn test_non_2xx_without_body_is_transport_error() {
        let app = Router::new().route(
            "/siteverify",
            post(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
        );
        let client = SiteVerifyClient::new(spawn_upstream(app).await).unwrap();

        let err = client.verify("tok", "s3cret", None).await.unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Transport);
        assert!(err.detail.contains("502"));
    }

    #[tokio::test]
    async fn test_non_2xx_with_parseable_body_is_a_result() {
        let app = Router::new().route(
            "/siteverify",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    axum::Json(serde_json::json!({
                        "success": false,
                        "error-codes": ["bad-request"]
                    })),
                )
            }),
        );
        let client = SiteVerifyClient::new(spawn_upstream(app).await).unwrap();

        let result = client.verify("tok", "s3cret", None).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_garbage_2xx_body_is_parse_failure() {
        let app = Router::new().route("/siteverify", post(|| async { "definitely not json" }));
        let client = SiteVerifyClient::new(spawn_upstream(app).await).unwrap();

        let err = client.verify("tok", "s3cret", None).await.unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::ParseFailure);
    }

    #[tokio::test]
    async fn test_oversized_body_is_refused() {
        let app = Router::new().route(
            "/siteverify",
            post(|| async { "x".repeat(UPSTREAM_MAX_BODY_BYTES + 1) }),
        );
        let client = SiteVerifyClient::new(spawn_upstream(app).await).unwrap();

        let err = client.verify("tok", "s3cret", None).await.unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::ParseFailure);
        assert!(err.detail.contains("exceeds"));
    }

    #[tokio::test]
    async fn test_oversized_error_page_is_transport_error() {
        let app = Router::new().route(
            "/siteverify",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "x".repeat(UPSTREAM_MAX_BODY_BYTES * 2),
                )
            }),
        );
        let client = SiteVerifyClient::new(spawn_upstream(app).await).unwrap();

        let err = client.verify("tok", "s3cret", None).await.unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Transport);
        assert!(err.detail.contains("exceeds"));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let app = Router::new().route(
            "/siteverify",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                axum::Json(serde_json::json!({ "success": true, "score": 0.9 }))
            }),
        );
        let client =
            SiteVerifyClient::with_timeout(spawn_upstream(app).await, Duration::from_millis(200))
                .unwrap();

        let started = Instant::now();
        let err = client.verify("tok", "s3cret", None).await.unwrap_err();

        assert_eq!(err.kind, ClientErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = SiteVerifyClient::new(format!("http://127.0.0.1:{port}/siteverify")).unwrap();
        let err = client.verify("tok", "s3cret", None).await.unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Transport);
    }

    #[test]
    fn test_default_timeout_is_fixed() {
        let client = SiteVerifyClient::new("http://127.0.0.1:1/siteverify").unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(3000));
        assert_eq!(client.endpoint(), "http://127.0.0.1:1/siteverify");
    }
}
