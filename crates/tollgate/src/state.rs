//! Application state and shared resources.

use anyhow::Result;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::policy::ScorePolicy;
use crate::ratelimit::RateLimiter;
use crate::upstream::SiteVerifyClient;

/// Shared application state.
///
/// Everything except the rate limiter is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Siteverify client (fixed timeout, no retries)
    pub verifier: Arc<SiteVerifyClient>,

    /// Score threshold policy
    pub policy: Arc<ScorePolicy>,

    /// Per-client request counter
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Create application state with a client for the configured endpoint
    pub fn new(config: AppConfig) -> Result<Self> {
        let verifier = SiteVerifyClient::new(config.verify_url.clone())?;
        Ok(Self::with_verifier(config, verifier))
    }

    /// Create application state around an existing client
    pub fn with_verifier(config: AppConfig, verifier: SiteVerifyClient) -> Self {
        let policy = Arc::new(ScorePolicy::from_config(&config));
        let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

        tracing::debug!(
            endpoint = %verifier.endpoint(),
            timeout_ms = verifier.timeout().as_millis() as u64,
            threshold = policy.threshold(),
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window_secs,
            "Verification pipeline ready"
        );

        Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            policy,
            rate_limiter,
        }
    }
}
