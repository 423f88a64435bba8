//! Shared constants for Tollgate components.

/// Google reCAPTCHA siteverify endpoint
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Minimum score accepted by the decision policy (inclusive)
pub const SCORE_THRESHOLD: f64 = 0.5;

/// Upper bound on a single upstream verification call (milliseconds)
pub const UPSTREAM_TIMEOUT_MS: u64 = 3000;

/// Largest siteverify body read before giving up (64 KiB)
pub const UPSTREAM_MAX_BODY_BYTES: usize = 64 * 1024;

/// Redirect handed to accepted clients when none is configured
pub const DEFAULT_REDIRECT_URL: &str = "/welcome";

/// Allow any origin
pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Requests allowed per client within one rate-limit window
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;

/// Rate-limit window length in seconds (15 minutes)
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 900;

/// Error codes returned in the `error` field of failure bodies
pub mod error_codes {
    pub const MISSING_TOKEN: &str = "missing_token";
    pub const MALFORMED_BODY: &str = "malformed_body";
    pub const SERVER_MISCONFIGURED: &str = "server_misconfigured";
    pub const VERIFICATION_UNAVAILABLE: &str = "verification_unavailable";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Form field names of the siteverify request
pub mod form_fields {
    pub const SECRET: &str = "secret";
    pub const RESPONSE: &str = "response";
    pub const REMOTE_IP: &str = "remoteip";
}
