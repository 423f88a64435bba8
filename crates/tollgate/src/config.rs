//! Configuration management for Tollgate.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use tollgate_common::constants::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RATE_LIMIT_MAX_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_REDIRECT_URL, DEFAULT_VERIFY_URL,
};

/// Deployment environment; controls how much failure detail callers see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Shared secret for the siteverify API (empty = not configured)
    #[serde(default)]
    pub secret_key: String,

    /// Where accepted clients are sent
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,

    /// CORS origin, `*` for any
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// Siteverify endpoint
    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

// Default value functions
fn default_redirect_url() -> String { DEFAULT_REDIRECT_URL.to_string() }
fn default_allowed_origin() -> String { DEFAULT_ALLOWED_ORIGIN.to_string() }
fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
fn default_verify_url() -> String { DEFAULT_VERIFY_URL.to_string() }
fn default_max_requests() -> u32 { DEFAULT_RATE_LIMIT_MAX_REQUESTS }
fn default_window_secs() -> u64 { DEFAULT_RATE_LIMIT_WINDOW_SECS } // 15 minutes

impl AppConfig {
    /// Load configuration from file, with CLI/env overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::debug!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(args);
        Ok(config)
    }

    fn apply_overrides(&mut self, args: &super::Args) {
        if let Some(ref secret_key) = args.secret_key {
            self.secret_key = secret_key.clone();
        }
        if let Some(ref redirect_url) = args.redirect_url {
            self.redirect_url = redirect_url.clone();
        }
        if let Some(ref allowed_origin) = args.allowed_origin {
            self.allowed_origin = allowed_origin.clone();
        }
        if let Some(ref host) = args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(environment) = args.environment {
            self.environment = environment;
        }
        if let Some(ref verify_url) = args.verify_url {
            self.verify_url = verify_url.clone();
        }
    }

    /// `host:port` for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn has_secret(&self) -> bool {
        !self.secret_key.trim().is_empty()
    }

    /// Whether failure details may be returned to callers
    pub fn expose_error_detail(&self) -> bool {
        self.environment != Environment::Production
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            redirect_url: default_redirect_url(),
            allowed_origin: default_allowed_origin(),
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            verify_url: default_verify_url(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
