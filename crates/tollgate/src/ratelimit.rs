//! Per-client fixed-window rate limiting for the verify endpoint.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tollgate_common::VerifyResponse;

use crate::config::RateLimitConfig;
use crate::state::AppState;

/// Tracked clients before expired windows are swept
const PRUNE_AFTER: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Process-wide request counter keyed by client IP
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Count one request from `client`; false once it is over the limit
    pub fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if clients.len() >= PRUNE_AFTER {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }

    /// Number of clients currently tracked
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Peer address from the connection, if the server was started with it
pub fn client_ip(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Middleware: reject with 429 once a client exceeds its window budget
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    // Without connection info every caller shares one bucket
    let client = client_ip(&request).unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.rate_limiter.check(client) {
        tracing::warn!(client = %client, "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(VerifyResponse::rate_limited()),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
    }

    #[test]
    fn test_limit_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));

        // Other clients have their own budget
        assert!(limiter.check_at(ip(2), now));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at(ip(1), start));
        assert!(!limiter.check_at(ip(1), start + Duration::from_secs(59)));
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(60)));
    }

    #[test]
    fn test_expired_clients_are_pruned() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let start = Instant::now();

        for i in 0..PRUNE_AFTER {
            let addr = IpAddr::V6(std::net::Ipv6Addr::from(i as u128));
            assert!(limiter.check_at(addr, start));
        }
        assert_eq!(limiter.tracked(), PRUNE_AFTER);

        assert!(limiter.check_at(ip(1), start + Duration::from_secs(2)));
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn test_from_config() {
        let limiter = RateLimiter::from_config(&RateLimitConfig {
            max_requests: 2,
            window_secs: 900,
        });
        assert!(limiter.check(ip(9)));
        assert!(limiter.check(ip(9)));
        assert!(!limiter.check(ip(9)));
    }
}
