//! HTTP route handlers for Tollgate.

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ratelimit;
use crate::state::AppState;

mod health;
mod verify;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origin);

    // Only the verify endpoint spends upstream quota, so only it is limited
    let verify_routes = Router::new()
        .route("/verify-token", post(verify::verify_token))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::enforce,
        ));

    Router::new()
        // Health & Status
        .route("/", get(health::root))
        .route("/health", get(health::health_check))

        // Token verification
        .merge(verify_routes)

        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for browser callers; `*` allows any origin.
///
/// A specific origin is only echoed back to requests from that origin.
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let allowed_origin = allowed_origin.trim();
    if allowed_origin.is_empty() || allowed_origin == "*" {
        return cors.allow_origin(Any);
    }

    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => cors.allow_origin(AllowOrigin::list([origin])),
        Err(_) => {
            tracing::warn!(origin = %allowed_origin, "Invalid allowed origin, cross-origin requests disabled");
            cors
        }
    }
}
