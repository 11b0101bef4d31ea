use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. The navigation endpoint is public on purpose:
/// anonymous transitions are exactly what the global guard has to redirect.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /navigate
        // Resolves a client-side transition: Proceed, Redirect or Abort, plus notifications.
        .route("/navigate", post(handlers::navigate))
        // GET /routes
        // The route table in matching order, with auth metadata and static props.
        .route("/routes", get(handlers::get_routes))
}
