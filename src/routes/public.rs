use axum::{Router, routing::get};

use crate::AppState;

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// Every piece of workflow data in this application is permission-gated
/// against a document, so the anonymous surface is deliberately tiny.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
}
