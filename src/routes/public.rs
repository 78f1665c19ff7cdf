use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without an `Authorization` header.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /signup
        // Creates an account. Validation failures still answer 200 with success=false.
        .route("/signup", post(handlers::signup))
        // POST /signin
        // Issues a `JWT <token>` for valid credentials.
        .route("/signin", post(handlers::signin))
}
