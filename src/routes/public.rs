use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Trip data only leaves through
/// `/api/shared/trips/{id}`, which refuses trips that are not public.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/signup
        // Registers with the auth provider and creates the local user mirror.
        .route("/api/auth/signup", post(handlers::session::signup))
        // GET /api/cities?search=...&country=...
        .route("/api/cities", get(handlers::cities::list_cities))
        .route("/api/cities/{id}", get(handlers::cities::get_city))
        .route(
            "/api/cities/{id}/attractions",
            get(handlers::cities::list_attractions),
        )
        // GET /api/shared/trips/{id}
        // Read-only itinerary behind a share link.
        .route(
            "/api/shared/trips/{id}",
            get(handlers::trips::get_shared_trip),
        )
}
