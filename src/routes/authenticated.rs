use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Request body cap for `/api/upload`: the file limit plus multipart framing.
pub fn upload_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(MULTIPART_OVERHEAD)
}

/// Authenticated Router Module
///
/// Everything a signed-in traveller does: profile, preferences, saved
/// destinations, trips and their itineraries, expenses and uploads.
///
/// The router is wrapped in `auth_middleware` by `create_router`, and each
/// handler also takes `AuthUser`, which it uses for ownership checks on trips.
pub fn authenticated_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::<AppState>::new()
        // --- Profile ---
        .route("/api/me", get(handlers::session::get_me))
        .route(
            "/api/user/preferences",
            get(handlers::users::get_preferences).put(handlers::users::update_preferences),
        )
        // POST toggles the city in or out of the saved list.
        .route(
            "/api/user/saved-destinations",
            get(handlers::users::list_saved_destinations)
                .post(handlers::users::toggle_saved_destination),
        )
        // --- Trips ---
        .route(
            "/api/trips",
            get(handlers::trips::list_trips).post(handlers::trips::create_trip),
        )
        .route(
            "/api/trips/{id}",
            get(handlers::trips::get_trip)
                .put(handlers::trips::update_trip)
                .delete(handlers::trips::delete_trip),
        )
        // PUT /api/trips/{id}/stops
        // Replaces the whole itinerary in one transaction.
        .route("/api/trips/{id}/stops", put(handlers::trips::replace_stops))
        .route("/api/trips/{id}/share", post(handlers::trips::share_trip))
        // --- Budget ---
        .route(
            "/api/trips/{id}/expenses",
            get(handlers::expenses::list_expenses).post(handlers::expenses::create_expense),
        )
        .route(
            "/api/trips/{id}/expenses/{expense_id}",
            delete(handlers::expenses::delete_expense),
        )
        .route("/api/trips/{id}/budget", get(handlers::expenses::get_budget))
        // --- Media ---
        .route(
            "/api/upload",
            post(handlers::uploads::upload_file)
                .layer(DefaultBodyLimit::max(upload_body_limit(max_upload_bytes))),
        )
        // POST /api/upload/presigned
        // Short-lived PUT URL so large files bypass the server.
        .route(
            "/api/upload/presigned",
            post(handlers::uploads::get_presigned_url),
        )
}
