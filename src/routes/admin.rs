use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// City catalogue management, roles, the audit log and dashboard stats.
/// Nested under `/api/admin` behind `auth_middleware`; every handler checks
/// the admin role itself and answers 403 otherwise. Mutations are audit logged.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats
        .route("/stats", get(handlers::admin::get_stats))
        // GET /api/admin/audit-logs?action=...&entity_type=...
        .route("/audit-logs", get(handlers::admin::list_audit_logs))
        .route(
            "/roles",
            get(handlers::admin::list_roles).post(handlers::admin::create_role),
        )
        .route("/users/{id}/role", put(handlers::admin::assign_role))
        // --- Cities ---
        .route("/cities", post(handlers::cities::create_city))
        .route(
            "/cities/{id}",
            put(handlers::cities::update_city).delete(handlers::cities::delete_city),
        )
        .route(
            "/cities/{id}/attractions",
            post(handlers::cities::create_attraction),
        )
}
