//! Request handlers, grouped by area. Every handler returns `ApiResult`, so
//! failures render as `{"error": ...}` JSON with the matching status code.

pub mod admin;
pub mod cities;
pub mod expenses;
pub mod session;
pub mod trips;
pub mod uploads;
pub mod users;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{NewAuditEntry, Trip},
};

/// Clamps a client-supplied page size into `1..=max`, defaulting to `default`.
pub(crate) fn page_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

pub(crate) fn page_offset(requested: Option<i64>) -> i64 {
    requested.unwrap_or(0).max(0)
}

/// Loads a trip and checks the caller owns it: 404 when missing, 403 otherwise.
pub(crate) async fn owned_trip(state: &AppState, user: &AuthUser, trip_id: Uuid) -> ApiResult<Trip> {
    let trip = state
        .repo
        .get_trip(trip_id)
        .await?
        .ok_or(ApiError::NotFound("Trip"))?;
    user.require_owner(&trip)?;
    Ok(trip)
}

/// Writes an audit record for an admin action. A failed write is logged but
/// does not undo or fail the action itself.
pub(crate) async fn audit(
    state: &AppState,
    actor: &AuthUser,
    action: &'static str,
    entity_type: &'static str,
    entity_id: Option<String>,
    details: Value,
) {
    let entry = NewAuditEntry {
        actor_id: actor.id,
        action,
        entity_type,
        entity_id,
        details,
    };
    if let Err(e) = state.repo.record_audit(entry).await {
        tracing::error!(error = %e, action, entity_type, "failed to record audit log");
    }
}
