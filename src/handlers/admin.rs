use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::{audit, page_limit, page_offset};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{AdminStats, AssignRoleRequest, AuditLog, CreateRoleRequest, Role, User},
    repository::AuditQuery,
};

/// AuditFilter
///
/// Query parameters for `GET /api/admin/audit-logs`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AuditFilter {
    /// Exact action name, e.g. `city.create`.
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// list_audit_logs
///
/// [Admin Route] Newest entries first.
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(AuditFilter),
    responses(
        (status = 200, description = "Audit log", body = [AuditLog]),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody)
    )
)]
pub async fn list_audit_logs(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AuditFilter>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    user.require_admin()?;

    let logs = state
        .repo
        .list_audit_logs(AuditQuery {
            action: filter.action,
            entity_type: filter.entity_type,
            limit: page_limit(filter.limit, 50, 200),
            offset: page_offset(filter.offset),
        })
        .await?;
    Ok(Json(logs))
}

/// list_roles
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/api/admin/roles",
    responses((status = 200, description = "Roles", body = [Role]))
)]
pub async fn list_roles(user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Role>>> {
    user.require_admin()?;
    Ok(Json(state.repo.list_roles().await?))
}

/// create_role
///
/// [Admin Route] Role names are unique; a duplicate answers 400.
#[utoipa::path(
    post,
    path = "/api/admin/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Created", body = Role),
        (status = 400, description = "Invalid or duplicate", body = crate::error::ErrorBody)
    )
)]
pub async fn create_role(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    user.require_admin()?;
    payload.validate()?;

    let role = state.repo.create_role(payload).await?;
    audit(
        &state,
        &user,
        "role.create",
        "role",
        Some(role.id.to_string()),
        json!({ "name": role.name }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(role)))
}

/// assign_role
///
/// [Admin Route] Puts a user in a role. Takes effect on the user's next request.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 404, description = "Unknown user or role", body = crate::error::ErrorBody)
    )
)]
pub async fn assign_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<Json<User>> {
    user.require_admin()?;

    let role = state
        .repo
        .get_role(payload.role_id)
        .await?
        .ok_or(ApiError::NotFound("Role"))?;
    let updated = state
        .repo
        .assign_role(user_id, role.id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    audit(
        &state,
        &user,
        "user.role_assign",
        "user",
        Some(user_id.to_string()),
        json!({ "role_id": role.id, "role": role.name }),
    )
    .await;

    Ok(Json(updated))
}

/// get_stats
///
/// [Admin Route] Platform-wide counts for the admin dashboard.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses((status = 200, description = "Stats", body = AdminStats))
)]
pub async fn get_stats(user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<AdminStats>> {
    user.require_admin()?;
    Ok(Json(state.repo.get_stats().await?))
}
