use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    identity::IdentityError,
    models::{SignupRequest, UpdatePreferencesRequest, User, UserProfile},
    repository::NewUser,
};

/// Role assigned to every self-service signup.
const DEFAULT_ROLE: &str = "user";

/// signup
///
/// [Public Route] Creates an account with the external auth provider, then the
/// local user mirror (same id) and its default preferences row.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input or rejected by provider", body = crate::error::ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    if state.repo.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest("Email is already registered".to_string()));
    }

    let user_id = state
        .auth_provider
        .sign_up(&email, &payload.password)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected(_) => {
                ApiError::BadRequest("Signup was rejected by the auth provider".to_string())
            }
            IdentityError::Transport(detail) => ApiError::Internal(detail),
        })?;

    let user = state
        .repo
        .create_user(NewUser {
            id: user_id,
            email,
            name: Some(payload.name.trim().to_string()),
            role_name: DEFAULT_ROLE.to_string(),
        })
        .await?;

    state
        .repo
        .upsert_preferences(user.id, UpdatePreferencesRequest::default())
        .await?;

    tracing::info!(user_id = %user.id, "user signed up");
    Ok((StatusCode::CREATED, Json(user)))
}

/// get_me
///
/// [Authenticated Route] The caller's profile.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<UserProfile>> {
    let stored = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(UserProfile {
        id: stored.id,
        email: stored.email,
        name: stored.name,
        is_admin: user.is_admin(),
        role: user.role,
    }))
}
