use axum::{Json, extract::State};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{
        City, ToggleDestinationRequest, ToggleDestinationResponse, UpdatePreferencesRequest,
        UserPreferences,
    },
};

/// toggle_destination
///
/// Removes `city_id` from `saved` if present, otherwise appends it. Returns
/// whether the city is saved afterwards.
pub fn toggle_destination(saved: &mut Vec<Uuid>, city_id: Uuid) -> bool {
    if let Some(index) = saved.iter().position(|id| *id == city_id) {
        saved.remove(index);
        false
    } else {
        saved.push(city_id);
        true
    }
}

/// get_preferences
///
/// [Authenticated Route] Stored preferences, or the defaults when the user has
/// never saved any.
#[utoipa::path(
    get,
    path = "/api/user/preferences",
    responses((status = 200, description = "Preferences", body = UserPreferences))
)]
pub async fn get_preferences(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<UserPreferences>> {
    let preferences = state
        .repo
        .get_preferences(user.id)
        .await?
        .unwrap_or_else(|| UserPreferences::defaults_for(user.id));
    Ok(Json(preferences))
}

/// update_preferences
///
/// [Authenticated Route]
#[utoipa::path(
    put,
    path = "/api/user/preferences",
    request_body = UpdatePreferencesRequest,
    responses(
        (status = 200, description = "Saved", body = UserPreferences),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody)
    )
)]
pub async fn update_preferences(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> ApiResult<Json<UserPreferences>> {
    payload.validate()?;
    Ok(Json(state.repo.upsert_preferences(user.id, payload).await?))
}

/// list_saved_destinations
///
/// [Authenticated Route] Saved cities in the order they were saved. Ids whose
/// city has since been deleted are skipped.
#[utoipa::path(
    get,
    path = "/api/user/saved-destinations",
    responses((status = 200, description = "Saved cities", body = [City]))
)]
pub async fn list_saved_destinations(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<City>>> {
    let ids = state.repo.get_saved_destinations(user.id).await?;
    if ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let mut by_id: HashMap<Uuid, City> = state
        .repo
        .get_cities_by_ids(&ids)
        .await?
        .into_iter()
        .map(|city| (city.id, city))
        .collect();

    let cities = ids.iter().filter_map(|id| by_id.remove(id)).collect();
    Ok(Json(cities))
}

/// toggle_saved_destination
///
/// [Authenticated Route] Saves the city if it is not saved yet, unsaves it otherwise.
/// Unknown cities can only be unsaved.
#[utoipa::path(
    post,
    path = "/api/user/saved-destinations",
    request_body = ToggleDestinationRequest,
    responses(
        (status = 200, description = "Toggled", body = ToggleDestinationResponse),
        (status = 404, description = "Unknown city", body = crate::error::ErrorBody)
    )
)]
pub async fn toggle_saved_destination(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ToggleDestinationRequest>,
) -> ApiResult<Json<ToggleDestinationResponse>> {
    let mut city_ids = state.repo.get_saved_destinations(user.id).await?;

    // Only adding needs a live city; a stale id must stay removable.
    if !city_ids.contains(&payload.city_id)
        && state.repo.get_city(payload.city_id).await?.is_none()
    {
        return Err(ApiError::NotFound("City"));
    }

    let saved = toggle_destination(&mut city_ids, payload.city_id);
    state.repo.set_saved_destinations(user.id, &city_ids).await?;

    tracing::debug!(user_id = %user.id, city_id = %payload.city_id, saved, "saved destination toggled");
    Ok(Json(ToggleDestinationResponse { saved, city_ids }))
}
