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
    models::{
        Attraction, City, CityDetail, CreateAttractionRequest, CreateCityRequest,
        UpdateCityRequest,
    },
    repository::CityQuery,
};

/// CityFilter
///
/// Query parameters for `GET /api/cities`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CityFilter {
    /// Case-insensitive match on name, country or region.
    pub search: Option<String>,
    pub country: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// list_cities
///
/// [Public Route] Browse destination cities, most popular first.
#[utoipa::path(
    get,
    path = "/api/cities",
    params(CityFilter),
    responses((status = 200, description = "Cities", body = [City]))
)]
pub async fn list_cities(
    State(state): State<AppState>,
    Query(filter): Query<CityFilter>,
) -> ApiResult<Json<Vec<City>>> {
    let cities = state
        .repo
        .list_cities(CityQuery {
            search: filter.search,
            country: filter.country,
            limit: page_limit(filter.limit, 50, 100),
            offset: page_offset(filter.offset),
        })
        .await?;
    Ok(Json(cities))
}

/// get_city
///
/// [Public Route] A city together with its attractions.
#[utoipa::path(
    get,
    path = "/api/cities/{id}",
    params(("id" = Uuid, Path, description = "City ID")),
    responses(
        (status = 200, description = "Found", body = CityDetail),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_city(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CityDetail>> {
    let city = state
        .repo
        .get_city(id)
        .await?
        .ok_or(ApiError::NotFound("City"))?;
    let attractions = state.repo.list_attractions(id).await?;
    Ok(Json(CityDetail { city, attractions }))
}

/// list_attractions
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/cities/{id}/attractions",
    params(("id" = Uuid, Path, description = "City ID")),
    responses((status = 200, description = "Attractions", body = [Attraction]))
)]
pub async fn list_attractions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Attraction>>> {
    if state.repo.get_city(id).await?.is_none() {
        return Err(ApiError::NotFound("City"));
    }
    Ok(Json(state.repo.list_attractions(id).await?))
}

/// create_city
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/admin/cities",
    request_body = CreateCityRequest,
    responses(
        (status = 201, description = "Created", body = City),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody)
    )
)]
pub async fn create_city(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCityRequest>,
) -> ApiResult<(StatusCode, Json<City>)> {
    user.require_admin()?;
    payload.validate()?;

    let city = state.repo.create_city(payload).await?;
    audit(
        &state,
        &user,
        "city.create",
        "city",
        Some(city.id.to_string()),
        json!({ "name": city.name, "country": city.country }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(city)))
}

/// update_city
///
/// [Admin Route] Partial update; omitted fields are unchanged.
#[utoipa::path(
    put,
    path = "/api/admin/cities/{id}",
    params(("id" = Uuid, Path, description = "City ID")),
    request_body = UpdateCityRequest,
    responses(
        (status = 200, description = "Updated", body = City),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_city(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCityRequest>,
) -> ApiResult<Json<City>> {
    user.require_admin()?;
    payload.validate()?;

    let changes = serde_json::to_value(&payload).unwrap_or_default();
    let city = state
        .repo
        .update_city(id, payload)
        .await?
        .ok_or(ApiError::NotFound("City"))?;
    audit(&state, &user, "city.update", "city", Some(id.to_string()), changes).await;

    Ok(Json(city))
}

/// delete_city
///
/// [Admin Route] Removes the city along with its attractions and any trip stops
/// visiting it.
#[utoipa::path(
    delete,
    path = "/api/admin/cities/{id}",
    params(("id" = Uuid, Path, description = "City ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_city(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;

    if !state.repo.delete_city(id).await? {
        return Err(ApiError::NotFound("City"));
    }
    audit(&state, &user, "city.delete", "city", Some(id.to_string()), json!({})).await;

    Ok(StatusCode::NO_CONTENT)
}

/// create_attraction
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/admin/cities/{id}/attractions",
    params(("id" = Uuid, Path, description = "City ID")),
    request_body = CreateAttractionRequest,
    responses((status = 201, description = "Created", body = Attraction))
)]
pub async fn create_attraction(
    user: AuthUser,
    State(state): State<AppState>,
    Path(city_id): Path<Uuid>,
    Json(payload): Json<CreateAttractionRequest>,
) -> ApiResult<(StatusCode, Json<Attraction>)> {
    user.require_admin()?;
    payload.validate()?;

    if state.repo.get_city(city_id).await?.is_none() {
        return Err(ApiError::NotFound("City"));
    }
    let attraction = state.repo.create_attraction(city_id, payload).await?;
    audit(
        &state,
        &user,
        "attraction.create",
        "attraction",
        Some(attraction.id.to_string()),
        json!({ "city_id": city_id, "name": attraction.name }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(attraction)))
}
