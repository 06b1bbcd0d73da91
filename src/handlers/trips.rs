use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::owned_trip;
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{
        Activity, CreateTripRequest, ReplaceStopsRequest, ShareTripRequest, ShareTripResponse,
        StopDetail, Trip, TripItinerary, TripStop, UpdateTripRequest,
    },
};

/// assemble_itinerary
///
/// Groups `activities` under their stops, keeping the stop order given.
/// Activities whose stop is not in `stops` are dropped.
pub fn assemble_itinerary(trip: Trip, stops: Vec<TripStop>, activities: Vec<Activity>) -> TripItinerary {
    let mut by_stop: HashMap<Uuid, Vec<Activity>> = HashMap::new();
    for activity in activities {
        by_stop.entry(activity.stop_id).or_default().push(activity);
    }

    let stops = stops
        .into_iter()
        .map(|stop| StopDetail {
            activities: by_stop.remove(&stop.id).unwrap_or_default(),
            stop,
        })
        .collect();

    TripItinerary { trip, stops }
}

async fn load_itinerary(state: &AppState, trip: Trip) -> ApiResult<TripItinerary> {
    let stops = state.repo.get_trip_stops(trip.id).await?;
    let activities = state.repo.get_trip_activities(trip.id).await?;
    Ok(assemble_itinerary(trip, stops, activities))
}

/// list_trips
///
/// [Authenticated Route] The caller's trips, newest first.
#[utoipa::path(
    get,
    path = "/api/trips",
    responses((status = 200, description = "My trips", body = [Trip]))
)]
pub async fn list_trips(user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Trip>>> {
    Ok(Json(state.repo.list_trips(user.id).await?))
}

/// create_trip
///
/// [Authenticated Route] New trips are private until shared.
#[utoipa::path(
    post,
    path = "/api/trips",
    request_body = CreateTripRequest,
    responses(
        (status = 201, description = "Created", body = Trip),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody)
    )
)]
pub async fn create_trip(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTripRequest>,
) -> ApiResult<(StatusCode, Json<Trip>)> {
    payload.validate()?;
    let trip = state.repo.create_trip(user.id, payload).await?;
    tracing::info!(trip_id = %trip.id, user_id = %user.id, "trip created");
    Ok((StatusCode::CREATED, Json(trip)))
}

/// get_trip
///
/// [Authenticated Route] Full itinerary of one of the caller's trips.
#[utoipa::path(
    get,
    path = "/api/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Itinerary", body = TripItinerary),
        (status = 403, description = "Not Owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_trip(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TripItinerary>> {
    let trip = owned_trip(&state, &user, id).await?;
    Ok(Json(load_itinerary(&state, trip).await?))
}

/// update_trip
///
/// [Authenticated Route] Partial update, owner only.
#[utoipa::path(
    put,
    path = "/api/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = UpdateTripRequest,
    responses((status = 200, description = "Updated", body = Trip))
)]
pub async fn update_trip(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTripRequest>,
) -> ApiResult<Json<Trip>> {
    payload.validate()?;
    let trip = owned_trip(&state, &user, id).await?;
    payload.check_against(&trip).map_err(|e| {
        ApiError::BadRequest(
            e.message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "invalid dates".to_string()),
        )
    })?;

    let updated = state
        .repo
        .update_trip(id, user.id, payload)
        .await?
        .ok_or(ApiError::NotFound("Trip"))?;
    Ok(Json(updated))
}

/// delete_trip
///
/// [Authenticated Route] Owner only. Stops, activities and expenses go with it.
#[utoipa::path(
    delete,
    path = "/api/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_trip(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    owned_trip(&state, &user, id).await?;
    if state.repo.delete_trip(id, user.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Trip"))
    }
}

/// replace_stops
///
/// [Authenticated Route] Replaces every stop of the trip, and the activities
/// under them, with the request body. List order becomes stop order.
#[utoipa::path(
    put,
    path = "/api/trips/{id}/stops",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = ReplaceStopsRequest,
    responses(
        (status = 200, description = "Saved itinerary", body = TripItinerary),
        (status = 400, description = "Invalid stops", body = crate::error::ErrorBody),
        (status = 403, description = "Not Owner", body = crate::error::ErrorBody)
    )
)]
pub async fn replace_stops(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceStopsRequest>,
) -> ApiResult<Json<TripItinerary>> {
    payload.validate()?;
    owned_trip(&state, &user, id).await?;

    let stop_count = payload.stops.len();
    state.repo.replace_trip_stops(id, payload.stops).await?;
    tracing::info!(trip_id = %id, stops = stop_count, "trip stops replaced");

    // Re-read: the replacement bumps `updated_at`.
    let trip = state
        .repo
        .get_trip(id)
        .await?
        .ok_or(ApiError::NotFound("Trip"))?;
    Ok(Json(load_itinerary(&state, trip).await?))
}

/// share_trip
///
/// [Authenticated Route] Turns public sharing on or off and returns the link.
#[utoipa::path(
    post,
    path = "/api/trips/{id}/share",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = ShareTripRequest,
    responses((status = 200, description = "Sharing updated", body = ShareTripResponse))
)]
pub async fn share_trip(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShareTripRequest>,
) -> ApiResult<Json<ShareTripResponse>> {
    owned_trip(&state, &user, id).await?;

    let trip = state
        .repo
        .set_trip_public(id, payload.is_public)
        .await?
        .ok_or(ApiError::NotFound("Trip"))?;

    let share_url = trip.is_public.then(|| {
        format!(
            "{}/share/{}",
            state.config.public_base_url.trim_end_matches('/'),
            trip.id
        )
    });
    Ok(Json(ShareTripResponse {
        is_public: trip.is_public,
        share_url,
    }))
}

/// get_shared_trip
///
/// [Public Route] Read-only itinerary of a shared trip. Private trips answer
/// 404 so their existence is not revealed.
#[utoipa::path(
    get,
    path = "/api/shared/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Itinerary", body = TripItinerary),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_shared_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TripItinerary>> {
    let trip = state
        .repo
        .get_trip(id)
        .await?
        .filter(|trip| trip.is_public)
        .ok_or(ApiError::NotFound("Trip"))?;
    Ok(Json(load_itinerary(&state, trip).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(trip_id: Uuid, position: i32) -> TripStop {
        TripStop {
            id: Uuid::new_v4(),
            trip_id,
            position,
            ..TripStop::default()
        }
    }

    fn activity(stop_id: Uuid, name: &str) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            stop_id,
            name: name.to_string(),
            ..Activity::default()
        }
    }

    #[test]
    fn activities_are_grouped_under_their_stop() {
        let trip = Trip::default();
        let first = stop(trip.id, 0);
        let second = stop(trip.id, 1);
        let activities = vec![
            activity(second.id, "Louvre"),
            activity(first.id, "Sagrada Familia"),
            activity(second.id, "Seine cruise"),
        ];

        let itinerary = assemble_itinerary(trip, vec![first.clone(), second.clone()], activities);

        assert_eq!(itinerary.stops.len(), 2);
        assert_eq!(itinerary.stops[0].stop.id, first.id);
        assert_eq!(itinerary.stops[0].activities.len(), 1);
        let names: Vec<&str> = itinerary.stops[1]
            .activities
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["Louvre", "Seine cruise"]);
    }

    #[test]
    fn stops_without_activities_get_an_empty_list() {
        let trip = Trip::default();
        let only = stop(trip.id, 0);
        let itinerary = assemble_itinerary(trip, vec![only], vec![]);
        assert!(itinerary.stops[0].activities.is_empty());
    }
}
