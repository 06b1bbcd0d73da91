use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::chart::BarChart;

// --- Identity & Access ---

/// Role
///
/// A named permission group from the `roles` table. The `admin` role grants access
/// to city management, role management and the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// User
///
/// Local mirror of an account held by the external auth provider. The primary key
/// is the provider's user id. `role_name` is filled by a join on `roles`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role_id: Option<Uuid>,
    #[sqlx(default)]
    pub role_name: Option<String>,
    // Grants admin rights independently of the role.
    pub is_admin: bool,
    // Saved destination city ids, in the order they were saved.
    pub saved_destinations: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserProfile
///
/// Output schema for `GET /api/me`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub is_admin: bool,
}

/// SignupRequest
///
/// Input for `POST /api/auth/signup`. The password is forwarded to the auth
/// provider and never stored or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct SignupRequest {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
}

/// UserPreferences
///
/// One row per user in `user_preferences`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct UserPreferences {
    pub id: Uuid,
    pub user_id: Uuid,
    pub currency: String,
    pub language: String,
    pub notifications_enabled: bool,
    pub theme: String,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// Preferences reported for a user who has never saved any.
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            id: Uuid::nil(),
            user_id,
            currency: "USD".to_string(),
            language: "en".to_string(),
            notifications_enabled: true,
            theme: "system".to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// UpdatePreferencesRequest
///
/// Partial update; absent fields keep their stored (or default) value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdatePreferencesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 10, message = "language must be 2-10 characters"))]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_theme"))]
    pub theme: Option<String>,
}

fn validate_theme(theme: &str) -> Result<(), ValidationError> {
    match theme {
        "light" | "dark" | "system" => Ok(()),
        _ => Err(ValidationError::new("theme")
            .with_message("theme must be light, dark or system".into())),
    }
}

/// ToggleDestinationRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ToggleDestinationRequest {
    pub city_id: Uuid,
}

/// ToggleDestinationResponse
///
/// `saved` reports the state of `city_id` after the toggle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ToggleDestinationResponse {
    pub saved: bool,
    pub city_ids: Vec<Uuid>,
}

// --- Destinations ---

/// City
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    // Relative cost of living, 0 = cheapest.
    pub cost_index: Option<f64>,
    pub popularity: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Attraction
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Attraction {
    pub id: Uuid,
    pub city_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub estimated_cost: f64,
    pub duration_minutes: i32,
}

/// CityDetail
///
/// Output of `GET /api/cities/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CityDetail {
    pub city: City,
    pub attractions: Vec<Attraction>,
}

/// CreateCityRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCityRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "country must be 1-100 characters"))]
    pub country: String,
    pub region: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[validate(range(min = 0.0, message = "cost_index must not be negative"))]
    pub cost_index: Option<f64>,
    #[validate(range(min = 0, message = "popularity must not be negative"))]
    pub popularity: Option<i32>,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude out of range"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude out of range"))]
    pub longitude: Option<f64>,
}

/// UpdateCityRequest
///
/// Partial update for `PUT /api/admin/cities/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCityRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "country must be 1-100 characters"))]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "cost_index must not be negative"))]
    pub cost_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "popularity must not be negative"))]
    pub popularity: Option<i32>,
}

/// CreateAttractionRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateAttractionRequest {
    #[validate(length(min = 1, max = 150, message = "name must be 1-150 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50, message = "category is required"))]
    pub category: String,
    #[validate(range(min = 0.0, message = "estimated_cost must not be negative"))]
    pub estimated_cost: f64,
    #[validate(range(min = 0, message = "duration_minutes must not be negative"))]
    pub duration_minutes: i32,
}

// --- Trips ---

/// Trip
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Trip {
    pub id: Uuid,
    // Owner.
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cover_image: Option<String>,
    pub budget: Option<f64>,
    // Public trips are readable through the share link.
    pub is_public: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

fn check_date_order(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::new("date_range")
            .with_message("end_date must not be before start_date".into()));
    }
    Ok(())
}

/// CreateTripRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
#[validate(schema(function = "validate_trip_dates"))]
pub struct CreateTripRequest {
    #[validate(length(min = 1, max = 150, message = "name must be 1-150 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cover_image: Option<String>,
    #[validate(range(min = 0.0, message = "budget must not be negative"))]
    pub budget: Option<f64>,
}

fn validate_trip_dates(req: &CreateTripRequest) -> Result<(), ValidationError> {
    check_date_order(req.start_date, req.end_date)
}

/// UpdateTripRequest
///
/// Partial update. Date order is checked against the stored trip by the handler.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateTripRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 150, message = "name must be 1-150 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "budget must not be negative"))]
    pub budget: Option<f64>,
}

impl UpdateTripRequest {
    /// Checks that the dates resulting from applying this update to `trip` are ordered.
    pub fn check_against(&self, trip: &Trip) -> Result<(), ValidationError> {
        check_date_order(
            self.start_date.unwrap_or(trip.start_date),
            self.end_date.unwrap_or(trip.end_date),
        )
    }
}

/// TripStop
///
/// A city visit within a trip, bounded by start/end dates. `position` orders the
/// stops inside the itinerary.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TripStop {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub city_id: Uuid,
    pub position: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    // Joined from `cities`.
    #[sqlx(default)]
    pub city_name: Option<String>,
}

/// Activity
///
/// A planned action within a stop: an attraction visit or a custom entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Activity {
    pub id: Uuid,
    pub stop_id: Uuid,
    pub attraction_id: Option<Uuid>,
    pub name: String,
    pub cost: f64,
    pub duration_minutes: i32,
    pub scheduled_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// ActivityInput
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct ActivityInput {
    pub attraction_id: Option<Uuid>,
    #[validate(length(min = 1, max = 150, message = "activity name must be 1-150 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "activity cost must not be negative"))]
    pub cost: f64,
    #[serde(default)]
    #[validate(range(min = 0, message = "activity duration must not be negative"))]
    pub duration_minutes: i32,
    pub scheduled_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// StopInput
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
#[validate(schema(function = "validate_stop_dates"))]
pub struct StopInput {
    pub city_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub activities: Vec<ActivityInput>,
}

fn validate_stop_dates(stop: &StopInput) -> Result<(), ValidationError> {
    check_date_order(stop.start_date, stop.end_date)
}

/// ReplaceStopsRequest
///
/// Body of `PUT /api/trips/{id}/stops`. The list fully replaces the trip's stops;
/// list order becomes stop order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct ReplaceStopsRequest {
    #[validate(nested)]
    pub stops: Vec<StopInput>,
}

/// StopDetail
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StopDetail {
    pub stop: TripStop,
    pub activities: Vec<Activity>,
}

/// TripItinerary
///
/// A trip with its ordered stops and their activities.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TripItinerary {
    pub trip: Trip,
    pub stops: Vec<StopDetail>,
}

/// ShareTripRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ShareTripRequest {
    pub is_public: bool,
}

/// ShareTripResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ShareTripResponse {
    pub is_public: bool,
    // Absent when sharing was turned off.
    pub share_url: Option<String>,
}

// --- Expenses ---

/// Expense
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Expense {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub category: String,
    pub amount: f64,
    pub currency: String,
    pub description: Option<String>,
    pub incurred_on: NaiveDate,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// CreateExpenseRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, max = 50, message = "category is required"))]
    pub category: String,
    #[validate(range(min = 0.0, message = "amount must not be negative"))]
    pub amount: f64,
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub currency: String,
    pub description: Option<String>,
    pub incurred_on: NaiveDate,
}

/// CategoryTotal
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// BudgetSummary
///
/// Output of `GET /api/trips/{id}/budget`: spending per category and the bar chart
/// that renders it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BudgetSummary {
    pub trip_id: Uuid,
    pub budget: Option<f64>,
    pub total_spent: f64,
    // Sum of the planned activity costs across all stops.
    pub planned_activity_cost: f64,
    // `budget - total_spent`, when the trip has a budget.
    pub remaining: Option<f64>,
    pub categories: Vec<CategoryTotal>,
    pub chart: BarChart,
}

// --- Administration ---

/// AuditLog
///
/// A record of an administrative action: who did what to which entity.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Uuid,
    #[sqlx(default)]
    pub actor_email: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// NewAuditEntry
///
/// Internal insert payload for the audit log.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_id: Uuid,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub details: serde_json::Value,
}

/// CreateRoleRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 50, message = "role name must be 1-50 characters"))]
    pub name: String,
    pub description: Option<String>,
}

/// AssignRoleRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
}

/// AdminStats
///
/// Output of `GET /api/admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_trips: i64,
    pub total_cities: i64,
    pub public_trips: i64,
    pub total_expenses: f64,
}

// --- Uploads ---

/// PresignedUrlRequest
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "lisbon.jpg")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to store on the trip or city record.
    pub resource_key: String,
}

/// UploadResponse
///
/// Output of the direct multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
    pub size: usize,
}
