use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod chart;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod storage;

// Routers split by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use error::ApiError;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{AuthProviderState, HttpAuthProvider, MockAuthProvider};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document built from every `#[utoipa::path]` handler and
/// `ToSchema` model. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::session::signup, handlers::session::get_me,
        handlers::users::get_preferences, handlers::users::update_preferences,
        handlers::users::list_saved_destinations, handlers::users::toggle_saved_destination,
        handlers::cities::list_cities, handlers::cities::get_city,
        handlers::cities::list_attractions, handlers::cities::create_city,
        handlers::cities::update_city, handlers::cities::delete_city,
        handlers::cities::create_attraction,
        handlers::trips::list_trips, handlers::trips::create_trip, handlers::trips::get_trip,
        handlers::trips::update_trip, handlers::trips::delete_trip,
        handlers::trips::replace_stops, handlers::trips::share_trip,
        handlers::trips::get_shared_trip,
        handlers::expenses::list_expenses, handlers::expenses::create_expense,
        handlers::expenses::delete_expense, handlers::expenses::get_budget,
        handlers::uploads::upload_file, handlers::uploads::get_presigned_url,
        handlers::admin::list_audit_logs, handlers::admin::list_roles,
        handlers::admin::create_role, handlers::admin::assign_role,
        handlers::admin::get_stats
    ),
    components(
        schemas(
            error::ErrorBody, chart::Bar, chart::BarChart,
            models::Role, models::User, models::UserProfile, models::SignupRequest,
            models::UserPreferences, models::UpdatePreferencesRequest,
            models::ToggleDestinationRequest, models::ToggleDestinationResponse,
            models::City, models::Attraction, models::CityDetail, models::CreateCityRequest,
            models::UpdateCityRequest, models::CreateAttractionRequest,
            models::Trip, models::CreateTripRequest, models::UpdateTripRequest,
            models::TripStop, models::Activity, models::ActivityInput, models::StopInput,
            models::ReplaceStopsRequest, models::StopDetail, models::TripItinerary,
            models::ShareTripRequest, models::ShareTripResponse,
            models::Expense, models::CreateExpenseRequest, models::CategoryTotal,
            models::BudgetSummary, models::AuditLog, models::CreateRoleRequest,
            models::AssignRoleRequest, models::AdminStats,
            models::PresignedUrlRequest, models::PresignedUrlResponse, models::UploadResponse,
        )
    ),
    tags(
        (name = "globetrotter", description = "GlobeTrotter travel planning API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for every service a handler may need.
/// Cloning is cheap: each service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: every read and write against Postgres (or the test fake).
    pub repo: RepositoryState,
    /// Storage Layer: S3/MinIO uploads and presigned PUT URLs.
    pub storage: StorageState,
    /// Identity Layer: the external provider that owns credentials; only signup calls it.
    pub auth_provider: AuthProviderState,
    /// Configuration: loaded once at startup, never mutated.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Handlers and extractors pull single services out of `AppState` through these;
// `AuthUser` only needs the repository and the config.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AuthProviderState {
    fn from_ref(app_state: &AppState) -> AuthProviderState {
        app_state.auth_provider.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated and admin routers.
///
/// *Mechanism*: the `AuthUser` argument runs the extractor (token or cookie,
/// JWT check, user lookup). When it fails the request is answered with a JSON
/// 401 and the handler never runs; otherwise the request passes through
/// untouched.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Builds the full application: public, authenticated and admin routers, the
/// JSON 404 fallback, the page gate, then the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS: the SPA is served from another origin.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Correlation header shared by the request-id layers and the span logger.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Routes
    let base_router = Router::new()
        // API docs: Swagger UI plus the raw OpenAPI JSON.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public: health, signup, city browsing, shared itineraries.
        .merge(public::public_routes())
        // Authenticated: everything under a user's own account.
        .merge(
            authenticated::authenticated_routes(state.config.max_upload_bytes).route_layer(
                middleware::from_fn_with_state(state.clone(), auth_middleware),
            ),
        )
        // Admin: same session check here (401); the admin check is inside each
        // handler (403).
        .nest(
            "/api/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Unknown paths answer in the same JSON error shape as the API.
        .fallback(|| async { ApiError::NotFound("Page") })
        // 3. Page gate: login/signup/protected/admin redirects. Layered after
        // the fallback so gated page paths redirect even without a route.
        .layer(middleware::from_fn_with_state(state.clone(), gate::gate))
        .with_state(state);

    // 4. Observability (outermost, so the gate's redirects are traced too)
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. A fresh UUID `x-request-id` for each request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. One span per request, tagged with that id; latency logged at INFO.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Echo the id back on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer`, tagged with the request id so every log line of a
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
