//! Routers split by access level. Each module builds a `Router<AppState>`;
//! `create_router` merges them and applies the authentication layer where needed.

/// Open to anonymous clients: health, signup, city browsing and shared trips.
pub mod public;

/// Requires a valid session; wrapped in `auth_middleware`.
pub mod authenticated;

/// Nested under `/api/admin`. Handlers additionally check the admin role.
pub mod admin;
