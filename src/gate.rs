//! Page gating: redirects browser page requests based on session state and path.
//!
//! API routes (`/api/...`) are not gated here; their handlers authorize through
//! the `AuthUser` extractor and answer with JSON errors instead of redirects.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{AppState, auth::resolve_session};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/dashboard";

/// Access
///
/// What a path prefix requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Only for signed-out visitors (login, signup).
    GuestOnly,
    /// Any signed-in user.
    Protected,
    /// Signed-in administrators.
    Admin,
}

/// Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    User,
    Admin,
}

/// GateDecision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Prefix table, evaluated top to bottom; first match wins.
pub const RULES: &[(&str, Access)] = &[
    ("/login", Access::GuestOnly),
    ("/signup", Access::GuestOnly),
    ("/admin", Access::Admin),
    ("/dashboard", Access::Protected),
    ("/trips", Access::Protected),
    ("/profile", Access::Protected),
    ("/saved", Access::Protected),
    ("/budget", Access::Protected),
];

/// Segment-aware prefix match: `/trips` matches `/trips` and `/trips/1`, not `/tripsx`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn rule_for(path: &str) -> Option<Access> {
    RULES
        .iter()
        .find(|(prefix, _)| matches_prefix(path, prefix))
        .map(|(_, access)| *access)
}

fn login_redirect(target: &str) -> GateDecision {
    GateDecision::Redirect(format!(
        "{LOGIN_PATH}?callbackUrl={}",
        urlencoding::encode(target)
    ))
}

/// decide
///
/// `target` is the path (plus query, if any) the visitor asked for; it becomes
/// the login callback so they land back on it after signing in.
pub fn decide(path: &str, target: &str, session: Session) -> GateDecision {
    let Some(access) = rule_for(path) else {
        return GateDecision::Allow;
    };

    match (access, session) {
        (Access::GuestOnly, Session::Anonymous) => GateDecision::Allow,
        (Access::GuestOnly, _) => GateDecision::Redirect(HOME_PATH.to_string()),
        (Access::Protected | Access::Admin, Session::Anonymous) => login_redirect(target),
        (Access::Admin, Session::User) => GateDecision::Redirect(HOME_PATH.to_string()),
        (Access::Protected, _) | (Access::Admin, Session::Admin) => GateDecision::Allow,
    }
}

/// gate
///
/// Middleware wrapping the whole router. Requests whose path matches no rule
/// pass straight through without a session lookup.
pub async fn gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if rule_for(&path).is_none() {
        return next.run(request).await;
    }

    let session = match resolve_session(request.headers(), &state.repo, &state.config).await {
        Ok(Some(user)) if user.is_admin() => Session::Admin,
        Ok(Some(_)) => Session::User,
        Ok(None) => Session::Anonymous,
        Err(e) => return e.into_response(),
    };

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    match decide(&path, &target, session) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(location) => {
            tracing::debug!(%path, %location, "gate redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}
