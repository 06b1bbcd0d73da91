use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// IdentityError
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider refused the account (duplicate email, weak password...).
    #[error("signup rejected by auth provider: {0}")]
    Rejected(String),

    /// The provider could not be reached or failed on its side (5xx).
    #[error("auth provider unreachable: {0}")]
    Transport(String),
}

/// AuthProvider
///
/// The external service that owns credentials and issues session tokens.
/// This application only asks it to create accounts; it never sees stored
/// passwords.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Registers `email`/`password` and returns the provider's user id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, IdentityError>;
}

/// AuthProviderState
pub type AuthProviderState = Arc<dyn AuthProvider>;

#[derive(Deserialize)]
struct SignupResponse {
    id: Uuid,
}

/// HttpAuthProvider
///
/// Talks to a GoTrue-compatible `/auth/v1/signup` endpoint.
pub struct HttpAuthProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpAuthProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        let url = format!("{}/auth/v1/signup", self.base_url);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            tracing::error!(%status, "auth provider failed during signup");
            return Err(IdentityError::Transport(format!("provider returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "auth provider rejected signup");
            return Err(IdentityError::Rejected(body));
        }

        let created = response
            .json::<SignupResponse>()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        Ok(created.id)
    }
}

/// MockAuthProvider
///
/// Test double. Issues fresh ids and rejects emails it has already seen.
#[derive(Clone, Default)]
pub struct MockAuthProvider {
    pub unreachable: bool,
    registered: Arc<Mutex<Vec<String>>>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<Uuid, IdentityError> {
        if self.unreachable {
            return Err(IdentityError::Transport("connection refused".to_string()));
        }
        let mut registered = self
            .registered
            .lock()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        let email = email.to_lowercase();
        if registered.contains(&email) {
            return Err(IdentityError::Rejected("User already registered".to_string()));
        }
        registered.push(email);
        Ok(Uuid::new_v4())
    }
}
