//! Explicit session context and the login call that populates it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use shared::{
    domain::SessionUser,
    error::ApiError,
    protocol::{LoginRequest, LoginResponse},
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::AuthError;

const GENERIC_AUTH_FAILURE: &str = "invalid email or password";

#[derive(Debug, Clone)]
pub struct Session {
    pub user: SessionUser,
    pub authenticated_at: DateTime<Utc>,
}

/// Shared handle to the signed-in user. Clones observe the same session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self, user: SessionUser) {
        let mut guard = self.inner.write().await;
        *guard = Some(Session {
            user,
            authenticated_at: Utc::now(),
        });
    }

    pub async fn end(&self) {
        let previous = self.inner.write().await.take();
        if let Some(session) = previous {
            info!(user_id = %session.user.id, "session ended");
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<SessionUser> {
        self.inner.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.is_some()
    }
}

pub struct AuthClient {
    http: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn authenticate(
        &self,
        session: &SessionContext,
        email: &str,
        password: &str,
    ) -> Result<SessionUser, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let response = self
            .http
            .post(format!("{}/api/login", self.base_url))
            .json(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|err| err.message)
                .ok()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| GENERIC_AUTH_FAILURE.to_string());
            warn!(status = status.as_u16(), "login rejected");
            return Err(AuthError::Rejected(message));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|_| AuthError::Rejected(GENERIC_AUTH_FAILURE.to_string()))?;
        info!(user_id = %body.user.id, "login succeeded");
        session.begin(body.user.clone()).await;
        Ok(body.user)
    }

    pub async fn logout(&self, session: &SessionContext) {
        session.end().await;
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
