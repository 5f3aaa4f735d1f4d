use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::{AppError, Result};

/// Source of the bearer token attached to every backend call.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn access_token(&self) -> Option<String>;

    /// Obtain a fresh access token after the backend rejected the current one.
    async fn refresh(&self) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// Session holding an access token and, optionally, a refresh token that
/// is exchanged at `POST {base_url}/auth/refresh`.
pub struct TokenSession {
    tokens: RwLock<Tokens>,
    client: reqwest::Client,
    refresh_url: String,
}

impl TokenSession {
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            tokens: RwLock::new(Tokens {
                access: access_token,
                refresh: refresh_token,
            }),
            client: reqwest::Client::new(),
            refresh_url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
        }
    }

    pub fn anonymous(base_url: &str) -> Self {
        Self::new(base_url, None, None)
    }
}

#[async_trait]
impl SessionProvider for TokenSession {
    async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access.clone()
    }

    async fn refresh(&self) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        let refresh_token = tokens.refresh.clone().ok_or(AppError::Unauthorized)?;

        let response = self
            .client
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            error!(status = %response.status(), "Failed to refresh token");
            return Err(AppError::Unauthorized);
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse refresh response: {}", e)))?;

        tokens.access = Some(refreshed.access_token);
        tokens.refresh = Some(refreshed.refresh_token);
        info!("Session tokens refreshed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_without_refresh_token_is_unauthorized() {
        let session = TokenSession::new("http://localhost:1", Some("abc".into()), None);
        assert_eq!(session.access_token().await.as_deref(), Some("abc"));
        assert!(matches!(session.refresh().await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_anonymous_session_has_no_token() {
        let session = TokenSession::anonymous("http://localhost:1/");
        assert!(session.access_token().await.is_none());
        assert_eq!(session.refresh_url, "http://localhost:1/auth/refresh");
    }
}
