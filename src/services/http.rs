use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::auth::SessionProvider;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    Card, Column, CompletedGroup, CreateCard, CreateColumn, CreateReminder, Reminder, UpdateCard,
};
use crate::services::Backend;

/// `Backend` over the REST API, authenticated with the session's bearer token.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        session: Arc<dyn SessionProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: Arc<dyn SessionProvider>) -> Result<Self> {
        Self::new(&config.api_url, session, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request, refreshing the session and retrying once on 401.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        let mut refreshed = false;

        loop {
            let mut request = self.client.request(method.clone(), &url);
            if let Some(token) = self.session.access_token().await {
                request = request.bearer_auth(token);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }

            debug!(method = %method, url = %url, "Sending backend request");

            let response = request.send().await.map_err(|e| {
                error!(error = %e, url = %url, "Backend request failed");
                AppError::Http(e)
            })?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && !refreshed {
                warn!(url = %url, "Access token rejected, refreshing session");
                self.session.refresh().await?;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                warn!(status = %status, url = %url, "Backend returned non-success status");
                return Err(AppError::from_status(status, body));
            }

            return Ok(response);
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let response = self.send(method, path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse backend response: {}", e)))
    }
}

fn to_body<T: Serialize>(input: &T) -> Result<Option<serde_json::Value>> {
    serde_json::to_value(input)
        .map(Some)
        .map_err(|e| AppError::Internal(format!("Failed to encode request body: {}", e)))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_columns(&self) -> Result<Vec<Column>> {
        self.call(Method::GET, "columns", None).await
    }

    async fn create_column(&self, input: &CreateColumn) -> Result<Column> {
        self.call(Method::POST, "columns", to_body(input)?).await
    }

    async fn duplicate_column(&self, column_id: i64) -> Result<Column> {
        self.call(Method::POST, &format!("columns/{}/duplicate", column_id), None)
            .await
    }

    async fn delete_column(&self, column_id: i64) -> Result<()> {
        self.send(Method::DELETE, &format!("columns/{}", column_id), None)
            .await?;
        Ok(())
    }

    async fn create_card(&self, input: &CreateCard) -> Result<Card> {
        self.call(Method::POST, "cards", to_body(input)?).await
    }

    async fn update_card(&self, card_id: i64, input: &UpdateCard) -> Result<Card> {
        self.call(Method::PUT, &format!("cards/{}", card_id), to_body(input)?)
            .await
    }

    async fn delete_card(&self, card_id: i64) -> Result<()> {
        self.send(Method::DELETE, &format!("cards/{}", card_id), None)
            .await?;
        Ok(())
    }

    async fn complete_card(&self, card_id: i64) -> Result<Card> {
        self.call(Method::PUT, &format!("cards/{}/complete", card_id), None)
            .await
    }

    async fn list_completed_cards(&self) -> Result<Vec<CompletedGroup>> {
        self.call(Method::GET, "cards/completed", None).await
    }

    async fn create_reminder(&self, input: &CreateReminder) -> Result<Reminder> {
        self.call(Method::POST, "reminder", to_body(input)?).await
    }
}
