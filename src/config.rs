use std::time::Duration;

use crate::error::{AppError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_COMPLETION_WINDOW: Duration = Duration::from_millis(3000);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// How long a completed card can still be restored before the backend call fires.
    pub completion_window: Duration,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_token: None,
            refresh_token: None,
            completion_window: DEFAULT_COMPLETION_WINDOW,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the `KANBAN_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let completion_window = match lookup("KANBAN_COMPLETION_WINDOW_MS") {
            Some(raw) => Duration::from_millis(parse_number(&raw, "KANBAN_COMPLETION_WINDOW_MS")?),
            None => defaults.completion_window,
        };

        let http_timeout = match lookup("KANBAN_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number(&raw, "KANBAN_HTTP_TIMEOUT_SECS")?),
            None => defaults.http_timeout,
        };

        Ok(Self {
            api_url: lookup("KANBAN_API_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.api_url),
            access_token: lookup("KANBAN_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            refresh_token: lookup("KANBAN_REFRESH_TOKEN").filter(|t| !t.is_empty()),
            completion_window,
            http_timeout,
        })
    }
}

fn parse_number(raw: &str, key: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("{} must be a whole number, got {:?}", key, raw)))
}
