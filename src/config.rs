//! Configuration loading for the synchronization engine.
//!
//! Loads `.env` files and environment variables prefixed with `CALSYNC_`,
//! producing a typed [`SyncConfig`]. Base URLs are overridable per provider
//! so tests can point the connectors at a local mock server.

use std::env;
use std::time::Duration;

use crate::error::SyncError;
use crate::model::Provider;

/// OAuth client credentials and endpoints for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    /// REST API base, e.g. `https://www.googleapis.com/calendar/v3`.
    pub api_base: String,
    /// OAuth base; the token endpoint is `{oauth_base}/token`.
    pub oauth_base: String,
}

/// Engine configuration derived from `CALSYNC_*` environment variables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub log_level: String,
    pub http_timeout_secs: u64,
    /// Page size requested from both providers.
    pub page_size: u32,
    /// Full-window mode bounds: this many days into the past...
    pub window_past_days: i64,
    /// ...and this many days into the future.
    pub window_future_days: i64,
    pub google: ProviderConfig,
    pub microsoft: ProviderConfig,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            http_timeout_secs: 30,
            page_size: 250,
            window_past_days: 90,
            window_future_days: 365,
            google: ProviderConfig {
                client_id: String::new(),
                client_secret: String::new(),
                api_base: "https://www.googleapis.com/calendar/v3".to_string(),
                oauth_base: "https://oauth2.googleapis.com".to_string(),
            },
            microsoft: ProviderConfig {
                client_id: String::new(),
                client_secret: String::new(),
                api_base: "https://graph.microsoft.com/v1.0".to_string(),
                oauth_base: "https://login.microsoftonline.com/common/oauth2/v2.0".to_string(),
            },
        }
    }
}

impl SyncConfig {
    /// Load configuration from `.env` (if present) and the process
    /// environment, falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            log_level: env_or("CALSYNC_LOG_LEVEL", &defaults.log_level),
            http_timeout_secs: env_parse_or("CALSYNC_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            page_size: env_parse_or("CALSYNC_PAGE_SIZE", defaults.page_size),
            window_past_days: env_parse_or("CALSYNC_WINDOW_PAST_DAYS", defaults.window_past_days),
            window_future_days: env_parse_or(
                "CALSYNC_WINDOW_FUTURE_DAYS",
                defaults.window_future_days,
            ),
            google: ProviderConfig {
                client_id: env_or("CALSYNC_GOOGLE_CLIENT_ID", ""),
                client_secret: env_or("CALSYNC_GOOGLE_CLIENT_SECRET", ""),
                api_base: env_or("CALSYNC_GOOGLE_API_BASE", &defaults.google.api_base),
                oauth_base: env_or("CALSYNC_GOOGLE_OAUTH_BASE", &defaults.google.oauth_base),
            },
            microsoft: ProviderConfig {
                client_id: env_or("CALSYNC_MICROSOFT_CLIENT_ID", ""),
                client_secret: env_or("CALSYNC_MICROSOFT_CLIENT_SECRET", ""),
                api_base: env_or("CALSYNC_MICROSOFT_API_BASE", &defaults.microsoft.api_base),
                oauth_base: env_or("CALSYNC_MICROSOFT_OAUTH_BASE", &defaults.microsoft.oauth_base),
            },
        }
    }

    pub fn provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        match provider {
            Provider::Google => Some(&self.google),
            Provider::Microsoft => Some(&self.microsoft),
            Provider::Subscription | Provider::Derived => None,
        }
    }

    /// Shared HTTP client with the configured bounded timeout. A timed-out
    /// call is handled exactly like a non-2xx failure by the callers.
    pub fn http_client(&self) -> Result<reqwest::Client, SyncError> {
        Ok(reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()?)
    }
}
