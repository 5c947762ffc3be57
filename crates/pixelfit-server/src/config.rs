//! Server Configuration
//!
//! Read once from the environment at startup and shared read-only afterwards.

use axum::http::HeaderValue;
use thiserror::Error;

/// Origins always allowed to call the API
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:5500",
    "https://pixelfit.netlify.app",
    "https://pixelfit.io",
];

pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_MODE: &str = "development";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct ServerConfig {
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub frontend_url: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    /// Runtime mode label, e.g. `development` or `production`
    pub mode: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("frontend_url", &self.frontend_url)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let stripe_secret_key = var("STRIPE_SECRET_KEY").ok_or(ConfigError::Missing("STRIPE_SECRET_KEY"))?;
        let stripe_webhook_secret =
            var("STRIPE_WEBHOOK_SECRET").ok_or(ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;

        let frontend_url = var("FRONTEND_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.into());

        let port = match var("PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let mode = var("APP_ENV").unwrap_or_else(|| DEFAULT_MODE.into());

        let mut allowed_origins: Vec<String> =
            DEFAULT_ALLOWED_ORIGINS.iter().map(|o| (*o).to_string()).collect();
        if !allowed_origins.contains(&frontend_url) {
            allowed_origins.push(frontend_url.clone());
        }

        for origin in &allowed_origins {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                name: "FRONTEND_URL",
                reason: format!("'{origin}' is not a valid header value: {e}"),
            })?;
        }

        Ok(Self {
            stripe_secret_key,
            stripe_webhook_secret,
            frontend_url,
            port,
            allowed_origins,
            mode,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
