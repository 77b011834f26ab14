use std::env;
use std::net::IpAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use common_auth::GuardConfig;

const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:8080",
];

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    pub backend_rest_url: String,
    pub backend_api_key: String,
    pub backend_timeout: Duration,
    pub guard: GuardConfig,
    pub cors_allowed_origins: Vec<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("HOST must be an IP address")?;
        let port = match lookup("PORT") {
            Some(value) => value.parse::<u16>().context("PORT must be a port number")?,
            None => 8090,
        };

        let backend_rest_url = lookup("BACKEND_REST_URL")
            .and_then(|value| normalize_optional(&value))
            .ok_or_else(|| anyhow!("BACKEND_REST_URL must be set"))?;
        let backend_api_key = lookup("BACKEND_API_KEY")
            .and_then(|value| normalize_optional(&value))
            .ok_or_else(|| anyhow!("BACKEND_API_KEY must be set"))?;
        let backend_timeout_secs = match lookup("BACKEND_TIMEOUT_SECONDS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .context("BACKEND_TIMEOUT_SECONDS must be a whole number of seconds")?,
            None => 10,
        };

        let grace_ms = match lookup("AUTH_GRACE_WINDOW_MS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .context("AUTH_GRACE_WINDOW_MS must be a whole number of milliseconds")?,
            None => 1000,
        };
        let terms_version = lookup("TERMS_VERSION")
            .and_then(|value| normalize_optional(&value))
            .unwrap_or_else(|| common_auth::config::DEFAULT_TERMS_VERSION.to_string());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|value| parse_list(&value))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect());

        Ok(Self {
            host,
            port,
            backend_rest_url,
            backend_api_key,
            backend_timeout: Duration::from_secs(backend_timeout_secs.max(1)),
            guard: GuardConfig::new(terms_version).with_grace_window(Duration::from_millis(grace_ms)),
            cors_allowed_origins,
        })
    }
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}
