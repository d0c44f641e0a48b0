//! Client configuration.
//!
//! `ClientConfig` is immutable once a `RestClient` owns it. It can be built in
//! code or loaded from `LEMBAAS_*` environment variables (and a `.env` file).

use std::env;
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, error};
use url::Url;

use crate::error::ApiError;

/// Timeout applied to every call unless overridden at construction.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_API_VERSION: u32 = 1;

pub const ENV_BASE_URL: &str = "LEMBAAS_BASE_URL";
pub const ENV_API_VERSION: &str = "LEMBAAS_API_VERSION";
pub const ENV_AUTH_TOKEN: &str = "LEMBAAS_AUTH_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "LEMBAAS_TIMEOUT_SECS";

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    api_version: u32,
    auth_token: Option<String>,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str, api_version: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from the process environment, reading a `.env`
    /// file first when one exists.
    pub fn from_env() -> Result<Self, ApiError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No .env file loaded: {e}"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// `LEMBAAS_BASE_URL` is required. Unparsable numbers fall back to their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{ENV_BASE_URL} is not set")))?;
        let api_version = parse_or_default(&lookup, ENV_API_VERSION, DEFAULT_API_VERSION);
        let timeout_secs = parse_or_default(&lookup, ENV_TIMEOUT_SECS, DEFAULT_TIMEOUT.as_secs());

        let mut config = Self::new(&base_url, api_version).with_timeout(Duration::from_secs(timeout_secs));
        if let Some(token) = lookup(ENV_AUTH_TOKEN).filter(|t| !t.is_empty()) {
            config = config.with_auth_token(token);
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no call could succeed with.
    pub fn validate(&self) -> Result<(), ApiError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "unsupported scheme {:?} in base URL",
                url.scheme()
            )));
        }
        if !url.has_host() {
            return Err(ApiError::Config("base URL has no host".to_string()));
        }
        if self.api_version == 0 {
            return Err(ApiError::Config("API version must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Root every route path is appended to, e.g. `https://host/api/v1`.
    pub fn api_root(&self) -> String {
        format!("{}/api/v{}", self.base_url, self.api_version)
    }
}

// Keeps bearer tokens out of logs.
impl Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    <T as FromStr>::Err: Debug,
{
    match lookup(key) {
        Some(val) => val.trim().parse::<T>().unwrap_or_else(|_| {
            error!("Failed to parse {}: {}, using default", key, val);
            default
        }),
        None => default,
    }
}
