//! Client configuration.
//!
//! Values come from the environment and may be overridden with builder methods.  Nothing is
//! validated up front: a missing base URL, key or secret only surfaces as an
//! [`Error::Configuration`] when a request actually needs it.

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the API base URL.
pub const BASE_URL_VAR: &str = "ERNIE_API_BASE_URL";
/// Environment variable holding the API key (OAuth client id).
pub const API_KEY_VAR: &str = "ERNIE_API_KEY";
/// Environment variable holding the secret key (OAuth client secret).
pub const SECRET_KEY_VAR: &str = "ERNIE_SECRET_KEY";
/// Environment variable overriding the completion path.
pub const COMPLETION_PATH_VAR: &str = "ERNIE_COMPLETION_PATH";
/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_VAR: &str = "ERNIE_TIMEOUT_SECS";

/// Path of the OAuth client-credentials exchange.
pub const TOKEN_PATH: &str = "/oauth/2.0/token";
/// Default path of the chat completion endpoint.
pub const DEFAULT_COMPLETION_PATH: &str = "/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/completions_pro";
/// Nominal user identifier sent with every completion.
pub const DEFAULT_USER_ID: &str = "web_user";
/// Sampling temperature sent with every completion.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the [`Ernie`](crate::Ernie) client.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Scheme and host of the API, e.g. `https://aip.baidubce.com`.
    pub base_url: Option<String>,
    /// OAuth client id.
    pub api_key: Option<String>,
    /// OAuth client secret.
    pub secret_key: Option<String>,
    /// Path of the completion endpoint relative to `base_url`.
    pub completion_path: String,
    /// Identifier sent as `user_id`.
    pub user_id: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates an empty configuration with default request parameters.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            secret_key: None,
            completion_path: DEFAULT_COMPLETION_PATH.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// Unset or empty variables are left as `None`; an unparsable timeout falls back to the
    /// default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::new();
        config.base_url = get(BASE_URL_VAR);
        config.api_key = get(API_KEY_VAR);
        config.secret_key = get(SECRET_KEY_VAR);
        if let Some(path) = get(COMPLETION_PATH_VAR) {
            config.completion_path = path;
        }
        if let Some(secs) = get(TIMEOUT_VAR).and_then(|s| s.trim().parse::<u64>().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the secret key.
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Sets the completion path.
    pub fn with_completion_path(mut self, path: impl Into<String>) -> Self {
        self.completion_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The base URL, or a configuration error naming the variable to set.
    pub fn require_base_url(&self) -> Result<Url> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| Error::configuration("API base URL is not configured", Some(BASE_URL_VAR)))?;
        Ok(Url::parse(base)?)
    }

    /// The API key, or a configuration error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::configuration("API key is not configured", Some(API_KEY_VAR)))
    }

    /// The secret key, or a configuration error naming the variable to set.
    pub fn require_secret_key(&self) -> Result<&str> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| Error::configuration("secret key is not configured", Some(SECRET_KEY_VAR)))
    }

    /// Full URL of the credential exchange.
    pub fn token_url(&self) -> Result<Url> {
        Ok(self.require_base_url()?.join(TOKEN_PATH)?)
    }

    /// Full URL of the completion endpoint.
    pub fn completion_url(&self) -> Result<Url> {
        Ok(self.require_base_url()?.join(&self.completion_path)?)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::new();
        assert!(config.base_url.is_none());
        assert!(config.api_key.is_none());
        assert!(config.secret_key.is_none());
        assert_eq!(config.completion_path, DEFAULT_COMPLETION_PATH);
        assert_eq!(config.user_id, "web_user");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn from_lookup_reads_variables() {
        let config = ClientConfig::from_lookup(|name| match name {
            BASE_URL_VAR => Some("https://aip.example.com".to_string()),
            API_KEY_VAR => Some("key".to_string()),
            SECRET_KEY_VAR => Some("secret".to_string()),
            TIMEOUT_VAR => Some("15".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url.as_deref(), Some("https://aip.example.com"));
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.secret_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.completion_path, DEFAULT_COMPLETION_PATH);
    }

    #[test]
    fn blank_variables_are_unset() {
        let config = ClientConfig::from_lookup(|name| match name {
            API_KEY_VAR => Some("   ".to_string()),
            TIMEOUT_VAR => Some("soon".to_string()),
            _ => None,
        });
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn missing_values_fail_on_demand() {
        let config = ClientConfig::new();
        let err = config.require_api_key().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(API_KEY_VAR));
        assert!(config.require_secret_key().is_err());
        assert!(config.token_url().unwrap_err().is_configuration());
    }

    #[test]
    fn endpoint_urls_join_base() {
        let config = ClientConfig::new().with_base_url("https://aip.example.com");
        assert_eq!(
            config.token_url().unwrap().as_str(),
            "https://aip.example.com/oauth/2.0/token"
        );
        assert_eq!(
            config.completion_url().unwrap().as_str(),
            "https://aip.example.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/completions_pro"
        );
    }

    #[test]
    fn malformed_base_url_is_url_error() {
        let config = ClientConfig::new().with_base_url("not a url");
        assert!(matches!(config.token_url(), Err(Error::Url { .. })));
    }
}
