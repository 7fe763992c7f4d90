//! Provider configuration.
//!
//! The host runtime hands the provider block to `configure` as a JSON value.
//! Credentials left out of the block are read from the environment:
//!
//! - `HEMMER_GRAPHQL_ENDPOINT`: base URL of the remote service
//! - `HEMMER_GRAPHQL_TOKEN`: bearer token
//!
//! # Example
//!
//! ```
//! use hemmer_graphql_provider::config::ProviderConfig;
//! use serde_json::json;
//!
//! let config = ProviderConfig::from_value(json!({
//!     "endpoint": "https://acme.example.io",
//!     "api_token": "secret",
//!     "poll_interval_secs": 10
//! }))
//! .unwrap();
//!
//! let session = config.session().unwrap();
//! assert_eq!(session.endpoint().as_str(), "https://acme.example.io/graphql");
//! assert_eq!(config.poll_options().unwrap().interval.as_secs(), 10);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::poller::PollOptions;
use crate::retry::RetryPolicy;
use crate::session::Session;

/// Environment variable holding the endpoint.
pub const ENDPOINT_ENV: &str = "HEMMER_GRAPHQL_ENDPOINT";

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "HEMMER_GRAPHQL_TOKEN";

/// Settings accepted in the provider block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the remote service.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Seconds between operation polls.
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    /// Upper bound in seconds for waiting on an operation.
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,
    /// Attempts made for mutations racing trust propagation.
    #[serde(default)]
    pub retry_max_attempts: Option<u32>,
    /// Seconds between those attempts.
    #[serde(default)]
    pub retry_delay_secs: Option<u64>,
}

impl ProviderConfig {
    /// Parse the provider block. `null` is an empty block.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| ProviderError::Configuration(format!("invalid provider block: {}", e)))
    }

    /// Fill missing credentials from the process environment.
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback(|name| std::env::var(name).ok())
    }

    /// Fill missing credentials from `lookup`.
    pub fn with_fallback(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.endpoint.is_none() {
            self.endpoint = lookup(ENDPOINT_ENV).filter(|v| !v.is_empty());
        }
        if self.api_token.is_none() {
            self.api_token = lookup(TOKEN_ENV).filter(|v| !v.is_empty());
        }
        self
    }

    /// Build the session.
    pub fn session(&self) -> Result<Session, ProviderError> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            ProviderError::Configuration(format!(
                "endpoint is not set; configure it or set {}",
                ENDPOINT_ENV
            ))
        })?;
        let token = self.api_token.as_deref().ok_or_else(|| {
            ProviderError::Configuration(format!(
                "api_token is not set; configure it or set {}",
                TOKEN_ENV
            ))
        })?;
        Session::new(endpoint, token)
    }

    /// Poll options with configured overrides applied.
    ///
    /// A zero interval or timeout is rejected.
    pub fn poll_options(&self) -> Result<PollOptions, ProviderError> {
        let mut options = PollOptions::default();
        if let Some(secs) = self.poll_interval_secs {
            if secs == 0 {
                return Err(ProviderError::Configuration(
                    "poll_interval_secs must be at least 1".to_string(),
                ));
            }
            options.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_timeout_secs {
            if secs == 0 {
                return Err(ProviderError::Configuration(
                    "poll_timeout_secs must be at least 1".to_string(),
                ));
            }
            options.timeout = Duration::from_secs(secs);
        }
        Ok(options)
    }

    /// Retry policy with configured overrides applied.
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(attempts) = self.retry_max_attempts {
            policy.max_attempts = attempts;
        }
        if let Some(secs) = self.retry_delay_secs {
            policy.delay = Duration::from_secs(secs);
        }
        policy
    }
}
