//! Authenticated session for the remote GraphQL endpoint.

use std::fmt;

use reqwest::Url;

use crate::error::ProviderError;

const GRAPHQL_PATH: &str = "graphql";

/// Endpoint and bearer token used for every call.
///
/// A session never changes once created. When the token expires, build a new
/// session and a new client from it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    endpoint: Url,
    token: String,
}

impl Session {
    /// Create a session from a base URL and a bearer token.
    ///
    /// The base may be the service root (`https://acme.example.io`) or the
    /// GraphQL endpoint itself (`https://acme.example.io/graphql`).
    pub fn new(endpoint: &str, token: impl Into<String>) -> Result<Self, ProviderError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "API token must not be empty".to_string(),
            ));
        }

        let endpoint = graphql_url(endpoint)?;
        Ok(Self { endpoint, token })
    }

    /// The full GraphQL URL (`<base>/graphql`).
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

fn graphql_url(base: &str) -> Result<Url, ProviderError> {
    let trimmed = base.trim().trim_end_matches('/');
    let raw = if trimmed.ends_with(&format!("/{}", GRAPHQL_PATH)) {
        trimmed.to_string()
    } else {
        format!("{}/{}", trimmed, GRAPHQL_PATH)
    };

    let url = Url::parse(&raw)
        .map_err(|e| ProviderError::Configuration(format!("invalid endpoint {:?}: {}", base, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProviderError::Configuration(format!(
            "unsupported endpoint scheme {:?}",
            other
        ))),
    }
}
