//! HTTP transport for the remote GraphQL endpoint.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::classify::{classify_graphql_error, classify_status, ErrorKind};
use crate::error::ProviderError;
use crate::session::Session;
use crate::transport::Transport;
use crate::types::{GraphqlError, GraphqlResponse, Request};

const MAX_BODY_IN_ERROR: usize = 2048;

/// GraphQL client bound to one [`Session`].
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    session: Arc<Session>,
    http: reqwest::Client,
}

impl GraphqlClient {
    /// Create a client for the given session.
    pub fn new(session: Session) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self::with_http_client(session, http))
    }

    /// Create a client that reuses an existing `reqwest` client.
    pub fn with_http_client(session: Session, http: reqwest::Client) -> Self {
        Self {
            session: Arc::new(session),
            http,
        }
    }

    /// The session this client authenticates with.
    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait::async_trait]
impl Transport for GraphqlClient {
    #[instrument(
        skip(self, request),
        name = "graphql.execute",
        fields(operation = %request.operation_name(), kind = ?request.kind())
    )]
    async fn execute(&self, request: &Request) -> Result<Value, ProviderError> {
        let response = self
            .http
            .post(self.session.endpoint().clone())
            .bearer_auth(self.session.token())
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "GraphQL request failed");
                ProviderError::from(e)
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            warn!(status = status.as_u16(), error = %e, "GraphQL response body could not be read");
            ProviderError::Transient(format!("failed to read response body: {}", e))
        })?;
        let envelope = serde_json::from_slice::<GraphqlResponse>(&bytes);

        if !status.is_success() {
            let err = match envelope {
                Ok(envelope) if !envelope.errors.is_empty() => errors_to_error(&envelope.errors),
                _ => ProviderError::from_kind(
                    classify_status(status),
                    format!("HTTP {}: {}", status, truncate_body(&bytes)),
                ),
            };
            warn!(status = status.as_u16(), error = %err, "GraphQL request rejected");
            return Err(err);
        }

        let envelope = envelope.map_err(|e| {
            ProviderError::Protocol(format!("response is not a GraphQL envelope: {}", e))
        })?;

        if !envelope.errors.is_empty() {
            let err = errors_to_error(&envelope.errors);
            warn!(errors = envelope.errors.len(), error = %err, "GraphQL errors returned");
            return Err(err);
        }

        debug!("GraphQL request completed");
        envelope.data.ok_or_else(|| {
            ProviderError::Protocol("response carried neither data nor errors".to_string())
        })
    }
}

/// Fold the GraphQL `errors` array into one error.
///
/// The first error decides the class; all messages are kept so the caller
/// sees the full remote explanation.
fn errors_to_error(errors: &[GraphqlError]) -> ProviderError {
    let kind = errors
        .first()
        .map(classify_graphql_error)
        .unwrap_or(ErrorKind::Unknown);
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    ProviderError::from_kind(kind, message)
}

fn truncate_body(bytes: &[u8]) -> String {
    let mut body = String::from_utf8_lossy(bytes).to_string();
    if body.len() > MAX_BODY_IN_ERROR {
        let mut cut = MAX_BODY_IN_ERROR;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(message: &str) -> GraphqlError {
        GraphqlError {
            message: message.to_string(),
            path: vec![],
            extensions: None,
        }
    }

    #[test]
    fn test_errors_to_error_joins_messages() {
        let err = errors_to_error(&[error("stack not found"), error("also broken")]);
        assert!(err.is_not_found());
        assert_eq!(err.message(), "stack not found; also broken");
    }

    #[test]
    fn test_errors_to_error_empty() {
        assert!(matches!(errors_to_error(&[]), ProviderError::Remote(_)));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_BODY_IN_ERROR + 10);
        let body = truncate_body(long.as_bytes());
        assert!(body.ends_with('…'));
        assert_eq!(body.chars().count(), MAX_BODY_IN_ERROR + 1);

        assert_eq!(truncate_body(b"short"), "short");
    }

    #[test]
    fn test_client_keeps_session() {
        let session = Session::new("https://acme.example.io", "tok").unwrap();
        let client = GraphqlClient::new(session.clone()).unwrap();
        assert_eq!(client.session(), &session);
    }
}
