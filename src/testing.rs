//! Testing utilities for code built on the orchestration layer.
//!
//! [`MockTransport`] replays scripted responses in order and records every
//! request, so resource glue can be exercised without a live endpoint.
//!
//! # Example
//!
//! ```
//! use hemmer_graphql_provider::testing::MockTransport;
//! use hemmer_graphql_provider::{execute, Request};
//! use serde_json::{json, Value};
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransport::new();
//! transport.push_data(json!({"stack": {"id": "prod"}}));
//!
//! let data: Value = execute(&transport, &Request::query("GetStack", "query { stack { id } }"))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(data["stack"]["id"], "prod");
//! assert_eq!(transport.requests()[0].operation_name(), "GetStack");
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::classify::ErrorKind;
use crate::error::ProviderError;
use crate::transport::Transport;
use crate::types::Request;

#[derive(Debug, Default)]
struct Recorded {
    responses: VecDeque<Result<Value, ProviderError>>,
    requests: Vec<Request>,
}

/// A [`Transport`] that replays scripted responses.
///
/// Once the script is exhausted every call fails with a protocol error naming
/// the unexpected operation.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Mutex<Recorded>,
}

impl MockTransport {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a successful response carrying `data`.
    pub fn push_data(&self, data: Value) {
        self.lock().responses.push_back(Ok(data));
    }

    /// Queue a failure.
    pub fn push_error(&self, err: ProviderError) {
        self.lock().responses.push_back(Err(err));
    }

    /// Queue a failure built from a remote message, classified as the HTTP
    /// client would classify it.
    pub fn push_remote_error(&self, message: &str) {
        self.push_error(ProviderError::from_remote(message));
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.lock().requests.len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// Number of scripted responses not consumed yet.
    pub fn remaining(&self) -> usize {
        self.lock().responses.len()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &Request) -> Result<Value, ProviderError> {
        let mut recorded = self.lock();
        recorded.requests.push(request.clone());
        recorded.responses.pop_front().unwrap_or_else(|| {
            Err(ProviderError::Protocol(format!(
                "no scripted response for {}",
                request.operation_name()
            )))
        })
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that an error belongs to a remote error class.
///
/// # Panics
///
/// Panics if the kind differs.
pub fn assert_error_kind(err: &ProviderError, kind: ErrorKind) {
    assert_eq!(
        err.kind(),
        kind,
        "Expected a {:?} error, but got {:?}: {}",
        kind,
        err.kind(),
        err
    );
}

/// Assert that the transport was called exactly `expected` times.
///
/// # Panics
///
/// Panics if the call count differs.
pub fn assert_calls(transport: &MockTransport, expected: usize) {
    let requests = transport.requests();
    assert_eq!(
        requests.len(),
        expected,
        "Expected {} call(s), but got {}: {:?}",
        expected,
        requests.len(),
        requests.iter().map(|r| r.operation_name()).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replays_in_order() {
        let transport = MockTransport::new();
        transport.push_data(json!({"n": 1}));
        transport.push_remote_error("stack not found");

        let request = Request::query("Q", "query Q { n }");
        assert_eq!(transport.execute(&request).await.unwrap(), json!({"n": 1}));

        let err = transport.execute(&request).await.unwrap_err();
        assert_error_kind(&err, ErrorKind::NotFound);
        assert_eq!(transport.remaining(), 0);
        assert_calls(&transport, 2);
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let transport = MockTransport::new();
        let err = transport
            .execute(&Request::mutation("Unexpected", "mutation { x }"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Protocol(_)));
        assert!(err.message().contains("Unexpected"));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    #[should_panic(expected = "Expected a Transient error")]
    fn test_assert_error_kind_fails() {
        assert_error_kind(&ProviderError::Validation("bad".into()), ErrorKind::Transient);
    }
}
