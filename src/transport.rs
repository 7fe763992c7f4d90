//! The capability every orchestration primitive is built on.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ProviderError;
use crate::types::Request;

/// Executes exactly one GraphQL operation per call.
///
/// Implementations perform one round trip, attach credentials, and classify
/// failures into [`ProviderError`]. They never retry on their own.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the GraphQL `data` object.
    async fn execute(&self, request: &Request) -> Result<Value, ProviderError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: &Request) -> Result<Value, ProviderError> {
        (**self).execute(request).await
    }
}

/// Execute a request and decode its data into `T`.
///
/// `T` describes the expected response shape. Use `Option<_>` fields for
/// entities the remote may report as `null`.
pub async fn execute<T, C>(transport: &C, request: &Request) -> Result<T, ProviderError>
where
    T: DeserializeOwned,
    C: Transport + ?Sized,
{
    let data = transport.execute(request).await?;
    decode(request, data)
}

fn decode<T: DeserializeOwned>(request: &Request, data: Value) -> Result<T, ProviderError> {
    serde_json::from_value(data).map_err(|e| {
        ProviderError::Protocol(format!(
            "could not decode {} response: {}",
            request.operation_name(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct StackData {
        stack: Option<Stack>,
    }

    #[derive(Debug, Deserialize)]
    struct Stack {
        id: String,
        administrative: bool,
    }

    #[tokio::test]
    async fn test_execute_decodes_target() {
        let transport = MockTransport::new();
        transport.push_data(json!({"stack": {"id": "prod", "administrative": true}}));

        let request = Request::query("GetStack", "query GetStack { stack { id administrative } }");
        let data: StackData = execute(&transport, &request).await.unwrap();

        let stack = data.stack.unwrap();
        assert_eq!(stack.id, "prod");
        assert!(stack.administrative);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_execute_null_entity() {
        let transport = MockTransport::new();
        transport.push_data(json!({"stack": null}));

        let request = Request::query("GetStack", "query GetStack { stack { id } }");
        let data: StackData = execute(&transport, &request).await.unwrap();
        assert!(data.stack.is_none());
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_protocol_error() {
        let transport = MockTransport::new();
        transport.push_data(json!({"stack": {"id": 12}}));

        let request = Request::query("GetStack", "query GetStack { stack { id } }");
        let err = execute::<StackData, _>(&transport, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Protocol(_)));
        assert!(err.message().contains("GetStack"));
    }

    #[tokio::test]
    async fn test_errors_pass_through_without_retry() {
        let transport = MockTransport::new();
        transport.push_error(ProviderError::Transient("could not assume role".into()));

        let request = Request::mutation("Attach", "mutation Attach { attach { id } }");
        let err = execute::<Value, _>(&transport, &request).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(transport.calls(), 1);
    }
}
