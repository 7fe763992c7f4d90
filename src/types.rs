//! Request and wire types shared by the transport layer.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Whether a request reads or changes remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// A GraphQL query.
    Query,
    /// A GraphQL mutation.
    Mutation,
}

/// An optional input value with three distinct wire states.
///
/// Use as a field of an input object together with
/// `#[serde(skip_serializing_if = "Nullable::is_absent")]`, so that `Absent`
/// omits the field while `Null` sends an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Nullable<T> {
    /// Not sent at all; the remote keeps its current value.
    #[default]
    Absent,
    /// Sent as `null`; the remote clears the value.
    Null,
    /// Sent as the given value.
    Value(T),
}

impl<T> Nullable<T> {
    /// Whether the field should be left out of the payload.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Map `Some` to a value and `None` to an explicit null.
    pub fn or_null(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::Null,
        }
    }
}

impl<T> From<Option<T>> for Nullable<T> {
    /// `None` is treated as absent. Use [`Nullable::or_null`] to send null.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::Absent,
        }
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => v.serialize(serializer),
            Self::Null | Self::Absent => serializer.serialize_none(),
        }
    }
}

/// GraphQL variables for a single request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Variables(Map<String, Value>);

impl Variables {
    /// Create an empty variable set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable from anything convertible into a JSON value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Set a variable from any serializable input object.
    pub fn try_with<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, ProviderError> {
        self.0.insert(name.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Set a variable to an explicit `null`.
    pub fn with_null(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), Value::Null);
        self
    }

    /// Set a variable only when a value is present; `None` leaves it absent.
    pub fn with_optional(self, name: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether a variable was set (including to `null`).
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of variables set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no variables are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single GraphQL operation to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    kind: OperationKind,
    operation_name: String,
    document: String,
    variables: Variables,
}

impl Request {
    /// Create a query request.
    pub fn query(operation_name: impl Into<String>, document: impl Into<String>) -> Self {
        Self::new(OperationKind::Query, operation_name, document)
    }

    /// Create a mutation request.
    pub fn mutation(operation_name: impl Into<String>, document: impl Into<String>) -> Self {
        Self::new(OperationKind::Mutation, operation_name, document)
    }

    fn new(
        kind: OperationKind,
        operation_name: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            operation_name: operation_name.into(),
            document: document.into(),
            variables: Variables::new(),
        }
    }

    /// Replace the request variables.
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Query or mutation.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The operation name, used by the remote for tracing.
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// The GraphQL document.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// The request variables.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// The JSON body sent over the wire.
    pub fn to_body(&self) -> Value {
        serde_json::json!({
            "query": self.document,
            "variables": self.variables,
            "operationName": self.operation_name,
        })
    }
}

/// An entry of the GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    /// Human-readable error message.
    pub message: String,
    /// Path within the response where the error occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    /// Extensions metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// The GraphQL response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlResponse {
    /// Response data.
    #[serde(default)]
    pub data: Option<Value>,
    /// GraphQL errors.
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct StackUpdate {
        name: String,
        #[serde(skip_serializing_if = "Nullable::is_absent")]
        description: Nullable<String>,
        #[serde(skip_serializing_if = "Nullable::is_absent")]
        worker_pool: Nullable<String>,
    }

    #[test]
    fn test_nullable_wire_states() {
        let update = StackUpdate {
            name: "prod".to_string(),
            description: Nullable::Null,
            worker_pool: Nullable::Absent,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"name": "prod", "description": null})
        );

        let update = StackUpdate {
            name: "prod".to_string(),
            description: Nullable::Value("main".to_string()),
            worker_pool: Nullable::from(Some("wp-1".to_string())),
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"name": "prod", "description": "main", "worker_pool": "wp-1"})
        );
    }

    #[test]
    fn test_nullable_conversions() {
        assert!(Nullable::<u8>::from(None).is_absent());
        assert_eq!(Nullable::<u8>::or_null(None), Nullable::Null);
        assert_eq!(Nullable::or_null(Some(3)), Nullable::Value(3));
    }

    #[test]
    fn test_variables_distinguish_null_from_absent() {
        let vars = Variables::new()
            .with("id", "stack-1")
            .with_null("labels")
            .with_optional("branch", None::<String>)
            .with_optional("space", Some("root"));

        assert_eq!(vars.get("labels"), Some(&Value::Null));
        assert!(vars.contains("labels"));
        assert!(!vars.contains("branch"));
        assert_eq!(vars.get("space"), Some(&json!("root")));
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn test_request_body() {
        let request = Request::mutation("StackCreate", "mutation StackCreate { stackCreate { id } }")
            .with_variables(Variables::new().with("manage", true));

        assert_eq!(request.kind(), OperationKind::Mutation);
        assert_eq!(
            request.to_body(),
            json!({
                "query": "mutation StackCreate { stackCreate { id } }",
                "variables": {"manage": true},
                "operationName": "StackCreate",
            })
        );
    }

    #[test]
    fn test_response_envelope_defaults() {
        let response: GraphqlResponse =
            serde_json::from_value(json!({"errors": [{"message": "boom"}]})).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors[0].message, "boom");
    }
}
