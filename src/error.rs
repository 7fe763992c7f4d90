//! Error types for remote-operation orchestration.

use thiserror::Error;

use crate::classify::ErrorKind;

/// Errors produced while talking to the remote GraphQL service.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote service reported that the entity does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The remote service rejected the request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A retryable infrastructure or consistency failure.
    #[error("Transient error: {0}")]
    Transient(String),

    /// A remote failure that could not be classified.
    #[error("Remote error: {0}")]
    Remote(String),

    /// The remote service answered outside the expected protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The local wait was cancelled. The remote operation may still be running.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The local wait timed out. The remote operation may still be running.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// A long-running operation finished in a state marked as failed.
    #[error("Operation {operation} finished in state {state}")]
    OperationFailed {
        /// Identifier of the remote operation.
        operation: String,
        /// The terminal state that was observed.
        state: String,
    },

    /// Provider configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Build an error from a remote message, classifying it by content.
    pub fn from_remote(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_kind(crate::classify::classify(&message), message)
    }

    /// Build the variant that corresponds to a remote error kind.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Transient => Self::Transient(message),
            ErrorKind::Unknown => Self::Remote(message),
        }
    }

    /// The remote error class of this error.
    ///
    /// Locally produced errors (protocol, cancellation, configuration, ...)
    /// report [`ErrorKind::Unknown`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transient(_) => ErrorKind::Transient,
            _ => ErrorKind::Unknown,
        }
    }

    /// Whether the remote service reported the entity as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this is a transient failure worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether this error came from a local cancellation or timeout.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::DeadlineExceeded(_))
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Transient(msg) => msg,
            Self::Remote(msg) => msg,
            Self::Protocol(msg) => msg,
            Self::Cancelled(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::OperationFailed { state, .. } => state,
            Self::Configuration(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Transient(err.to_string())
        } else if err.is_builder() {
            Self::Configuration(err.to_string())
        } else {
            Self::Remote(err.to_string())
        }
    }
}

/// Turn a not-found failure into `Ok(None)`.
///
/// Reads use this so that a vanished remote entity becomes "no longer exists"
/// locally instead of a hard failure. Every other error passes through.
pub fn not_found_as_none<T>(result: Result<T, ProviderError>) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => {
            tracing::debug!(error = %err, "remote entity is gone");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("stack-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: stack-123");

        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::OperationFailed {
            operation: "run-1".to_string(),
            state: "FAILED".to_string(),
        };
        assert_eq!(format!("{}", err), "Operation run-1 finished in state FAILED");
    }

    #[test]
    fn test_from_remote_classifies() {
        let err = ProviderError::from_remote("stack not found");
        assert!(err.is_not_found());

        let err = ProviderError::from_remote("could not assume role arn:aws:iam::1:role/x");
        assert!(err.is_transient());

        let err = ProviderError::from_remote("something odd happened");
        assert!(matches!(err, ProviderError::Remote(_)));
        assert_eq!(err.message(), "something odd happened");
    }

    #[test]
    fn test_kind_of_local_errors_is_unknown() {
        assert_eq!(ProviderError::Protocol("x".into()).kind(), ErrorKind::Unknown);
        assert_eq!(ProviderError::Cancelled("x".into()).kind(), ErrorKind::Unknown);
        assert_eq!(ProviderError::Transient("x".into()).kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_abandoned_is_distinct_from_remote() {
        assert!(ProviderError::Cancelled("ctx".into()).is_abandoned());
        assert!(ProviderError::DeadlineExceeded("ctx".into()).is_abandoned());
        assert!(!ProviderError::Transient("ctx".into()).is_abandoned());
    }

    #[test]
    fn test_not_found_as_none() {
        let gone: Result<u32, _> = Err(ProviderError::NotFound("gone".into()));
        assert!(matches!(not_found_as_none(gone), Ok(None)));

        let present: Result<u32, ProviderError> = Ok(7);
        assert!(matches!(not_found_as_none(present), Ok(Some(7))));

        let broken: Result<u32, _> = Err(ProviderError::Validation("bad".into()));
        assert!(matches!(
            not_found_as_none(broken),
            Err(ProviderError::Validation(_))
        ));
    }
}
