//! Hemmer GraphQL Provider
//!
//! Remote-operation orchestration for providers whose backing service speaks
//! GraphQL. Resource glue declares schemas and copies fields; this crate owns
//! everything between that glue and the wire.
//!
//! # Overview
//!
//! - **Transport**: [`GraphqlClient`] authenticates with a bearer token and
//!   executes one query or mutation per call against `<base>/graphql`
//! - **Error classification**: every failure becomes a [`ProviderError`] with a
//!   not-found / validation / transient / unknown [`ErrorKind`]
//! - **Predicates**: [`PredicateBuilder`] turns optional filter inputs into the
//!   `predicates` input of search queries
//! - **Pagination**: [`search_all`] walks `edges`/`pageInfo` connections until
//!   the last page
//! - **Polling**: [`OperationPoller`] waits for deployments, destroys and
//!   builds to reach a terminal state under a cancellable timeout
//! - **Retries**: [`retry_matching`] absorbs trust-propagation races with a
//!   fixed-delay loop
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_graphql_provider::{
//!     execute, retry, retry_matching, search_all, CancellationToken, GraphqlClient,
//!     OperationHandle, OperationPoller, PredicateBuilder, ProviderConfig, StateVocabulary,
//! };
//!
//! let config = ProviderConfig::from_value(provider_block)?.with_env_fallback();
//! let client = GraphqlClient::new(config.session()?)?;
//!
//! // List everything matching the user's filters.
//! let predicates = PredicateBuilder::new()
//!     .boolean("administrative", filters.administrative)
//!     .label_requirements("label", filters.labels)
//!     .build();
//! let stacks: Vec<Stack> = search_all(&client, &SEARCH_STACKS, &predicates, 50).await?;
//!
//! // Create a deployment once the freshly created role is assumable.
//! let created: DeploymentCreated = retry_matching(&config.retry_policy(), retry::is_transient, || {
//!     execute(&client, &create_deployment)
//! })
//! .await?;
//!
//! // Wait for the deployment to finish.
//! let poller = OperationPoller::new(
//!     StateVocabulary::new(["IN_PROGRESS"], ["FINISHED"]).with_failure_states(["FAILED"]),
//!     config.poll_options()?,
//! );
//! let mut handle = OperationHandle::new(created.id).with_parent(template_id);
//! poller
//!     .wait(&mut handle, &CancellationToken::new(), |h| deployment_state(&client, h.id.clone()))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod pagination;
pub mod poller;
pub mod predicate;
pub mod retry;
pub mod session;
pub mod testing;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use classify::{classify, ErrorKind};
pub use client::GraphqlClient;
pub use config::ProviderConfig;
pub use error::{not_found_as_none, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use pagination::{paginate, search_all, Page, SearchQuery, DEFAULT_PAGE_SIZE};
pub use poller::{
    OperationHandle, OperationPoller, PollOptions, PollOutcome, StateVocabulary,
    MIN_POLL_INTERVAL, NOT_FOUND_STATE,
};
pub use predicate::{Filter, FilterValue, Operator, Predicate, PredicateBuilder};
pub use retry::{retry_matching, RetryPolicy};
pub use session::Session;
pub use transport::{execute, Transport};
pub use types::{Nullable, OperationKind, Request, Variables};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tokio_util::sync::CancellationToken;
pub use tracing;
