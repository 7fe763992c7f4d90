//! Logging and tracing setup.
//!
//! Every orchestration step emits `tracing` events: one `graphql.execute` span
//! per remote call, one `operation.wait` span per poll loop, plus warnings for
//! retries and abandoned waits. Logs go to **stderr**, because stdout belongs
//! to the host runtime's plugin protocol.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `hemmer_graphql_provider=debug`)
//!
//! ```bash
//! # Show every GraphQL call and poll
//! RUST_LOG=hemmer_graphql_provider=debug ./my-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level used when `RUST_LOG` is not set.
pub const DEFAULT_LEVEL: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Install the default subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LEVEL);
}

/// Install the default subscriber with a custom fallback level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Install the default subscriber unless one is already set.
///
/// Returns `true` if this call installed it.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter(DEFAULT_LEVEL))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_LEVEL).is_ok());
        assert!(EnvFilter::try_new("hemmer_graphql_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_graphql_provider::poller=trace").is_ok());
    }
}
