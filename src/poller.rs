//! Waiting for long-running server-side operations.
//!
//! Mutations such as "create deployment" or "delete stack with resources"
//! return as soon as the remote accepts the work. [`OperationPoller`] re-reads
//! the operation state on a fixed interval until it reaches a terminal state,
//! the caller's timeout expires, or the caller cancels.
//!
//! Giving up locally never cancels the remote operation.
//!
//! # Example
//!
//! ```ignore
//! let vocabulary = StateVocabulary::new(["IN_PROGRESS"], ["FINISHED", "FAILED"])
//!     .with_failure_states(["FAILED"]);
//! let poller = OperationPoller::new(vocabulary, PollOptions::default());
//!
//! let mut handle = OperationHandle::new(run_id).with_parent(stack_id);
//! let outcome = poller
//!     .wait(&mut handle, &cancel, |handle| fetch_run_state(&client, handle.id.clone()))
//!     .await?;
//! ```

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::ProviderError;

/// State reported for an operation whose entity no longer exists.
///
/// Add it to the terminal set of operations where disappearance means
/// completion, e.g. a delete.
pub const NOT_FOUND_STATE: &str = "NOT_FOUND";

/// Shortest time allowed between two polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How the states of one kind of operation are partitioned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateVocabulary {
    pending: BTreeSet<String>,
    terminal: BTreeSet<String>,
    failed: BTreeSet<String>,
}

impl StateVocabulary {
    /// Create a vocabulary from pending and terminal states.
    pub fn new<P, T>(pending: P, terminal: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            terminal: terminal.into_iter().map(Into::into).collect(),
            failed: BTreeSet::new(),
        }
    }

    /// Mark terminal states that mean the operation failed.
    ///
    /// States not already terminal are added to the terminal set.
    pub fn with_failure_states<F>(mut self, failed: F) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
    {
        for state in failed {
            let state = state.into();
            self.terminal.insert(state.clone());
            self.failed.insert(state);
        }
        self
    }

    /// Whether the state means work is still going on.
    pub fn is_pending(&self, state: &str) -> bool {
        self.pending.contains(state)
    }

    /// Whether the state ends polling.
    pub fn is_terminal(&self, state: &str) -> bool {
        self.terminal.contains(state)
    }

    /// Whether the terminal state is a failure.
    pub fn is_failure(&self, state: &str) -> bool {
        self.failed.contains(state)
    }
}

/// Polling cadence and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Time between two polls. Values below [`MIN_POLL_INTERVAL`] are
    /// raised to it.
    pub interval: Duration,
    /// Upper bound for the whole wait.
    pub timeout: Duration,
    /// Consecutive observations of the same terminal state needed before it
    /// is accepted.
    pub stable_observations: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
            stable_observations: 1,
        }
    }
}

impl PollOptions {
    /// Create poll options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval. Values below [`MIN_POLL_INTERVAL`] are raised
    /// to it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require the terminal state to be seen `count` times in a row.
    ///
    /// Absorbs a stale "finished" reported right after an update, before the
    /// remote starts reprocessing. Zero is treated as one.
    pub fn with_stable_observations(mut self, count: u32) -> Self {
        self.stable_observations = count;
        self
    }
}

/// A remote operation being waited on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    /// Identifier of the operation.
    pub id: String,
    /// Identifier of the owning entity, if any.
    pub parent_id: Option<String>,
    /// The state seen by the most recent poll.
    pub last_state: Option<String>,
}

impl OperationHandle {
    /// Create a handle for an operation id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            last_state: None,
        }
    }

    /// Attach the owning entity.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// The accepted terminal state.
    pub state: String,
    /// Number of polls performed.
    pub polls: u32,
}

/// Polls an operation until it reaches a terminal state.
#[derive(Debug, Clone)]
pub struct OperationPoller {
    vocabulary: StateVocabulary,
    options: PollOptions,
}

impl OperationPoller {
    /// Create a poller.
    pub fn new(vocabulary: StateVocabulary, options: PollOptions) -> Self {
        Self {
            vocabulary,
            options,
        }
    }

    /// The state vocabulary.
    pub fn vocabulary(&self) -> &StateVocabulary {
        &self.vocabulary
    }

    /// The poll options.
    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Wait for the operation behind `handle` to finish.
    ///
    /// `fetch_state` reads the current remote state. The first poll happens
    /// immediately, later ones every `interval`. Returns as soon as a
    /// terminal state has been seen often enough, and fails with
    /// [`ProviderError::Cancelled`] or [`ProviderError::DeadlineExceeded`] the
    /// moment `cancel` fires or the timeout passes. No poll starts after that.
    #[instrument(skip_all, name = "operation.wait", fields(operation = %handle.id))]
    pub async fn wait<F, Fut>(
        &self,
        handle: &mut OperationHandle,
        cancel: &CancellationToken,
        fetch_state: F,
    ) -> Result<PollOutcome, ProviderError>
    where
        F: FnMut(&OperationHandle) -> Fut,
        Fut: Future<Output = Result<String, ProviderError>>,
    {
        let id = handle.id.clone();
        let timeout = self.options.timeout;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled(format!(
                "stopped waiting for operation {}; it may still be running",
                id
            ))),
            _ = tokio::time::sleep(timeout) => Err(ProviderError::DeadlineExceeded(format!(
                "operation {} did not finish within {:?}; it may still be running",
                id, timeout
            ))),
            result = self.poll_loop(handle, fetch_state) => result,
        };

        if let Err(err) = &result {
            if err.is_abandoned() {
                warn!(last_state = ?handle.last_state, error = %err, "stopped waiting");
            }
        }
        result
    }

    async fn poll_loop<F, Fut>(
        &self,
        handle: &mut OperationHandle,
        mut fetch_state: F,
    ) -> Result<PollOutcome, ProviderError>
    where
        F: FnMut(&OperationHandle) -> Fut,
        Fut: Future<Output = Result<String, ProviderError>>,
    {
        let required = self.options.stable_observations.max(1);
        let interval = self.options.interval.max(MIN_POLL_INTERVAL);
        let mut polls = 0u32;
        let mut streak = 0u32;

        loop {
            polls += 1;
            let state = match fetch_state(&*handle).await {
                Ok(state) => state,
                Err(err) if err.is_not_found() && self.vocabulary.is_terminal(NOT_FOUND_STATE) => {
                    NOT_FOUND_STATE.to_string()
                }
                Err(err) => return Err(err),
            };

            let previous = handle.last_state.replace(state.clone());
            debug!(poll = polls, state = %state, "observed operation state");

            if self.vocabulary.is_terminal(&state) {
                streak = if previous.as_deref() == Some(state.as_str()) {
                    streak + 1
                } else {
                    1
                };
                if streak >= required {
                    return self.finish(handle, state, polls);
                }
            } else if self.vocabulary.is_pending(&state) {
                streak = 0;
            } else {
                return Err(ProviderError::Protocol(format!(
                    "operation {} reported unexpected state {:?}",
                    handle.id, state
                )));
            }

            tokio::time::sleep(interval).await;
        }
    }

    fn finish(
        &self,
        handle: &OperationHandle,
        state: String,
        polls: u32,
    ) -> Result<PollOutcome, ProviderError> {
        if self.vocabulary.is_failure(&state) {
            warn!(state = %state, polls, "operation failed");
            return Err(ProviderError::OperationFailed {
                operation: handle.id.clone(),
                state,
            });
        }
        info!(state = %state, polls, "operation reached terminal state");
        Ok(PollOutcome { state, polls })
    }
}
