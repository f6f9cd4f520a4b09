//! Fetch Error Taxonomy

use payload_parser::ParseError;
use sample_store::StoreError;
use std::time::Duration;
use task_runner::TaskError;
use thiserror::Error;

/// Terminal errors of one fetch cycle.
///
/// None of these are fatal to the process: a periodic job records the
/// error and the next scheduled cycle proceeds independently; a
/// user-triggered job surfaces it to the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection-level failure in the network phase
    #[error("Network error for {target}: {detail}")]
    Network { target: String, detail: String },

    /// The network phase exceeded the timeout budget
    #[error("Fetch for {target} timed out after {budget:?}")]
    Timeout { target: String, budget: Duration },

    /// The payload was rejected; nothing was cached
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The store commit failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The worker pool is shut down
    #[error("Task runner error: {0}")]
    Runner(#[from] TaskError),

    /// No transport is registered for the target
    #[error("No transport configured for {0}")]
    Unconfigured(String),
}

impl FetchError {
    /// Network-phase failure against a named target.
    pub fn network(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Network {
            target: target.into(),
            detail: detail.into(),
        }
    }
}
