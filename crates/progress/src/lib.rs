//! Progress Tracking
//!
//! Publishes the pipeline's busy/idle state to any number of observers.
//! Backed by a watch channel, so a new subscriber immediately sees the
//! current state rather than waiting for the next transition.

use readings::{PipelineState, SourceKind};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

struct TrackerInner {
    busy_sources: HashSet<SourceKind>,
    state: PipelineState,
}

/// Shared tracker handle. Written only by the fetch coordinator; read by
/// any number of subscribers.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<TrackerInner>>,
    tx: Arc<watch::Sender<PipelineState>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PipelineState::default());
        Self {
            inner: Arc::new(Mutex::new(TrackerInner {
                busy_sources: HashSet::new(),
                state: PipelineState::default(),
            })),
            tx: Arc::new(tx),
        }
    }

    /// Mark a source busy or idle. `busy` is the union over all sources.
    pub fn set_busy(&self, source: SourceKind, busy: bool) {
        let state = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if busy {
                inner.busy_sources.insert(source);
            } else {
                inner.busy_sources.remove(&source);
            }
            inner.state.busy = !inner.busy_sources.is_empty();
            inner.state.clone()
        };
        debug!("Source {} busy={}, pipeline busy={}", source, busy, state.busy);
        self.tx.send_replace(state);
    }

    /// Record the terminal error of a failed cycle.
    pub fn record_error(&self, source: SourceKind, message: impl Into<String>) {
        let state = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.state.last_errors.insert(source, message.into());
            inner.state.clone()
        };
        self.tx.send_replace(state);
    }

    /// Clear a source's recorded error after a successful cycle.
    pub fn clear_error(&self, source: SourceKind) {
        let state = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.state.last_errors.remove(&source);
            inner.state.clone()
        };
        self.tx.send_replace(state);
    }

    /// Subscribe to state transitions. The receiver starts out holding
    /// the current state.
    pub fn observe(&self) -> watch::Receiver<PipelineState> {
        self.tx.subscribe()
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> PipelineState {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .state
            .clone()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
