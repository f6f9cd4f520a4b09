//! Observable Pipeline State

use crate::SourceKind;
use serde::Serialize;
use std::collections::HashMap;

/// Process-wide acquisition state, observed by subscribers.
///
/// Created idle at process start, written only by the fetch coordinator,
/// never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineState {
    /// True while any source is executing a network or cache-write phase
    pub busy: bool,
    /// Most recent failure per source; cleared by the next success
    pub last_errors: HashMap<SourceKind, String>,
}

impl PipelineState {
    /// Last recorded error for a source, if any.
    pub fn last_error(&self, source: SourceKind) -> Option<&str> {
        self.last_errors.get(&source).map(String::as_str)
    }
}
