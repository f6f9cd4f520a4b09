//! Common Record Types
//!
//! Shared data model for the reading acquisition pipeline:
//! sources, samples, locations, fetch jobs, and the observable
//! pipeline state.

mod job;
mod location;
mod sample;
mod state;

pub use job::{Cadence, FetchJob};
pub use location::{Location, LocationKind, DEFAULT_LOCATION_NAME, DEFAULT_LATITUDE, DEFAULT_LONGITUDE};
pub use sample::{Sample, SourceKind, SourceKindParseError};
pub use state::PipelineState;
