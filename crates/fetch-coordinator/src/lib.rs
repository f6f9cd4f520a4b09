//! Fetch Coordination
//!
//! Executes one fetch job end to end: dedup against in-flight work,
//! location resolution where the source needs it, the network phase on
//! the task runner bounded by the job's timeout budget, parsing, and the
//! store commit under the configured write policy. Publishes busy/idle
//! transitions and per-source errors to the progress tracker.

mod coordinator;
mod error;
mod transport;

pub use coordinator::{FetchCoordinator, FetchOutcome, Phase};
pub use error::FetchError;
pub use transport::{GeopositionLookup, SourceFetch};
