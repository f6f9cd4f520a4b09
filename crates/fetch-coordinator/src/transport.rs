//! Transport Abstraction
//!
//! The pipeline does not implement its own network transport; it only
//! requires that an externally supplied client can perform a request
//! within a timeout budget. Concrete implementations live in the
//! `sources` crate.

use crate::error::FetchError;
use async_trait::async_trait;
use readings::{Location, SourceKind};

/// One data source's raw-payload transport.
#[async_trait]
pub trait SourceFetch: Send + Sync {
    /// Whether this source needs a resolved location before fetching.
    fn needs_location(&self) -> bool {
        false
    }

    /// Perform the network phase and return the raw payload.
    ///
    /// The coordinator wraps this call in the job's timeout budget;
    /// implementations must release the underlying request when the
    /// future is dropped.
    async fn fetch(
        &self,
        source: SourceKind,
        location: Option<&Location>,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Geoposition lookup against the remote provider, used by the
/// user-triggered location refresh.
#[async_trait]
pub trait GeopositionLookup: Send + Sync {
    /// Fetch the raw geoposition payload for a coordinate.
    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Vec<u8>, FetchError>;
}
