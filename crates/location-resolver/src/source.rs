//! Positioning Source Abstraction

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Positioning errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PositionError {
    /// The platform denied access to positioning
    #[error("Location permission denied")]
    PermissionDenied,
    /// The positioning service is not usable right now
    #[error("Positioning unavailable: {0}")]
    Unavailable(String),
}

/// A raw position fix from the platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub taken_at: DateTime<Utc>,
}

impl GeoFix {
    /// Age of the fix relative to now.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.taken_at)
            .max(ChronoDuration::zero())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// External positioning device or platform service.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// The most recent fix the platform already holds, without starting
    /// a new acquisition.
    async fn last_known_fix(&self) -> Result<Option<GeoFix>, PositionError>;

    /// Request a single fresh fix. Delivery is asynchronous and may
    /// never happen; the receiver is dropped in that case.
    fn request_fix(&self) -> oneshot::Receiver<GeoFix>;
}

/// Positioning source for deployments with no GPS hardware or
/// permission. Every resolution falls through to the cached-home and
/// default tiers.
pub struct DeniedPositioning;

#[async_trait]
impl PositionSource for DeniedPositioning {
    async fn last_known_fix(&self) -> Result<Option<GeoFix>, PositionError> {
        Err(PositionError::PermissionDenied)
    }

    fn request_fix(&self) -> oneshot::Receiver<GeoFix> {
        let (_tx, rx) = oneshot::channel();
        rx
    }
}
