//! Fetch Job Descriptions

use crate::SourceKind;
use std::time::Duration;

/// How often a job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// One-shot: runs once, typically user-triggered
    None,
    /// Recurring: first run after `initial_delay`, then every `interval`
    /// measured from job start
    Periodic {
        interval: Duration,
        initial_delay: Duration,
    },
}

/// Describes one scheduled unit of acquisition work
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub source: SourceKind,
    pub cadence: Cadence,
    /// Budget for the network phase; expiry abandons the attempt
    pub timeout: Duration,
    /// Whether a successful fetch replaces all prior samples of this
    /// source (snapshot window) or appends (continuous history)
    pub clear_before_write: bool,
}

impl FetchJob {
    /// One-shot job with the source's default write policy.
    pub fn one_shot(source: SourceKind, timeout: Duration) -> Self {
        Self {
            source,
            cadence: Cadence::None,
            timeout,
            clear_before_write: default_clear_policy(source),
        }
    }

    /// Periodic job with the source's default write policy.
    pub fn periodic(
        source: SourceKind,
        interval: Duration,
        initial_delay: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            cadence: Cadence::Periodic {
                interval,
                initial_delay,
            },
            timeout,
            clear_before_write: default_clear_policy(source),
        }
    }
}

/// Snapshot sources hold only the latest window; the instant sensor feed
/// accumulates history.
fn default_clear_policy(source: SourceKind) -> bool {
    match source {
        SourceKind::RemoteWeatherHourly
        | SourceKind::RemoteWeatherTwelveHour
        | SourceKind::LocalSensorHourly => true,
        SourceKind::LocalSensorInstant => false,
    }
}
