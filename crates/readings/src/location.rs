//! Resolved Geographic References

use serde::{Deserialize, Serialize};

/// Fallback coordinate used when neither a live fix nor a cached Home
/// location is available.
pub const DEFAULT_LATITUDE: f64 = 52.52;
pub const DEFAULT_LONGITUDE: f64 = 13.405;
pub const DEFAULT_LOCATION_NAME: &str = "Berlin";

/// Role of a location row in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// The single persisted home location; replaced wholesale, never merged
    Home,
    /// A short-lived resolution that is not persisted as home
    Transient,
}

/// A resolved geographic reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Provider-assigned location id, absent until a geoposition lookup ran
    pub code: Option<String>,
    /// Human-readable name
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Whether this came from a live GPS fix rather than cache or default
    pub is_from_live_gps: bool,
    pub kind: LocationKind,
}

impl Location {
    /// The hardcoded default coordinate, used as the last fallback tier.
    pub fn fallback_default() -> Self {
        Self {
            code: None,
            display_name: DEFAULT_LOCATION_NAME.to_string(),
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            is_from_live_gps: false,
            kind: LocationKind::Transient,
        }
    }

    /// A location built from a live GPS fix, not yet known to the provider.
    pub fn from_fix(latitude: f64, longitude: f64) -> Self {
        Self {
            code: None,
            display_name: String::new(),
            latitude,
            longitude,
            is_from_live_gps: true,
            kind: LocationKind::Transient,
        }
    }

    /// Re-tag this location as the persisted home snapshot.
    pub fn as_home(mut self) -> Self {
        self.kind = LocationKind::Home;
        self
    }
}
