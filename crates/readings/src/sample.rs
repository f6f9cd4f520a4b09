//! Sample Records and Source Identification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies where a reading came from.
///
/// The pipeline handles a small fixed set of sources: two remote
/// weather cadences and two LAN sensor feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    RemoteWeatherHourly,
    RemoteWeatherTwelveHour,
    LocalSensorHourly,
    LocalSensorInstant,
}

impl SourceKind {
    /// All sources the pipeline acquires from.
    pub const ALL: [SourceKind; 4] = [
        SourceKind::RemoteWeatherHourly,
        SourceKind::RemoteWeatherTwelveHour,
        SourceKind::LocalSensorHourly,
        SourceKind::LocalSensorInstant,
    ];

    /// Stable string form, used for API paths and the store's source column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteWeatherHourly => "remote-weather-hourly",
            Self::RemoteWeatherTwelveHour => "remote-weather-twelve-hour",
            Self::LocalSensorHourly => "local-sensor-hourly",
            Self::LocalSensorInstant => "local-sensor-instant",
        }
    }

    /// Whether the source is served by the remote weather API (as opposed
    /// to the LAN sensor link).
    pub fn is_remote_weather(&self) -> bool {
        matches!(self, Self::RemoteWeatherHourly | Self::RemoteWeatherTwelveHour)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a source kind from its string form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKindParseError(pub String);

impl fmt::Display for SourceKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source kind: {}", self.0)
    }
}

impl std::error::Error for SourceKindParseError {}

impl FromStr for SourceKind {
    type Err = SourceKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote-weather-hourly" => Ok(Self::RemoteWeatherHourly),
            "remote-weather-twelve-hour" => Ok(Self::RemoteWeatherTwelveHour),
            "local-sensor-hourly" => Ok(Self::LocalSensorHourly),
            "local-sensor-instant" => Ok(Self::LocalSensorInstant),
            other => Err(SourceKindParseError(other.to_string())),
        }
    }
}

/// One observation, as committed to the store.
///
/// `seq` is assigned by the store at insertion and is strictly increasing
/// within a source partition. Records are superseded, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Insertion order, 0 until the store assigns it
    pub seq: i64,
    /// Which feed produced this reading
    pub source: SourceKind,
    /// Source-reported observation time, or arrival time when absent
    pub time: DateTime<Utc>,
    /// Temperature in Celsius, absent for non-thermal readings
    pub celsius: Option<f64>,
    /// Opaque reference carried from the payload (e.g. a detail link)
    pub reference: Option<String>,
}

impl Sample {
    /// Create an unsequenced sample; the store fills in `seq` on insert.
    pub fn new(source: SourceKind, time: DateTime<Utc>, celsius: Option<f64>) -> Self {
        Self {
            seq: 0,
            source,
            time,
            celsius,
            reference: None,
        }
    }

    /// Attach a payload reference.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}
