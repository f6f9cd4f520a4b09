//! Source Transports
//!
//! Concrete `SourceFetch` implementations behind the coordinator's
//! transport seam: the remote weather HTTP API and the LAN sensor
//! pub/sub link.

mod sensor;
mod weather;

pub use sensor::{SensorLink, SensorLinkConfig};
pub use weather::{WeatherApi, WeatherSource};
