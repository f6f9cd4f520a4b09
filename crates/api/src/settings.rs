//! Runtime Settings
//!
//! Layered configuration: built-in defaults, an optional `station.toml`
//! next to the binary, then `STATION__*` environment overrides.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub http: HttpSettings,
    pub database: DatabaseSettings,
    pub weather: WeatherSettings,
    pub mqtt: MqttSettings,
    pub jobs: JobSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub device_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobSettings {
    /// Network budget per fetch, seconds
    pub fetch_timeout_secs: u64,
    pub weather_hourly_interval_secs: u64,
    pub weather_twelve_hour_interval_secs: u64,
    pub sensor_hourly_interval_secs: u64,
    pub sensor_instant_interval_secs: u64,
}

impl JobSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Settings {
    /// Load settings from defaults, file, and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("http.bind", "0.0.0.0:8080")?
            .set_default("database.path", "station.db")?
            .set_default("weather.base_url", "https://dataservice.accuweather.com")?
            .set_default("weather.api_key", "")?
            .set_default("mqtt.host", "localhost")?
            .set_default("mqtt.port", 1883)?
            .set_default("mqtt.client_id", "station-pipeline")?
            .set_default("mqtt.device_id", "esp01")?
            .set_default("jobs.fetch_timeout_secs", 10)?
            .set_default("jobs.weather_hourly_interval_secs", 3600)?
            .set_default("jobs.weather_twelve_hour_interval_secs", 4 * 3600)?
            .set_default("jobs.sensor_hourly_interval_secs", 3600)?
            .set_default("jobs.sensor_instant_interval_secs", 300)?
            .add_source(File::with_name("station").required(false))
            .add_source(Environment::with_prefix("STATION").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load() {
        let settings = Settings::load().unwrap();
        assert!(!settings.http.bind.is_empty());
        assert_eq!(settings.mqtt.port, 1883);
        assert_eq!(settings.jobs.fetch_timeout(), Duration::from_secs(10));
    }
}
