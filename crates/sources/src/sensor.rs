//! LAN Sensor Pub/Sub Link
//!
//! Subscribes to the sensor device's fixed topic set over MQTT and
//! keeps the latest payload per topic. A fetch hands back the cached
//! payload, or waits for the first one to arrive; the coordinator's
//! timeout budget bounds the wait.

use async_trait::async_trait;
use fetch_coordinator::{FetchError, SourceFetch};
use readings::{Location, SourceKind};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// Sensor link configuration
#[derive(Debug, Clone)]
pub struct SensorLinkConfig {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// MQTT client id
    pub client_id: String,
    /// Device id embedded in the `devices/<id>/..` topics
    pub device_id: String,
}

impl Default for SensorLinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "station-pipeline".to_string(),
            device_id: "esp01".to_string(),
        }
    }
}

impl SensorLinkConfig {
    /// The fixed topic set the link subscribes to.
    fn topics(&self) -> Vec<String> {
        vec![
            format!("devices/{}/value", self.device_id),
            format!("devices/{}/mode", self.device_id),
            format!("devices/{}/status", self.device_id),
            "sensors/json".to_string(),
            "sensors/json/hourly".to_string(),
            "sensors/json/instant".to_string(),
            "general".to_string(),
        ]
    }
}

/// Connected sensor link; `SourceFetch` for both LAN sensor sources.
#[derive(Clone)]
pub struct SensorLink {
    latest: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    arrived: Arc<Notify>,
}

impl SensorLink {
    /// Connect to the broker and start the background event loop.
    pub async fn connect(config: SensorLinkConfig) -> Result<Self, FetchError> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        for topic in config.topics() {
            client
                .subscribe(topic.clone(), QoS::AtLeastOnce)
                .await
                .map_err(|e| FetchError::network(topic.as_str(), e.to_string()))?;
        }

        let link = Self {
            latest: Arc::new(Mutex::new(HashMap::new())),
            arrived: Arc::new(Notify::new()),
        };

        let loop_link = link.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        debug!("Sensor payload on {}", publish.topic);
                        loop_link.record(publish.topic.clone(), publish.payload.to_vec());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Sensor link error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        info!("Sensor link connected to {}:{}", config.host, config.port);
        Ok(link)
    }

    fn record(&self, topic: String, payload: Vec<u8>) {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(topic, payload);
        self.arrived.notify_waiters();
    }

    fn cached(&self, topic: &str) -> Option<Vec<u8>> {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .cloned()
    }

    fn topic_for(source: SourceKind) -> Option<&'static str> {
        match source {
            SourceKind::LocalSensorHourly => Some("sensors/json/hourly"),
            SourceKind::LocalSensorInstant => Some("sensors/json/instant"),
            _ => None,
        }
    }

    /// Link with no broker behind it; payloads are injected directly.
    #[cfg(test)]
    fn detached() -> Self {
        Self {
            latest: Arc::new(Mutex::new(HashMap::new())),
            arrived: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl SourceFetch for SensorLink {
    async fn fetch(
        &self,
        source: SourceKind,
        _location: Option<&Location>,
    ) -> Result<Vec<u8>, FetchError> {
        let topic = Self::topic_for(source)
            .ok_or_else(|| FetchError::Unconfigured(source.to_string()))?;

        // Wait for the first payload if none has arrived yet. The
        // notified future is created before the cache check so an
        // arrival between the two is not missed.
        loop {
            let arrived = self.arrived.notified();
            if let Some(payload) = self.cached(topic) {
                return Ok(payload);
            }
            arrived.await;
        }
    }
}
