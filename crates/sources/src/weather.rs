//! Remote Weather HTTP Source

use async_trait::async_trait;
use fetch_coordinator::{FetchError, GeopositionLookup, SourceFetch};
use payload_parser::parse_geoposition;
use readings::{Location, SourceKind, DEFAULT_LATITUDE, DEFAULT_LONGITUDE};
use sample_store::SampleStore;
use tracing::{debug, info};

/// Thin client for the remote weather provider.
///
/// The client carries no request timeout of its own; the coordinator
/// bounds every call with the job's budget and cancels by dropping the
/// future.
#[derive(Clone)]
pub struct WeatherApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::network("weather-api", e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// One-hour forecast for a provider location code.
    pub async fn hourly_forecast(&self, code: &str) -> Result<Vec<u8>, FetchError> {
        self.forecast("1hour", code).await
    }

    /// Twelve-hour forecast for a provider location code.
    pub async fn twelve_hour_forecast(&self, code: &str) -> Result<Vec<u8>, FetchError> {
        self.forecast("12hour", code).await
    }

    async fn forecast(&self, window: &str, code: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/forecasts/v1/hourly/{}/{}", self.base_url, window, code);
        debug!("GET {}", url);
        self.get(&url, &[("apikey", self.api_key.as_str()), ("metric", "true")])
            .await
    }

    /// Geoposition lookup: coordinate to provider location record.
    pub async fn geoposition(&self, latitude: f64, longitude: f64) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/locations/v1/cities/geoposition/search", self.base_url);
        let q = format!("{},{}", latitude, longitude);
        debug!("GET {} q={}", url, q);
        self.get(&url, &[("apikey", self.api_key.as_str()), ("q", q.as_str())])
            .await
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e.to_string()))?
            .error_for_status()
            .map_err(|e| FetchError::network(url, e.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url, e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl GeopositionLookup for WeatherApi {
    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Vec<u8>, FetchError> {
        self.geoposition(latitude, longitude).await
    }
}

/// `SourceFetch` for the two remote weather cadences.
///
/// Forecast endpoints are keyed by a provider location code. When the
/// resolved location has none yet (a bare GPS fix or the hardcoded
/// default), a geoposition lookup fills it in and the discovered record
/// becomes the new home location.
pub struct WeatherSource {
    api: WeatherApi,
    store: SampleStore,
}

impl WeatherSource {
    pub fn new(api: WeatherApi, store: SampleStore) -> Self {
        Self { api, store }
    }

    async fn location_code(&self, location: Option<&Location>) -> Result<String, FetchError> {
        if let Some(code) = location.and_then(|l| l.code.clone()) {
            return Ok(code);
        }

        let (latitude, longitude, live) = match location {
            Some(l) => (l.latitude, l.longitude, l.is_from_live_gps),
            None => (DEFAULT_LATITUDE, DEFAULT_LONGITUDE, false),
        };
        let raw = self.api.geoposition(latitude, longitude).await?;
        let mut home = parse_geoposition(&raw)?;
        home.is_from_live_gps = live;
        self.store.replace_home_location(home.clone()).await?;
        info!("Resolved location code for {}", home.display_name);

        home.code
            .ok_or_else(|| FetchError::network("geoposition", "provider returned no location code"))
    }
}

#[async_trait]
impl SourceFetch for WeatherSource {
    fn needs_location(&self) -> bool {
        true
    }

    async fn fetch(
        &self,
        source: SourceKind,
        location: Option<&Location>,
    ) -> Result<Vec<u8>, FetchError> {
        let code = self.location_code(location).await?;
        match source {
            SourceKind::RemoteWeatherHourly => self.api.hourly_forecast(&code).await,
            SourceKind::RemoteWeatherTwelveHour => self.api.twelve_hour_forecast(&code).await,
            other => Err(FetchError::Unconfigured(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readings::LocationKind;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn home(code: Option<&str>) -> Location {
        Location {
            code: code.map(str::to_string),
            display_name: "Kadikoy".to_string(),
            latitude: 40.989,
            longitude: 29.025,
            is_from_live_gps: false,
            kind: LocationKind::Home,
        }
    }

    fn hourly_body() -> serde_json::Value {
        json!([{
            "DateTime": "2024-01-01T00:00:00Z",
            "Temperature": {"Value": "5", "Unit": "C"},
            "Link": "http://example/detail"
        }])
    }

    #[tokio::test]
    async fn test_hourly_forecast_with_known_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecasts/v1/hourly/1hour/318251"))
            .and(query_param("apikey", "k"))
            .and(query_param("metric", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hourly_body()))
            .expect(1)
            .mount(&server)
            .await;

        let api = WeatherApi::new(server.uri(), "k").unwrap();
        let store = SampleStore::open_in_memory().await.unwrap();
        let source = WeatherSource::new(api, store);

        let loc = home(Some("318251"));
        let raw = source
            .fetch(SourceKind::RemoteWeatherHourly, Some(&loc))
            .await
            .unwrap();
        let samples = payload_parser::parse_samples(SourceKind::RemoteWeatherHourly, &raw).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].celsius, Some(5.0));
    }

    #[tokio::test]
    async fn test_missing_code_triggers_geoposition_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locations/v1/cities/geoposition/search"))
            .and(query_param("q", "40.989,29.025"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Key": "318251",
                "LocalizedName": "Kadikoy",
                "GeoPosition": {"Latitude": 40.989, "Longitude": 29.025}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecasts/v1/hourly/12hour/318251"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hourly_body()))
            .expect(1)
            .mount(&server)
            .await;

        let api = WeatherApi::new(server.uri(), "k").unwrap();
        let store = SampleStore::open_in_memory().await.unwrap();
        let source = WeatherSource::new(api, store.clone());

        let loc = home(None);
        source
            .fetch(SourceKind::RemoteWeatherTwelveHour, Some(&loc))
            .await
            .unwrap();

        // The discovered provider record became the new home location.
        let persisted = store.home_location().await.unwrap().unwrap();
        assert_eq!(persisted.code.as_deref(), Some("318251"));
        assert_eq!(persisted.display_name, "Kadikoy");
    }

    #[tokio::test]
    async fn test_server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = WeatherApi::new(server.uri(), "k").unwrap();
        let store = SampleStore::open_in_memory().await.unwrap();
        let source = WeatherSource::new(api, store);

        let loc = home(Some("318251"));
        let err = source
            .fetch(SourceKind::RemoteWeatherHourly, Some(&loc))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[tokio::test]
    async fn test_geoposition_lookup_trait() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locations/v1/cities/geoposition/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Key": "101",
                "LocalizedName": "Mitte",
                "GeoPosition": {"Latitude": 52.52, "Longitude": 13.405}
            })))
            .mount(&server)
            .await;

        let api = WeatherApi::new(server.uri(), "k").unwrap();
        let raw = api.lookup(52.52, 13.405).await.unwrap();
        let loc = parse_geoposition(&raw).unwrap();
        assert_eq!(loc.code.as_deref(), Some("101"));
    }
}
