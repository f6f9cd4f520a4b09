//! Station Pipeline - Main Entry Point

use api::{init_logging, run_server, AppState, Settings};
use fetch_coordinator::FetchCoordinator;
use fetch_scheduler::Scheduler;
use location_resolver::{DeniedPositioning, LocationResolver};
use progress::ProgressTracker;
use readings::{FetchJob, SourceKind};
use sample_store::SampleStore;
use sources::{SensorLink, SensorLinkConfig, WeatherApi, WeatherSource};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use task_runner::TaskRunner;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Station Pipeline v{} ===", env!("CARGO_PKG_VERSION"));
    let settings = Settings::load()?;

    let store = SampleStore::open(Path::new(&settings.database.path)).await?;
    let progress = ProgressTracker::new();
    let runner = TaskRunner::new();

    let weather_api = WeatherApi::new(&settings.weather.base_url, &settings.weather.api_key)?;
    let weather_source = Arc::new(WeatherSource::new(weather_api.clone(), store.clone()));
    let resolver = LocationResolver::new(Arc::new(DeniedPositioning), store.clone());

    let mut coordinator = FetchCoordinator::new(store.clone(), progress.clone(), runner)
        .with_resolver(resolver)
        .with_geoposition(Arc::new(weather_api))
        .register(SourceKind::RemoteWeatherHourly, weather_source.clone())
        .register(SourceKind::RemoteWeatherTwelveHour, weather_source);

    // The sensor link is optional at startup; without a reachable broker
    // the two LAN sources simply stay unconfigured.
    let sensor_config = SensorLinkConfig {
        host: settings.mqtt.host.clone(),
        port: settings.mqtt.port,
        client_id: settings.mqtt.client_id.clone(),
        device_id: settings.mqtt.device_id.clone(),
    };
    match SensorLink::connect(sensor_config).await {
        Ok(link) => {
            let link = Arc::new(link);
            coordinator = coordinator
                .register(SourceKind::LocalSensorHourly, link.clone())
                .register(SourceKind::LocalSensorInstant, link);
        }
        Err(e) => warn!("Sensor link unavailable: {}", e),
    }

    let coordinator = Arc::new(coordinator);
    let scheduler = Scheduler::new(Arc::clone(&coordinator));

    let timeout = settings.jobs.fetch_timeout();
    let jobs = [
        (
            SourceKind::RemoteWeatherHourly,
            settings.jobs.weather_hourly_interval_secs,
        ),
        (
            SourceKind::RemoteWeatherTwelveHour,
            settings.jobs.weather_twelve_hour_interval_secs,
        ),
        (
            SourceKind::LocalSensorHourly,
            settings.jobs.sensor_hourly_interval_secs,
        ),
        (
            SourceKind::LocalSensorInstant,
            settings.jobs.sensor_instant_interval_secs,
        ),
    ];
    // Stagger first firings so startup does not burst all four sources.
    for (slot, (source, interval_secs)) in jobs.into_iter().enumerate() {
        scheduler.schedule(FetchJob::periodic(
            source,
            Duration::from_secs(interval_secs),
            Duration::from_secs(5 * slot as u64),
            timeout,
        ));
    }

    let state = Arc::new(AppState::new(store, coordinator, progress, timeout));
    let result = run_server(&settings.http.bind, state).await;

    scheduler.cancel_all();
    result
}
