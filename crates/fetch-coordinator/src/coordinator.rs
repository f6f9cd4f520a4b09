//! Coordinator Implementation

use crate::error::FetchError;
use crate::transport::{GeopositionLookup, SourceFetch};
use location_resolver::LocationResolver;
use payload_parser::parse_geoposition;
use progress::ProgressTracker;
use readings::{FetchJob, Location, SourceKind};
use sample_store::SampleStore;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use task_runner::TaskRunner;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Where a source currently is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    Parsing,
    Committing,
}

/// Result of an accepted execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cycle completed; this many samples were committed
    Committed(usize),
    /// A fetch for this source was already in flight; the request was
    /// dropped. Defined no-op, not an error.
    AlreadyInFlight,
}

/// How old a cached GPS fix may be before the resolver asks for a new one.
const LOCATION_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Budget for the geoposition lookup during a location refresh.
const LOCATION_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes fetch jobs with at-most-one-in-flight per source.
pub struct FetchCoordinator {
    fetchers: HashMap<SourceKind, Arc<dyn SourceFetch>>,
    geoposition: Option<Arc<dyn GeopositionLookup>>,
    resolver: Option<LocationResolver>,
    store: SampleStore,
    progress: ProgressTracker,
    runner: TaskRunner,
    in_flight: Arc<Mutex<HashSet<SourceKind>>>,
    phases: Arc<Mutex<HashMap<SourceKind, Phase>>>,
}

impl FetchCoordinator {
    pub fn new(store: SampleStore, progress: ProgressTracker, runner: TaskRunner) -> Self {
        Self {
            fetchers: HashMap::new(),
            geoposition: None,
            resolver: None,
            store,
            progress,
            runner,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            phases: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register the transport for a source.
    pub fn register(mut self, source: SourceKind, fetcher: Arc<dyn SourceFetch>) -> Self {
        self.fetchers.insert(source, fetcher);
        self
    }

    /// Attach the location resolver used by sources that need one.
    pub fn with_resolver(mut self, resolver: LocationResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Attach the geoposition lookup used by location refreshes.
    pub fn with_geoposition(mut self, lookup: Arc<dyn GeopositionLookup>) -> Self {
        self.geoposition = Some(lookup);
        self
    }

    /// Current phase of a source's cycle.
    pub fn phase(&self, source: SourceKind) -> Phase {
        self.phases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&source)
            .copied()
            .unwrap_or_default()
    }

    fn set_phase(&self, source: SourceKind, phase: Phase) {
        self.phases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source, phase);
    }

    /// Execute one fetch job.
    ///
    /// A request for a source already in flight is dropped, not queued;
    /// the next scheduled or triggered occurrence retries naturally.
    pub async fn execute(&self, job: FetchJob) -> Result<FetchOutcome, FetchError> {
        let source = job.source;

        let _guard = match InFlightGuard::acquire(&self.in_flight, source) {
            Some(guard) => guard,
            None => {
                debug!("Fetch for {} already in flight, dropping request", source);
                return Ok(FetchOutcome::AlreadyInFlight);
            }
        };

        self.progress.set_busy(source, true);
        let result = self.run_cycle(&job).await;
        self.set_phase(source, Phase::Idle);
        self.progress.set_busy(source, false);

        match &result {
            Ok(count) => {
                self.progress.clear_error(source);
                info!("Fetch cycle for {} committed {} samples", source, count);
            }
            Err(e) => {
                self.progress.record_error(source, e.to_string());
                warn!("Fetch cycle for {} skipped: {}", source, e);
            }
        }

        result.map(FetchOutcome::Committed)
    }

    async fn run_cycle(&self, job: &FetchJob) -> Result<usize, FetchError> {
        let source = job.source;
        let fetcher = self
            .fetchers
            .get(&source)
            .cloned()
            .ok_or_else(|| FetchError::Unconfigured(source.to_string()))?;

        let location = if fetcher.needs_location() {
            Some(self.resolve_location().await)
        } else {
            None
        };

        // Network phase: runs on the worker pool, bounded by the job's
        // budget. Expiry drops the fetch future, which cancels the
        // underlying request.
        self.set_phase(source, Phase::Fetching);
        let budget = job.timeout;
        let network = self
            .runner
            .submit(async move {
                timeout(budget, fetcher.fetch(source, location.as_ref())).await
            })
            .await?;
        let raw = network
            .join()
            .await?
            .map_err(|_| FetchError::Timeout {
                target: source.to_string(),
                budget,
            })??;

        self.set_phase(source, Phase::Parsing);
        let samples = payload_parser::parse_samples(source, &raw)?;

        self.set_phase(source, Phase::Committing);
        let count = if job.clear_before_write {
            self.store.replace_source(source, samples).await?
        } else {
            self.store.append_samples(source, samples).await?
        };
        Ok(count)
    }

    /// Resolve a location for a time-bounded fetch: live fix if fresh,
    /// else cached home, else the hardcoded default.
    async fn resolve_location(&self) -> Location {
        match &self.resolver {
            Some(resolver) => resolver.resolve_or_cached(LOCATION_MAX_AGE).await,
            None => match self.store.home_location().await {
                Ok(Some(home)) => home,
                _ => Location::fallback_default(),
            },
        }
    }

    /// User-triggered location refresh: geoposition lookup for the best
    /// available coordinate, committed as the new home location.
    pub async fn refresh_location(&self) -> Result<Location, FetchError> {
        let lookup = self
            .geoposition
            .as_ref()
            .cloned()
            .ok_or_else(|| FetchError::Unconfigured("geoposition".to_string()))?;

        let seed = self.resolve_location().await;
        let raw = timeout(
            LOCATION_REFRESH_TIMEOUT,
            lookup.lookup(seed.latitude, seed.longitude),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            target: "geoposition".to_string(),
            budget: LOCATION_REFRESH_TIMEOUT,
        })??;

        let mut location = parse_geoposition(&raw)?;
        location.is_from_live_gps = seed.is_from_live_gps;
        self.store.replace_home_location(location.clone()).await?;
        info!("Home location refreshed to {}", location.display_name);
        Ok(location)
    }
}

/// Removes the source from the in-flight set when the cycle ends, on
/// every exit path.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<SourceKind>>>,
    source: SourceKind,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<SourceKind>>>, source: SourceKind) -> Option<Self> {
        let mut guard = set.lock().unwrap_or_else(|e| e.into_inner());
        if !guard.insert(source) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            source,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.source);
    }
}
