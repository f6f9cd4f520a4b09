//! Fetch Scheduling
//!
//! Owns the timers that trigger fetch jobs. One timer task per source;
//! periodic jobs tick at a fixed interval measured from job start, so
//! slow cycles do not accumulate drift. Cancelling a timer never
//! interrupts a job already dispatched to the coordinator: every
//! firing, one-shot or periodic, spawns the execution separately.

use fetch_coordinator::FetchCoordinator;
use readings::{Cadence, FetchJob, SourceKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handle for a scheduled job's timer.
pub struct ScheduleHandle {
    id: Uuid,
    timer: JoinHandle<()>,
}

impl ScheduleHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop future firings. A job already dispatched keeps running.
    pub fn cancel(&self) {
        self.timer.abort();
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Owns one timer per source; the pool is bounded by the fixed set of
/// distinct sources.
pub struct Scheduler {
    coordinator: Arc<FetchCoordinator>,
    timers: Mutex<HashMap<SourceKind, ScheduleHandle>>,
}

impl Scheduler {
    pub fn new(coordinator: Arc<FetchCoordinator>) -> Self {
        Self {
            coordinator,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Schedule a job. Scheduling the same source again replaces its
    /// existing timer.
    pub fn schedule(&self, job: FetchJob) -> Uuid {
        let id = Uuid::new_v4();
        let source = job.source;
        let coordinator = Arc::clone(&self.coordinator);

        let timer = tokio::spawn(async move {
            match job.cadence {
                Cadence::None => {
                    // Detached: aborting the timer must never kill a job
                    // already handed to the coordinator.
                    tokio::spawn(dispatch(coordinator, job));
                }
                Cadence::Periodic {
                    interval,
                    initial_delay,
                } => {
                    let mut ticker = interval_at(Instant::now() + initial_delay, interval);
                    // A skipped cycle is not compensated; the next tick
                    // proceeds on its own schedule.
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        ticker.tick().await;
                        // Fire-and-forget: the tick cadence is measured
                        // from job start, not completion. If the previous
                        // run is still in flight the coordinator drops
                        // this occurrence.
                        tokio::spawn(dispatch(Arc::clone(&coordinator), job.clone()));
                    }
                }
            }
        });

        let handle = ScheduleHandle { id, timer };
        info!("Scheduled {} job {}", source, id);
        if let Some(previous) = self
            .timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source, handle)
        {
            debug!("Replacing existing timer {} for {}", previous.id, source);
        }
        id
    }

    /// Cancel the timer for a source, if one exists.
    pub fn cancel(&self, source: SourceKind) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&source)
            .is_some()
    }

    /// Cancel every timer; used at shutdown.
    pub fn cancel_all(&self) {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

async fn dispatch(coordinator: Arc<FetchCoordinator>, job: FetchJob) {
    let source = job.source;
    if let Err(e) = coordinator.execute(job).await {
        // Periodic failures are cycle-local; the next tick is independent.
        warn!("Scheduled fetch for {} failed: {}", source, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fetch_coordinator::{FetchError, SourceFetch};
    use progress::ProgressTracker;
    use readings::Location;
    use sample_store::SampleStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use task_runner::TaskRunner;

    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingFetcher {
        fn new() -> Arc<Self> {
            Self::slow(Duration::ZERO)
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
            })
        }
    }

    #[async_trait]
    impl SourceFetch for CountingFetcher {
        async fn fetch(
            &self,
            _source: SourceKind,
            _location: Option<&Location>,
        ) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(b"V1;T20.0|".to_vec())
        }
    }

    async fn scheduler_with(
        source: SourceKind,
        fetcher: Arc<CountingFetcher>,
    ) -> (Scheduler, SampleStore) {
        let store = SampleStore::open_in_memory().await.unwrap();
        let coordinator = Arc::new(
            FetchCoordinator::new(store.clone(), ProgressTracker::new(), TaskRunner::with_workers(2))
                .register(source, fetcher),
        );
        (Scheduler::new(coordinator), store)
    }

    #[tokio::test]
    async fn test_periodic_job_fires_repeatedly() {
        let source = SourceKind::LocalSensorInstant;
        let fetcher = CountingFetcher::new();
        let (scheduler, store) = scheduler_with(source, fetcher.clone()).await;

        scheduler.schedule(FetchJob::periodic(
            source,
            Duration::from_millis(20),
            Duration::ZERO,
            Duration::from_secs(1),
        ));
        tokio::time::sleep(Duration::from_millis(110)).await;
        scheduler.cancel(source);

        let calls = fetcher.calls.load(Ordering::SeqCst);
        assert!(calls >= 2, "expected at least 2 firings, got {}", calls);
        // Instant sensor appends, so the count reflects completed cycles.
        assert!(store.sample_count(source).await.unwrap() >= 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_future_firings() {
        let source = SourceKind::LocalSensorInstant;
        let fetcher = CountingFetcher::new();
        let (scheduler, _store) = scheduler_with(source, fetcher.clone()).await;

        scheduler.schedule(FetchJob::periodic(
            source,
            Duration::from_millis(20),
            Duration::ZERO,
            Duration::from_secs(1),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.cancel(source));

        let after_cancel = fetcher.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_one_shot_fires_once() {
        let source = SourceKind::LocalSensorInstant;
        let fetcher = CountingFetcher::new();
        let (scheduler, _store) = scheduler_with(source, fetcher.clone()).await;

        scheduler.schedule(FetchJob::one_shot(source, Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_does_not_interrupt_dispatched_job() {
        let source = SourceKind::LocalSensorInstant;
        let fetcher = CountingFetcher::slow(Duration::from_millis(200));
        let store = SampleStore::open_in_memory().await.unwrap();
        let progress = ProgressTracker::new();
        let coordinator = Arc::new(
            FetchCoordinator::new(store.clone(), progress.clone(), TaskRunner::with_workers(2))
                .register(source, fetcher.clone()),
        );
        let scheduler = Scheduler::new(coordinator);

        scheduler.schedule(FetchJob::one_shot(source, Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.cancel(source));
        tokio::time::sleep(Duration::from_millis(400)).await;

        // The in-flight cycle ran to completion and released the busy flag.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.sample_count(source).await.unwrap(), 1);
        assert!(!progress.current().busy);
    }

    #[tokio::test]
    async fn test_rescheduling_replaces_timer() {
        let source = SourceKind::LocalSensorInstant;
        let fetcher = CountingFetcher::new();
        let (scheduler, _store) = scheduler_with(source, fetcher).await;

        let first = scheduler.schedule(FetchJob::periodic(
            source,
            Duration::from_secs(3600),
            Duration::from_secs(3600),
            Duration::from_secs(1),
        ));
        let second = scheduler.schedule(FetchJob::periodic(
            source,
            Duration::from_secs(3600),
            Duration::from_secs(3600),
            Duration::from_secs(1),
        ));
        assert_ne!(first, second);
        // One timer slot per source remains.
        assert!(scheduler.cancel(source));
        assert!(!scheduler.cancel(source));
    }
}
