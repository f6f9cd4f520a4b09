//! Resolver Implementation

use crate::source::{PositionError, PositionSource};
use readings::Location;
use sample_store::SampleStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Outcome of a resolution attempt
pub enum Resolution {
    /// A usable location, available now
    Resolved(Location),
    /// A fresh fix was requested; the receiver completes if and when it
    /// arrives. The home location in the store is refreshed either way.
    Pending(oneshot::Receiver<Location>),
}

/// Resolves locations with live → cached home → default fallback.
#[derive(Clone)]
pub struct LocationResolver {
    source: Arc<dyn PositionSource>,
    store: SampleStore,
}

impl LocationResolver {
    pub fn new(source: Arc<dyn PositionSource>, store: SampleStore) -> Self {
        Self { source, store }
    }

    /// Resolve a location whose fix is at most `max_age` old.
    ///
    /// Returns synchronously in every case: either a usable location or
    /// a pending marker for an in-flight one-shot fix request.
    pub async fn resolve(&self, max_age: Duration) -> Resolution {
        let fix = match self.source.last_known_fix().await {
            Ok(fix) => fix,
            Err(PositionError::PermissionDenied) => {
                debug!("Positioning permission unavailable, using fallback tiers");
                return Resolution::Resolved(self.cached_or_default().await);
            }
            Err(e) => {
                warn!("Positioning source failed: {}", e);
                return Resolution::Resolved(self.cached_or_default().await);
            }
        };

        if let Some(fix) = fix {
            if fix.age() <= max_age {
                debug!("Using live GPS fix aged {:?}", fix.age());
                return Resolution::Resolved(Location::from_fix(fix.latitude, fix.longitude));
            }
        }

        // Stale or absent fix: ask for one update and hand back a pending
        // marker. The update, if it arrives, refreshes the stored home
        // location for later cycles.
        let fix_rx = self.source.request_fix();
        let (tx, rx) = oneshot::channel();
        let store = self.store.clone();
        tokio::spawn(async move {
            let Ok(fix) = fix_rx.await else {
                debug!("One-shot fix request went unanswered");
                return;
            };
            let location = Location::from_fix(fix.latitude, fix.longitude);
            if let Err(e) = store.replace_home_location(location.clone().as_home()).await {
                warn!("Failed to refresh home location: {}", e);
            } else {
                info!("Home location refreshed from live fix");
            }
            let _ = tx.send(location);
        });

        Resolution::Pending(rx)
    }

    /// Resolve for a time-bounded caller: a pending fix collapses to the
    /// cached-home/default tier instead of blocking.
    pub async fn resolve_or_cached(&self, max_age: Duration) -> Location {
        match self.resolve(max_age).await {
            Resolution::Resolved(location) => location,
            Resolution::Pending(_) => self.cached_or_default().await,
        }
    }

    /// Cached home location, or the hardcoded default coordinate.
    pub async fn cached_or_default(&self) -> Location {
        match self.store.home_location().await {
            Ok(Some(home)) => home,
            Ok(None) => Location::fallback_default(),
            Err(e) => {
                warn!("Home location lookup failed: {}", e);
                Location::fallback_default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::GeoFix;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use readings::{LocationKind, DEFAULT_LOCATION_NAME};
    use std::sync::Mutex;

    struct FakePositioning {
        fix: Mutex<Option<GeoFix>>,
        permission: bool,
        /// Fix delivered asynchronously after a one-shot request
        update: Mutex<Option<GeoFix>>,
    }

    impl FakePositioning {
        fn new(fix: Option<GeoFix>, permission: bool) -> Self {
            Self {
                fix: Mutex::new(fix),
                permission,
                update: Mutex::new(None),
            }
        }

        fn with_update(self, fix: GeoFix) -> Self {
            *self.update.lock().unwrap() = Some(fix);
            self
        }
    }

    #[async_trait]
    impl PositionSource for FakePositioning {
        async fn last_known_fix(&self) -> Result<Option<GeoFix>, PositionError> {
            if !self.permission {
                return Err(PositionError::PermissionDenied);
            }
            Ok(*self.fix.lock().unwrap())
        }

        fn request_fix(&self) -> oneshot::Receiver<GeoFix> {
            let (tx, rx) = oneshot::channel();
            if let Some(fix) = *self.update.lock().unwrap() {
                let _ = tx.send(fix);
            }
            rx
        }
    }

    fn fix_aged(seconds: i64) -> GeoFix {
        GeoFix {
            latitude: 40.989,
            longitude: 29.025,
            taken_at: Utc::now() - ChronoDuration::seconds(seconds),
        }
    }

    async fn resolver_with(source: FakePositioning) -> (LocationResolver, SampleStore) {
        let store = SampleStore::open_in_memory().await.unwrap();
        (LocationResolver::new(Arc::new(source), store.clone()), store)
    }

    #[tokio::test]
    async fn test_fresh_fix_resolves_live() {
        let (resolver, _store) = resolver_with(FakePositioning::new(Some(fix_aged(10)), true)).await;

        match resolver.resolve(Duration::from_secs(60)).await {
            Resolution::Resolved(loc) => {
                assert!(loc.is_from_live_gps);
                assert!((loc.latitude - 40.989).abs() < 1e-9);
            }
            Resolution::Pending(_) => panic!("expected immediate resolution"),
        }
    }

    #[tokio::test]
    async fn test_stale_fix_falls_back_to_cached_home() {
        let (resolver, store) = resolver_with(FakePositioning::new(Some(fix_aged(3600)), true)).await;
        store
            .replace_home_location(Location {
                code: Some("318251".to_string()),
                display_name: "Kadikoy".to_string(),
                latitude: 40.98,
                longitude: 29.02,
                is_from_live_gps: false,
                kind: LocationKind::Home,
            })
            .await
            .unwrap();

        // The stale fix must not be used; the bounded path takes the
        // cached home instead.
        let loc = resolver.resolve_or_cached(Duration::from_secs(60)).await;
        assert!(!loc.is_from_live_gps);
        assert_eq!(loc.display_name, "Kadikoy");
    }

    #[tokio::test]
    async fn test_no_fix_no_home_yields_default() {
        let (resolver, _store) = resolver_with(FakePositioning::new(None, true)).await;
        let loc = resolver.resolve_or_cached(Duration::from_secs(60)).await;
        assert_eq!(loc.display_name, DEFAULT_LOCATION_NAME);
    }

    #[tokio::test]
    async fn test_permission_denied_uses_default() {
        let (resolver, _store) = resolver_with(FakePositioning::new(Some(fix_aged(1)), false)).await;
        match resolver.resolve(Duration::from_secs(60)).await {
            Resolution::Resolved(loc) => assert_eq!(loc.display_name, DEFAULT_LOCATION_NAME),
            Resolution::Pending(_) => panic!("permission denial must resolve synchronously"),
        }
    }

    #[tokio::test]
    async fn test_pending_update_refreshes_home() {
        let source = FakePositioning::new(None, true).with_update(fix_aged(0));
        let (resolver, store) = resolver_with(source).await;

        match resolver.resolve(Duration::from_secs(60)).await {
            Resolution::Pending(rx) => {
                let delivered = rx.await.unwrap();
                assert!(delivered.is_from_live_gps);
            }
            Resolution::Resolved(_) => panic!("expected pending resolution"),
        }

        // The async delivery path persists the fix as the new home.
        let mut home = store.home_location().await.unwrap();
        for _ in 0..50 {
            if home.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            home = store.home_location().await.unwrap();
        }
        let home = home.expect("home location refreshed");
        assert!(home.is_from_live_gps);
        assert_eq!(home.kind, LocationKind::Home);
    }
}
