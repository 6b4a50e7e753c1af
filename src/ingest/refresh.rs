//! Single-flight TTL cache cell
//!
//! Holds one value stamped with the time it was fetched. A read that finds
//! the value missing or older than the TTL starts a refresh through the
//! loader; reads arriving while that refresh is running await the same
//! shared future instead of calling upstream again. A failed refresh keeps
//! the previous value, so callers get stale data rather than an error once
//! anything has been loaded.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use super::clock::Clock;
use crate::errors::FetchError;

/// Produces a fresh value from upstream
pub type Loader<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;

type Refresh<T> = Shared<BoxFuture<'static, Result<Stamped<T>, FetchError>>>;

/// A cached value plus the time it was fetched
#[derive(Debug)]
pub struct Stamped<T> {
    pub value: Arc<T>,
    pub fetched_at: DateTime<Utc>,
}

impl<T> Clone for Stamped<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            fetched_at: self.fetched_at,
        }
    }
}

struct State<T> {
    current: Option<Stamped<T>>,
    in_flight: Option<Refresh<T>>,
    invalidated: bool,
}

struct Inner<T> {
    name: String,
    ttl: Duration,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    loader: Loader<T>,
    state: Mutex<State<T>>,
    loads_started: AtomicU64,
}

impl<T: Send + Sync + 'static> Inner<T> {
    fn is_fresh(&self, stamped: &Stamped<T>, now: DateTime<Utc>) -> bool {
        match (now - stamped.fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            // fetched "in the future": clock moved backwards, keep it
            Err(_) => true,
        }
    }

    fn start_refresh(inner: &Arc<Self>) -> Refresh<T> {
        let inner = Arc::clone(inner);
        let attempt = inner.loads_started.fetch_add(1, Ordering::SeqCst) + 1;

        async move {
            debug!("🔄 Refreshing {} (load #{})", inner.name, attempt);
            let started = Instant::now();

            let outcome = match tokio::time::timeout(inner.timeout, (inner.loader)()).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    provider: inner.name.clone(),
                    timeout: inner.timeout,
                }),
            };

            let mut state = inner.state.lock().await;
            state.in_flight = None;

            match outcome {
                Ok(value) => {
                    let stamped = Stamped {
                        value: Arc::new(value),
                        fetched_at: inner.clock.now(),
                    };
                    state.current = Some(stamped.clone());
                    state.invalidated = false;
                    info!("✓ {} refreshed in {:?}", inner.name, started.elapsed());
                    Ok(stamped)
                }
                Err(e) => {
                    warn!("{} refresh failed after {:?}: {}", inner.name, started.elapsed(), e);
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Cheap to clone; clones share the same cell
pub struct RefreshCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RefreshCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> RefreshCache<T> {
    pub fn new(
        name: impl Into<String>,
        ttl: Duration,
        timeout: Duration,
        clock: Arc<dyn Clock>,
        loader: Loader<T>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                ttl,
                timeout,
                clock,
                loader,
                state: Mutex::new(State {
                    current: None,
                    in_flight: None,
                    invalidated: false,
                }),
                loads_started: AtomicU64::new(0),
            }),
        }
    }

    /// Current value, refreshing first if it is missing or stale.
    ///
    /// Errors only when the refresh fails and nothing was ever loaded.
    pub async fn get(&self) -> Result<Stamped<T>, FetchError> {
        let refresh = {
            let mut state = self.inner.state.lock().await;
            let now = self.inner.clock.now();

            if let Some(current) = &state.current {
                if !state.invalidated && self.inner.is_fresh(current, now) {
                    trace!("Using cached {} from {}", self.inner.name, current.fetched_at);
                    return Ok(current.clone());
                }
            }

            match state.in_flight.clone() {
                Some(refresh) => {
                    trace!("Joining in-flight {} refresh", self.inner.name);
                    refresh
                }
                None => {
                    let refresh = Inner::start_refresh(&self.inner);
                    state.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        match refresh.await {
            Ok(fresh) => Ok(fresh),
            Err(err) => {
                let state = self.inner.state.lock().await;
                match &state.current {
                    Some(stale) => {
                        warn!(
                            "⚠️  Serving stale {} fetched at {} ({})",
                            self.inner.name, stale.fetched_at, err
                        );
                        Ok(stale.clone())
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Current value without triggering a refresh
    pub async fn peek(&self) -> Option<Stamped<T>> {
        self.inner.state.lock().await.current.clone()
    }

    /// Force the next read to refresh. The current value stays available as
    /// a fallback.
    pub async fn invalidate(&self) {
        self.inner.state.lock().await.invalidated = true;
    }

    /// Number of upstream loads started so far
    pub fn loads_started(&self) -> u64 {
        self.inner.loads_started.load(Ordering::SeqCst)
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::clock::ManualClock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    struct Upstream {
        calls: AtomicUsize,
        failing: AtomicBool,
        delay: Duration,
    }

    fn counting_cache(
        delay: Duration,
        timeout: Duration,
    ) -> (RefreshCache<usize>, Arc<Upstream>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        ));
        let upstream = Arc::new(Upstream {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay,
        });

        let source = Arc::clone(&upstream);
        let loader: Loader<usize> = Arc::new(move || {
            let source = Arc::clone(&source);
            async move {
                let n = source.calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(source.delay).await;
                if source.failing.load(Ordering::SeqCst) {
                    Err(FetchError::http("test", "boom"))
                } else {
                    Ok(n)
                }
            }
            .boxed()
        });

        let cache = RefreshCache::new(
            "test data",
            Duration::from_secs(300),
            timeout,
            clock.clone(),
            loader,
        );
        (cache, upstream, clock)
    }

    #[tokio::test]
    async fn test_fresh_value_is_reused() {
        let (cache, upstream, clock) = counting_cache(Duration::ZERO, Duration::from_secs(5));

        let first = cache.get().await.unwrap();
        clock.advance(Duration::from_secs(60));
        let second = cache.get().await.unwrap();

        assert_eq!(*first.value, 1);
        assert_eq!(*second.value, 1);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_value_triggers_refresh() {
        let (cache, upstream, clock) = counting_cache(Duration::ZERO, Duration::from_secs(5));

        cache.get().await.unwrap();
        clock.advance(Duration::from_secs(300));
        let refreshed = cache.get().await.unwrap();

        assert_eq!(*refreshed.value, 2);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.fetched_at, clock.now());
    }

    #[tokio::test]
    async fn test_concurrent_readers_share_one_refresh() {
        let (cache, upstream, _clock) =
            counting_cache(Duration::from_millis(50), Duration::from_secs(5));

        let readers = (0..16).map(|_| cache.get());
        let results = futures::future::join_all(readers).await;

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loads_started(), 1);
        for result in results {
            assert_eq!(*result.unwrap().value, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_share_one_refresh() {
        let (cache, upstream, clock) =
            counting_cache(Duration::from_millis(100), Duration::from_secs(5));

        cache.get().await.unwrap();
        clock.advance(Duration::from_secs(301));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.await.unwrap().unwrap().value, 2);
        }
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_readers_share_one_failure() {
        let (cache, upstream, _clock) =
            counting_cache(Duration::from_millis(20), Duration::from_secs(5));
        upstream.failing.store(true, Ordering::SeqCst);

        let results = futures::future::join_all((0..5).map(|_| cache.get())).await;

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.is_err()));
        assert!(cache.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_stale_value() {
        let (cache, upstream, clock) = counting_cache(Duration::ZERO, Duration::from_secs(5));

        let original = cache.get().await.unwrap();
        upstream.failing.store(true, Ordering::SeqCst);
        clock.advance(Duration::from_secs(600));

        let served = cache.get().await.unwrap();
        assert_eq!(*served.value, 1);
        assert_eq!(served.fetched_at, original.fetched_at);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let (cache, _upstream, _clock) =
            counting_cache(Duration::from_millis(500), Duration::from_millis(20));

        match cache.get().await {
            Err(FetchError::Timeout { provider, .. }) => assert_eq!(provider, "test data"),
            other => panic!("expected timeout, got {:?}", other.map(|s| *s.value)),
        }

        // The timed-out refresh no longer blocks new ones
        assert_eq!(cache.loads_started(), 1);
        let _ = cache.get().await;
        assert_eq!(cache.loads_started(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let (cache, upstream, _clock) = counting_cache(Duration::ZERO, Duration::from_secs(5));

        cache.get().await.unwrap();
        cache.invalidate().await;
        assert_eq!(*cache.peek().await.unwrap().value, 1);

        let refreshed = cache.get().await.unwrap();
        assert_eq!(*refreshed.value, 2);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }
}
