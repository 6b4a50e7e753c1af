//! The pool dataset cache
//!
//! One normalized snapshot of every pool on the tracked chain, kept fresh on
//! a TTL through a single-flight `RefreshCache`.

use futures::future::FutureExt;
use std::sync::Arc;
use std::time::Duration;

use super::clock::Clock;
use super::normalize::{normalize_pools, NormalizeRules};
use super::refresh::{Loader, RefreshCache, Stamped};
use super::source::PoolSource;
use crate::config::Config;
use crate::errors::{YieldError, YieldResult};
use crate::types::{DatasetSnapshot, Pool};

#[derive(Clone)]
pub struct YieldCache {
    cell: RefreshCache<Vec<Pool>>,
    clock: Arc<dyn Clock>,
}

impl YieldCache {
    pub fn new(source: Arc<dyn PoolSource>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self::with_settings(
            source,
            clock,
            NormalizeRules {
                chain: config.tracked_chain.clone(),
                min_tvl_usd: config.min_pool_tvl_usd,
            },
            config.cache_ttl(),
            config.refresh_timeout(),
        )
    }

    pub fn with_settings(
        source: Arc<dyn PoolSource>,
        clock: Arc<dyn Clock>,
        rules: NormalizeRules,
        ttl: Duration,
        refresh_timeout: Duration,
    ) -> Self {
        let rules = Arc::new(rules);
        let loader: Loader<Vec<Pool>> = Arc::new(move || {
            let source = Arc::clone(&source);
            let rules = Arc::clone(&rules);
            async move {
                let raw = source.fetch_pools().await?;
                Ok(normalize_pools(raw, &rules))
            }
            .boxed()
        });

        Self {
            cell: RefreshCache::new("pool dataset", ttl, refresh_timeout, clock.clone(), loader),
            clock,
        }
    }

    /// Current snapshot, refreshed first when stale.
    ///
    /// A failed refresh falls back to the previous snapshot; with nothing
    /// cached it is `NoCachedData`.
    pub async fn snapshot(&self) -> YieldResult<DatasetSnapshot> {
        self.cell
            .get()
            .await
            .map(into_snapshot)
            .map_err(|source| YieldError::NoCachedData { source })
    }

    /// Current snapshot without refreshing
    pub async fn peek(&self) -> Option<DatasetSnapshot> {
        self.cell.peek().await.map(into_snapshot)
    }

    /// Mark the current snapshot stale
    pub async fn invalidate(&self) {
        self.cell.invalidate().await;
    }

    pub fn ttl(&self) -> Duration {
        self.cell.ttl()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of upstream refreshes started so far
    pub fn refresh_count(&self) -> u64 {
        self.cell.loads_started()
    }
}

fn into_snapshot(stamped: Stamped<Vec<Pool>>) -> DatasetSnapshot {
    DatasetSnapshot {
        pools: stamped.value,
        fetched_at: stamped.fetched_at,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::errors::FetchError;
    use crate::ingest::source::RawPool;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory pool source with a call counter and a failure switch
    pub struct FakeSource {
        pub rows: Mutex<Vec<RawPool>>,
        pub calls: AtomicUsize,
        pub failing: AtomicBool,
        pub delay: Duration,
    }

    impl FakeSource {
        pub fn new(rows: Vec<RawPool>) -> Self {
            Self {
                rows: Mutex::new(rows),
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                delay: Duration::ZERO,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PoolSource for FakeSource {
        async fn fetch_pools(&self) -> Result<Vec<RawPool>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Status {
                    provider: "defillama".to_string(),
                    status: 502,
                });
            }
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    pub fn solana_row(id: &str, project: &str, symbol: &str, tvl: f64, apy: Option<f64>) -> RawPool {
        RawPool {
            chain: Some("Solana".to_string()),
            project: Some(project.to_string()),
            symbol: Some(symbol.to_string()),
            pool: Some(id.to_string()),
            tvl_usd: Some(tvl),
            apy,
            apy_base: apy,
            il_risk: Some("no".to_string()),
            stablecoin: Some(false),
            exposure: Some("single".to_string()),
            ..Default::default()
        }
    }
}
