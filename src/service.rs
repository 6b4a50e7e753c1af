//! Composition layer
//!
//! `YieldService` wires the dataset cache, the Marinade adapter and the
//! advisor together and exposes the operations a request layer calls.
//! Built once at startup and shared by handle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::advisor::{Advisor, RecommendationSet, RiskTier};
use crate::config::Config;
use crate::errors::{YieldError, YieldResult};
use crate::ingest::{Clock, DefiLlamaClient, PoolSource, SystemClock, YieldCache};
use crate::portfolio::{Portfolio, PortfolioSource};
use crate::protocols::{MarinadeAdapter, MarinadeStats};
use crate::query::{self, PoolFilters};
use crate::types::{DatasetSnapshot, Pool, ProtocolRollup};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolOverview {
    pub protocols: Vec<ProtocolRollup>,
    pub marinade_detail: MarinadeStats,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldsOverview {
    pub top_yields: Vec<Pool>,
    pub marinade: MarinadeStats,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct YieldService {
    cache: YieldCache,
    marinade: MarinadeAdapter,
    advisor: Arc<Advisor>,
}

impl YieldService {
    pub fn new(cache: YieldCache, marinade: MarinadeAdapter, advisor: Advisor) -> Self {
        Self {
            cache,
            marinade,
            advisor: Arc::new(advisor),
        }
    }

    /// Production wiring: DefiLlama + Marinade over HTTP, wall clock
    pub fn from_config(config: &Config) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let source: Arc<dyn PoolSource> =
            Arc::new(DefiLlamaClient::new(&config.yields_url, config.http_timeout()));

        info!(
            "🔧 Yield service: {} pools via {} (TTL {:?})",
            config.tracked_chain,
            config.yields_url,
            config.cache_ttl()
        );

        Self::new(
            YieldCache::new(source, clock.clone(), config),
            MarinadeAdapter::from_config(config, clock),
            Advisor::from_config(config),
        )
    }

    pub fn cache(&self) -> &YieldCache {
        &self.cache
    }

    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    pub async fn snapshot(&self) -> YieldResult<DatasetSnapshot> {
        self.cache.snapshot().await
    }

    /// Highest-APY pools. A negative `limit` is rejected; zero is empty.
    pub async fn get_top_yields(&self, limit: i64, filters: &PoolFilters) -> YieldResult<Vec<Pool>> {
        let limit = checked_limit(limit)?;
        filters.validate()?;

        let snapshot = self.cache.snapshot().await?;
        Ok(query::top_yields(&snapshot.pools, limit, filters))
    }

    pub async fn search(&self, query: &str) -> YieldResult<Vec<Pool>> {
        if query.trim().is_empty() {
            return Err(YieldError::InvalidFilter(
                "search query must not be empty".to_string(),
            ));
        }

        let snapshot = self.cache.snapshot().await?;
        query::search(&snapshot.pools, query)
    }

    pub async fn marinade_stats(&self) -> MarinadeStats {
        self.marinade.stats().await
    }

    /// Per-protocol rollup plus live Marinade detail
    pub async fn get_protocol_overview(&self) -> YieldResult<ProtocolOverview> {
        let (snapshot, marinade) = tokio::join!(self.cache.snapshot(), self.marinade.stats());
        let snapshot = snapshot?;

        Ok(ProtocolOverview {
            protocols: query::protocol_rollup(&snapshot.pools),
            marinade_detail: marinade,
            fetched_at: snapshot.fetched_at,
        })
    }

    /// Top pools plus live Marinade stats
    pub async fn get_all_yields(&self, limit: i64, filters: &PoolFilters) -> YieldResult<YieldsOverview> {
        let limit = checked_limit(limit)?;
        filters.validate()?;

        let (snapshot, marinade) = tokio::join!(self.cache.snapshot(), self.marinade.stats());
        let snapshot = snapshot?;

        Ok(YieldsOverview {
            top_yields: query::top_yields(&snapshot.pools, limit, filters),
            marinade,
            fetched_at: snapshot.fetched_at,
        })
    }

    pub async fn get_recommendations(
        &self,
        portfolio: &Portfolio,
        tier: RiskTier,
    ) -> YieldResult<RecommendationSet> {
        let snapshot = self
            .cache
            .snapshot()
            .await
            .map_err(|e| YieldError::CandidateFetch { source: Box::new(e) })?;

        let candidates = self.advisor.candidates(&snapshot.pools, tier);
        debug!("{} candidate pools for {} tier", candidates.len(), tier);

        Ok(self
            .advisor
            .recommend(portfolio, tier, &candidates, self.cache.clock().now()))
    }

    /// Fetch the wallet's portfolio, then recommend
    pub async fn recommend_for_wallet(
        &self,
        source: &dyn PortfolioSource,
        wallet: &str,
        tier: RiskTier,
    ) -> YieldResult<RecommendationSet> {
        let portfolio = source.fetch_portfolio(wallet).await?;
        self.get_recommendations(&portfolio, tier).await
    }
}

fn checked_limit(limit: i64) -> YieldResult<usize> {
    usize::try_from(limit)
        .map_err(|_| YieldError::InvalidFilter(format!("limit must not be negative, got {}", limit)))
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::ingest::yield_cache::test_support::{solana_row, FakeSource};
    use crate::ingest::ManualClock;
    use crate::portfolio::Holding;
    use crate::protocols::MarinadeClient;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::time::Duration;

    fn rows() -> Vec<crate::ingest::RawPool> {
        let mut usdc = solana_row("usdc", "kamino-lend", "USDC-USDT", 40_000_000.0, Some(9.0));
        usdc.stablecoin = Some(true);
        vec![
            usdc,
            solana_row("vault", "usdc-vault", "XYZ", 2_000_000.0, Some(4.0)),
            solana_row("msol", "marinade-finance", "MSOL", 800_000_000.0, Some(7.0)),
            solana_row("dust", "orca", "SOL-USDC", 9_000.0, Some(80.0)),
        ]
    }

    fn service_with(marinade_url: String) -> (YieldService, Arc<FakeSource>, Arc<ManualClock>) {
        let config = Config::default();
        let source = Arc::new(FakeSource::new(rows()));
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));

        let service = YieldService::new(
            YieldCache::new(source.clone(), clock.clone(), &config),
            MarinadeAdapter::new(
                MarinadeClient::new(marinade_url, Duration::from_secs(2)),
                clock.clone(),
                config.cache_ttl(),
                config.refresh_timeout(),
            ),
            Advisor::from_config(&config),
        );
        (service, source, clock)
    }

    fn service() -> (YieldService, Arc<FakeSource>, Arc<ManualClock>) {
        service_with("http://127.0.0.1:9".to_string())
    }

    #[tokio::test]
    async fn test_top_yields_limit_validation() {
        let (service, source, _clock) = service();

        assert!(matches!(
            service.get_top_yields(-1, &PoolFilters::default()).await,
            Err(YieldError::InvalidFilter(_))
        ));
        assert_eq!(source.calls(), 0);

        assert!(tokio_test::assert_ok!(service.get_top_yields(0, &PoolFilters::default()).await).is_empty());

        let top = tokio_test::assert_ok!(service.get_top_yields(2, &PoolFilters::default()).await);
        let ids: Vec<_> = top.iter().map(|p| p.pool_id.as_str()).collect();
        assert_eq!(ids, vec!["usdc", "msol"]);
    }

    #[tokio::test]
    async fn test_top_yields_stable_only() {
        let (service, _source, _clock) = service();
        let filters = PoolFilters { stable_only: true, ..Default::default() };
        let top = service.get_top_yields(5, &filters).await.unwrap();
        assert_eq!(top.len(), 1);
        assert!(top.iter().all(|p| p.stablecoin));
    }

    #[tokio::test]
    async fn test_search_validates_before_fetch() {
        let (service, source, _clock) = service();

        assert!(matches!(service.search("").await, Err(YieldError::InvalidFilter(_))));
        assert_eq!(source.calls(), 0);

        let hits = service.search("USDC").await.unwrap();
        let ids: Vec<_> = hits.iter().map(|p| p.pool_id.as_str()).collect();
        assert_eq!(ids, vec!["usdc", "vault"]);
    }

    #[tokio::test]
    async fn test_protocol_overview_merges_marinade() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/msol/apy/30d")
            .with_status(200)
            .with_body(r#"{"value":0.07}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/tlv")
            .with_status(200)
            .with_body(r#"{"total_sol":42}"#)
            .create_async()
            .await;

        let (service, _source, clock) = service_with(server.url());
        let overview = service.get_protocol_overview().await.unwrap();

        let projects: Vec<_> = overview.protocols.iter().map(|r| r.project.as_str()).collect();
        assert_eq!(projects, vec!["marinade-finance", "kamino-lend", "usdc-vault"]);
        assert_eq!(overview.marinade_detail.tvl, Some(42.0));
        assert_eq!(overview.fetched_at, clock.now());
    }

    #[tokio::test]
    async fn test_all_yields_with_marinade_down() {
        let (service, _source, _clock) = service();
        let all = service.get_all_yields(10, &PoolFilters::default()).await.unwrap();
        assert_eq!(all.top_yields.len(), 3);
        assert!(all.marinade.is_placeholder());
    }

    #[tokio::test]
    async fn test_recommendations_cold_failure_is_candidate_fetch() {
        let (service, source, _clock) = service();
        source.fail(true);

        let portfolio = Portfolio::from_holdings(
            "w",
            vec![Holding::from_token(crate::tokens::NATIVE_SOL_MINT, 10.0, 200.0)],
        );
        let err = service
            .get_recommendations(&portfolio, RiskTier::Medium)
            .await
            .unwrap_err();

        assert!(matches!(err, YieldError::CandidateFetch { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_recommendations_use_clock() {
        let (service, _source, clock) = service();
        clock.advance(Duration::from_secs(42));

        let portfolio = Portfolio::from_holdings(
            "w",
            vec![Holding::from_token(crate::tokens::NATIVE_SOL_MINT, 10.0, 200.0)],
        );
        let set = service.get_recommendations(&portfolio, RiskTier::Low).await.unwrap();

        assert_eq!(set.generated_at, clock.now());
        assert_eq!(set.recommendations[0].suggested_protocol, "marinade-finance");
        assert!((set.total_potential_annual_gain - 140.0).abs() < 0.01);
    }

    struct FailingPortfolios;

    #[async_trait]
    impl PortfolioSource for FailingPortfolios {
        async fn fetch_portfolio(&self, _wallet: &str) -> Result<Portfolio, FetchError> {
            Err(FetchError::http("helius", "rate limited"))
        }
    }

    #[tokio::test]
    async fn test_wallet_fetch_failure_is_upstream_fetch() {
        let (service, _source, _clock) = service();
        let err = tokio_test::assert_err!(
            service
                .recommend_for_wallet(&FailingPortfolios, "wallet", RiskTier::High)
                .await
        );
        assert!(matches!(err, YieldError::UpstreamFetch(_)));
    }
}
