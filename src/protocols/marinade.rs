//! Marinade Finance staking stats
//!
//! API: https://api.marinade.finance
//! - `/msol/apy/30d` → `{ "value": 0.0712 }` (fraction)
//! - `/tlv`          → `{ "total_sol": 1234567.8, ... }`

use chrono::{DateTime, Utc};
use futures::future::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::FetchError;
use crate::ingest::{Clock, Loader, RefreshCache};

const PROVIDER: &str = "marinade";

/// Shown when neither endpoint answered and nothing is cached
pub const PLACEHOLDER_ERROR: &str = "Failed to fetch live data";

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Deserialize)]
struct ApyResponse {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TlvResponse {
    total_sol: Option<f64>,
}

// ============================================
// STATS
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarinadeStats {
    pub protocol: String,
    pub token: String,
    #[serde(rename = "type")]
    pub kind: String,

    /// 30-day mSOL APY, percent
    pub apy: Option<f64>,

    /// Total SOL locked
    pub tvl: Option<f64>,

    pub description: String,
    pub risks: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stake: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unstake_delay: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl MarinadeStats {
    fn base(description: &str) -> Self {
        Self {
            protocol: "Marinade Finance".to_string(),
            token: "mSOL".to_string(),
            kind: "liquid-staking".to_string(),
            apy: None,
            tvl: None,
            description: description.to_string(),
            risks: vec!["smart-contract".to_string(), "validator-set".to_string()],
            min_stake: None,
            unstake_delay: None,
            error: None,
            fetched_at: None,
        }
    }

    pub fn live(apy: Option<f64>, tvl: Option<f64>) -> Self {
        Self {
            apy,
            tvl,
            min_stake: Some(0.0),
            unstake_delay: Some("Instant via Jupiter, or 1-2 epochs direct".to_string()),
            ..Self::base(
                "Liquid staking via mSOL - stake SOL and receive mSOL which appreciates in value",
            )
        }
    }

    pub fn placeholder() -> Self {
        Self {
            error: Some(PLACEHOLDER_ERROR.to_string()),
            ..Self::base("Liquid staking via mSOL")
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }
}

// ============================================
// CLIENT
// ============================================

pub struct MarinadeClient {
    http_client: Client,
    base_url: String,
}

impl MarinadeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::http(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| FetchError::decode(PROVIDER, e))
    }

    /// 30-day mSOL APY in percent
    pub async fn fetch_apy(&self) -> Result<Option<f64>, FetchError> {
        let body: ApyResponse = self.get_json("/msol/apy/30d").await?;
        Ok(body.value.map(|v| v * 100.0))
    }

    /// Total SOL locked
    pub async fn fetch_tvl(&self) -> Result<Option<f64>, FetchError> {
        let body: TlvResponse = self.get_json("/tlv").await?;
        Ok(body.total_sol)
    }

    /// Both endpoints concurrently. One failing endpoint only blanks its
    /// field; both failing is an error.
    pub async fn fetch_stats(&self) -> Result<MarinadeStats, FetchError> {
        let (apy, tvl) = tokio::join!(self.fetch_apy(), self.fetch_tvl());

        match (apy, tvl) {
            (Err(apy_err), Err(tvl_err)) => {
                debug!("Marinade tvl endpoint also failed: {}", tvl_err);
                Err(apy_err)
            }
            (apy, tvl) => {
                if let Err(e) = &apy {
                    warn!("Marinade APY unavailable: {}", e);
                }
                if let Err(e) = &tvl {
                    warn!("Marinade TVL unavailable: {}", e);
                }
                Ok(MarinadeStats::live(
                    apy.ok().flatten(),
                    tvl.ok().flatten(),
                ))
            }
        }
    }
}

// ============================================
// ADAPTER
// ============================================

/// Cached Marinade stats with the same TTL policy as the pool dataset
#[derive(Clone)]
pub struct MarinadeAdapter {
    cell: RefreshCache<MarinadeStats>,
}

impl MarinadeAdapter {
    pub fn new(client: MarinadeClient, clock: Arc<dyn Clock>, ttl: Duration, timeout: Duration) -> Self {
        let client = Arc::new(client);
        let loader: Loader<MarinadeStats> = Arc::new(move || {
            let client = Arc::clone(&client);
            async move { client.fetch_stats().await }.boxed()
        });

        Self {
            cell: RefreshCache::new("marinade stats", ttl, timeout, clock, loader),
        }
    }

    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            MarinadeClient::new(&config.marinade_api_url, config.http_timeout()),
            clock,
            config.cache_ttl(),
            config.refresh_timeout(),
        )
    }

    /// Current stats. Never fails: stale stats beat a placeholder, and the
    /// placeholder is never cached.
    pub async fn stats(&self) -> MarinadeStats {
        match self.cell.get().await {
            Ok(stamped) => MarinadeStats {
                fetched_at: Some(stamped.fetched_at),
                ..(*stamped.value).clone()
            },
            Err(e) => {
                warn!("⚠️  Marinade stats unavailable, using placeholder: {}", e);
                MarinadeStats::placeholder()
            }
        }
    }

    /// Number of upstream refreshes started so far
    pub fn refresh_count(&self) -> u64 {
        self.cell.loads_started()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ManualClock;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()))
    }

    fn adapter(url: String, clock: Arc<ManualClock>) -> MarinadeAdapter {
        MarinadeAdapter::new(
            MarinadeClient::new(url, Duration::from_secs(5)),
            clock,
            Duration::from_secs(300),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_live_stats() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/msol/apy/30d")
            .with_status(200)
            .with_body(r#"{"value":0.0712}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/tlv")
            .with_status(200)
            .with_body(r#"{"total_sol":5100000.5,"staked_sol":5000000}"#)
            .create_async()
            .await;

        let clock = clock();
        let stats = adapter(server.url(), clock.clone()).stats().await;

        assert!((stats.apy.unwrap() - 7.12).abs() < 1e-9);
        assert_eq!(stats.tvl, Some(5_100_000.5));
        assert_eq!(stats.error, None);
        assert_eq!(stats.fetched_at, Some(clock.now()));
    }

    #[tokio::test]
    async fn test_one_endpoint_down_blanks_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/msol/apy/30d")
            .with_status(200)
            .with_body(r#"{"value":0.07}"#)
            .create_async()
            .await;
        server.mock("GET", "/tlv").with_status(500).create_async().await;

        let stats = adapter(server.url(), clock()).stats().await;
        assert!(stats.apy.is_some());
        assert_eq!(stats.tvl, None);
        assert!(!stats.is_placeholder());
    }

    #[tokio::test]
    async fn test_cold_failure_returns_uncached_placeholder() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/msol/apy/30d").with_status(503).create_async().await;
        server.mock("GET", "/tlv").with_status(503).create_async().await;

        let marinade = adapter(server.url(), clock());
        let stats = marinade.stats().await;
        assert_eq!(stats.error.as_deref(), Some(PLACEHOLDER_ERROR));
        assert_eq!(stats.apy, None);

        // not cached: the next read tries upstream again
        marinade.stats().await;
        assert_eq!(marinade.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_stats_beat_placeholder() {
        let mut server = mockito::Server::new_async().await;
        let apy = server
            .mock("GET", "/msol/apy/30d")
            .with_status(200)
            .with_body(r#"{"value":0.065}"#)
            .create_async()
            .await;
        let tlv = server
            .mock("GET", "/tlv")
            .with_status(200)
            .with_body(r#"{"total_sol":1000}"#)
            .create_async()
            .await;

        let clock = clock();
        let marinade = adapter(server.url(), clock.clone());
        let first = marinade.stats().await;

        apy.remove_async().await;
        tlv.remove_async().await;
        clock.advance(Duration::from_secs(600));

        let served = marinade.stats().await;
        assert_eq!(served, first);
        assert_eq!(marinade.refresh_count(), 2);
    }
}
