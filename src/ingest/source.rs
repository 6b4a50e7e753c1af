//! Pool-yield provider adapter (DefiLlama `/pools`)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::errors::FetchError;

const PROVIDER: &str = "defillama";

// ============================================
// RESPONSE TYPES
// ============================================

/// One pool exactly as the provider reports it. Everything is optional; the
/// provider omits fields freely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPool {
    pub chain: Option<String>,
    pub project: Option<String>,
    pub symbol: Option<String>,
    /// Upstream pool key
    pub pool: Option<String>,
    pub tvl_usd: Option<f64>,
    pub apy: Option<f64>,
    pub apy_base: Option<f64>,
    pub apy_reward: Option<f64>,
    pub reward_tokens: Option<Vec<String>>,
    pub underlying_tokens: Option<Vec<String>>,
    pub pool_meta: Option<String>,
    pub il_risk: Option<String>,
    pub stablecoin: Option<bool>,
    pub exposure: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlamaResponse {
    #[serde(default)]
    status: Option<String>,
    data: Vec<RawPool>,
}

// ============================================
// POOL SOURCE
// ============================================

/// Anything that can hand back the raw pool list
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn fetch_pools(&self) -> Result<Vec<RawPool>, FetchError>;
}

pub struct DefiLlamaClient {
    http_client: Client,
    url: String,
}

impl DefiLlamaClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PoolSource for DefiLlamaClient {
    async fn fetch_pools(&self) -> Result<Vec<RawPool>, FetchError> {
        let started = Instant::now();
        debug!("📡 Fetching pools from {}", self.url);

        let response = self
            .http_client
            .get(&self.url)
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

        let body: LlamaResponse = response
            .json()
            .await
            .map_err(|e| FetchError::decode(PROVIDER, e))?;

        info!(
            "📊 DefiLlama returned {} pools in {:?} (status: {})",
            body.data.len(),
            started.elapsed(),
            body.status.as_deref().unwrap_or("n/a")
        );

        Ok(body.data)
    }
}
