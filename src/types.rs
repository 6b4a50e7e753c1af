//! Core pool dataset types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A single yield-bearing position tracked by the pool-yield provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    /// Opaque upstream key
    pub pool_id: String,

    /// Protocol name (e.g. "marinade-finance")
    pub project: String,

    /// Display symbol, ticker segments joined by '-'
    pub symbol: String,

    pub tvl_usd: f64,

    /// Absent is meaningful: the provider has no yield figure
    pub apy: Option<f64>,
    pub apy_base: Option<f64>,
    pub apy_reward: Option<f64>,

    /// "yes" when the pool carries impermanent-loss exposure
    pub il_risk: Option<String>,
    pub stablecoin: bool,
    pub exposure: Option<String>,

    pub reward_tokens: Option<Vec<String>>,
    pub underlying_tokens: Option<Vec<String>>,
    pub pool_meta: Option<String>,
}

impl Pool {
    /// APY with absent treated as 0. Only for ordering and rollup averages.
    pub fn apy_or_zero(&self) -> f64 {
        self.apy.unwrap_or(0.0)
    }

    pub fn has_il_risk(&self) -> bool {
        self.il_risk.as_deref() == Some("yes")
    }

    /// Case-insensitive substring match against the symbol
    pub fn symbol_mentions(&self, needle: &str) -> bool {
        self.symbol.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// One normalized view of every pool on the tracked chain
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub pools: Arc<Vec<Pool>>,
    pub fetched_at: DateTime<Utc>,
}

impl DatasetSnapshot {
    pub fn new(pools: Vec<Pool>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            pools: Arc::new(pools),
            fetched_at,
        }
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Age of the snapshot at `now`; zero if the clock went backwards
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or_default()
    }
}

/// Per-protocol aggregate over a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolRollup {
    pub project: String,
    pub pool_count: usize,
    pub total_tvl: f64,
    pub avg_apy: f64,
    pub max_apy: f64,
}


#[cfg(test)]
mod tests {
    use super::fixtures::pool;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_absent_apy_is_zero_for_ordering_only() {
        let p = pool("a", "orca", "SOL-USDC", 50_000.0, None);
        assert_eq!(p.apy, None);
        assert_eq!(p.apy_or_zero(), 0.0);
    }

    #[test]
    fn test_symbol_helpers() {
        let p = pool("a", "orca", "JitoSOL-USDC", 50_000.0, Some(4.0));
        assert!(p.symbol_mentions("sol"));
        assert!(p.symbol_mentions("jitosol"));
        assert!(!p.symbol_mentions("bonk"));
    }

    #[test]
    fn test_il_risk_tag() {
        let mut p = pool("a", "raydium-amm", "SOL-USDC", 50_000.0, Some(20.0));
        assert!(!p.has_il_risk());
        p.il_risk = Some("yes".to_string());
        assert!(p.has_il_risk());
        p.il_risk = None;
        assert!(!p.has_il_risk());
    }

    #[test]
    fn test_snapshot_age() {
        let fetched = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let snapshot = DatasetSnapshot::new(vec![], fetched);
        let later = Utc.with_ymd_and_hms(2024, 5, 1, 12, 10, 0).unwrap();
        assert_eq!(snapshot.age(later), Duration::from_secs(600));
        let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert_eq!(snapshot.age(earlier), Duration::ZERO);
        assert!(snapshot.is_empty());
    }
}
