//! Configuration for SolYield
//!
//! Every tunable of the dataset cache and the recommendation engine lives
//! here: upstream endpoints, the dust threshold, cache TTL, the risk-tier
//! table and the advisor thresholds.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::advisor::RiskTierTable;

// ============================================
// DEFAULTS
// ============================================

/// DefiLlama yields endpoint
pub const DEFAULT_YIELDS_URL: &str = "https://yields.llama.fi/pools";

/// Marinade public API
pub const DEFAULT_MARINADE_API_URL: &str = "https://api.marinade.finance";

/// Chain name as DefiLlama spells it
pub const DEFAULT_TRACKED_CHAIN: &str = "Solana";

/// Pools at or below this TVL are dust/test pools
pub const DEFAULT_MIN_POOL_TVL_USD: f64 = 10_000.0;

/// 5 minutes
pub const DEFAULT_CACHE_TTL_MS: u64 = 300_000;

// ============================================
// ADVISOR SETTINGS
// ============================================

/// Thresholds and allowlists used by the recommendation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Symbol of the chain's native asset
    pub native_symbol: String,

    /// Holdings below this USD value are not worth a suggestion
    pub idle_threshold_usd: f64,

    /// Projects treated as liquid-staking providers for idle native assets
    pub lst_protocols: Vec<String>,

    /// APY quoted when no liquid-staking pool is in the candidate set
    pub fallback_lst_apy: f64,
    pub fallback_lst_protocol: String,
    pub fallback_lst_pool: String,

    /// An alternative LST must beat the current one by more than this (percentage points)
    pub better_yield_margin_pct: f64,

    /// LP opportunities must yield more than this APY
    pub lp_min_apy: f64,

    /// Maximum LP suggestions per request
    pub lp_max_suggestions: usize,

    /// Portfolios at or below this value get no LP suggestions
    pub lp_min_portfolio_usd: f64,

    /// Size of the risk-scoped candidate set
    pub candidate_limit: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            native_symbol: "SOL".to_string(),
            idle_threshold_usd: 10.0,
            lst_protocols: vec![
                "marinade-finance".to_string(),
                "jito".to_string(),
                "blazestake".to_string(),
                "sanctum".to_string(),
            ],
            fallback_lst_apy: 7.0,
            fallback_lst_protocol: "marinade-finance".to_string(),
            fallback_lst_pool: "mSOL".to_string(),
            better_yield_margin_pct: 1.0,
            lp_min_apy: 15.0,
            lp_max_suggestions: 3,
            lp_min_portfolio_usd: 100.0,
            candidate_limit: 100,
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Upstream Endpoints ==========
    /// Pool-yield provider endpoint
    pub yields_url: String,

    /// Marinade API base URL
    pub marinade_api_url: String,

    /// Per-request HTTP timeout
    pub http_timeout_secs: u64,

    // ========== Dataset Cache ==========
    /// Only pools on this chain are kept
    pub tracked_chain: String,

    /// Dust threshold applied at normalization
    pub min_pool_tvl_usd: f64,

    /// Snapshot time-to-live
    pub cache_ttl_ms: u64,

    /// Upper bound on one upstream refresh
    pub refresh_timeout_secs: u64,

    // ========== Recommendation Engine ==========
    pub advisor: AdvisorConfig,
    pub risk_tiers: RiskTierTable,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let mut advisor = defaults.advisor.clone();

        if let Ok(list) = env::var("LST_PROTOCOLS") {
            advisor.lst_protocols = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        advisor.better_yield_margin_pct = env::var("BETTER_YIELD_MARGIN_PCT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(advisor.better_yield_margin_pct);
        advisor.fallback_lst_apy = env::var("FALLBACK_LST_APY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(advisor.fallback_lst_apy);

        Ok(Self {
            yields_url: env::var("YIELDS_URL")
                .unwrap_or_else(|_| DEFAULT_YIELDS_URL.to_string()),
            marinade_api_url: env::var("MARINADE_API_URL")
                .unwrap_or_else(|_| DEFAULT_MARINADE_API_URL.to_string()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            tracked_chain: env::var("TRACKED_CHAIN")
                .unwrap_or_else(|_| DEFAULT_TRACKED_CHAIN.to_string()),
            min_pool_tvl_usd: env::var("MIN_POOL_TVL_USD")
                .unwrap_or_else(|_| DEFAULT_MIN_POOL_TVL_USD.to_string())
                .parse()
                .unwrap_or(DEFAULT_MIN_POOL_TVL_USD),
            cache_ttl_ms: env::var("CACHE_TTL_MS")
                .unwrap_or_else(|_| DEFAULT_CACHE_TTL_MS.to_string())
                .parse()
                .unwrap_or(DEFAULT_CACHE_TTL_MS),
            refresh_timeout_secs: env::var("REFRESH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            advisor,
            risk_tiers: defaults.risk_tiers,
        })
    }

    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Validate configuration before wiring the engine
    pub fn validate(&self) -> Result<()> {
        if self.yields_url.is_empty() || self.marinade_api_url.is_empty() {
            return Err(eyre!("Upstream endpoints must not be empty"));
        }
        if self.tracked_chain.trim().is_empty() {
            return Err(eyre!("TRACKED_CHAIN must name a chain"));
        }
        if !self.min_pool_tvl_usd.is_finite() || self.min_pool_tvl_usd < 0.0 {
            return Err(eyre!(
                "MIN_POOL_TVL_USD must be a non-negative number (currently {})",
                self.min_pool_tvl_usd
            ));
        }
        if self.cache_ttl_ms == 0 {
            return Err(eyre!("CACHE_TTL_MS must be greater than zero"));
        }
        if self.refresh_timeout_secs == 0 || self.http_timeout_secs == 0 {
            return Err(eyre!("Timeouts must be greater than zero"));
        }

        let advisor = &self.advisor;
        if advisor.lst_protocols.is_empty() {
            return Err(eyre!("LST_PROTOCOLS must list at least one protocol"));
        }
        if advisor.better_yield_margin_pct < 0.0 || advisor.fallback_lst_apy < 0.0 {
            return Err(eyre!(
                "Advisor thresholds must be non-negative (margin {:.2}, fallback APY {:.2})",
                advisor.better_yield_margin_pct,
                advisor.fallback_lst_apy
            ));
        }
        if advisor.candidate_limit == 0 {
            return Err(eyre!("candidate_limit must be greater than zero"));
        }

        for (tier, policy) in self.risk_tiers.iter() {
            if !policy.min_tvl_usd.is_finite() || policy.min_tvl_usd < 0.0 {
                return Err(eyre!(
                    "Risk tier '{}' has an invalid TVL floor: {}",
                    tier,
                    policy.min_tvl_usd
                ));
            }
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║               SOLYIELD - CONFIGURATION                     ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Tracked Chain:     {:^40} ║", self.tracked_chain);
        println!("║ Dust Threshold:    ${:<39.0} ║", self.min_pool_tvl_usd);
        println!("║ Cache TTL:         {:>37} ms ║", self.cache_ttl_ms);
        println!("║ Refresh Timeout:   {:>38} s ║", self.refresh_timeout_secs);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ RISK TIERS                                                 ║");
        for (tier, policy) in self.risk_tiers.iter() {
            println!(
                "║ • {:<7} min TVL ${:<16.0} IL allowed: {:<13} ║",
                tier.to_string(),
                policy.min_tvl_usd,
                if policy.allow_impermanent_loss { "yes" } else { "no" }
            );
        }
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ ADVISOR                                                    ║");
        println!("║ • LST Protocols:   {:^40} ║", self.advisor.lst_protocols.len());
        println!("║ • Fallback APY:    {:>39.2}% ║", self.advisor.fallback_lst_apy);
        println!("║ • Better-by:       {:>38.2}pp ║", self.advisor.better_yield_margin_pct);
        println!("║ • LP Min APY:      {:>39.2}% ║", self.advisor.lp_min_apy);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            yields_url: DEFAULT_YIELDS_URL.to_string(),
            marinade_api_url: DEFAULT_MARINADE_API_URL.to_string(),
            http_timeout_secs: 10,
            tracked_chain: DEFAULT_TRACKED_CHAIN.to_string(),
            min_pool_tvl_usd: DEFAULT_MIN_POOL_TVL_USD,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            refresh_timeout_secs: 15,
            advisor: AdvisorConfig::default(),
            risk_tiers: RiskTierTable::default(),
        }
    }
}

// ============================================
// TESTS
// ============================================
