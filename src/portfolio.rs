//! Wallet portfolio snapshot
//!
//! Built elsewhere (on-chain balances + prices) and handed to the advisor.
//! The JSON shape matches what the wallet analyzer emits, so a saved
//! analysis can be loaded straight from disk.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::errors::FetchError;
use crate::tokens::{self, TokenKind};

// ============================================
// TYPES
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,

    #[serde(default)]
    pub mint: Option<String>,

    pub amount: f64,

    #[serde(default)]
    pub price_usd: Option<f64>,

    pub value_usd: f64,

    #[serde(rename = "isLST", alias = "isLst", default)]
    pub is_lst: bool,

    #[serde(default)]
    pub is_stable: bool,

    /// Issuing protocol for liquid staking tokens
    #[serde(default)]
    pub protocol: Option<String>,
}

impl Holding {
    /// Classify a raw balance through the token registry
    pub fn from_token(mint: &str, amount: f64, price_usd: f64) -> Self {
        let info = tokens::lookup(mint);
        let symbol = match info {
            Some(info) => info.symbol.to_string(),
            None => format!("{}...", mint.chars().take(8).collect::<String>()),
        };

        Self {
            symbol,
            mint: Some(mint.to_string()),
            amount,
            price_usd: Some(price_usd),
            value_usd: amount * price_usd,
            is_lst: info.map_or(false, |t| t.is_lst()),
            is_stable: info.map_or(false, |t| t.is_stablecoin()),
            protocol: info.and_then(|t| t.protocol).map(str::to_string),
        }
    }

    pub fn is_native(&self) -> bool {
        match self.mint.as_deref().and_then(tokens::lookup) {
            Some(info) => info.kind == TokenKind::Native,
            None => self.symbol == "SOL",
        }
    }
}

/// Percent of total value per bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Allocation {
    #[serde(deserialize_with = "number_or_string")]
    pub sol: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lst: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub stablecoins: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub other: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub wallet: String,
    pub total_value_usd: f64,
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub allocation: Allocation,
}

impl Portfolio {
    /// Assemble a portfolio from classified holdings. Holdings end up sorted
    /// by value, largest first.
    pub fn from_holdings(wallet: impl Into<String>, mut holdings: Vec<Holding>) -> Self {
        holdings.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));

        let total: f64 = holdings.iter().map(|h| h.value_usd).sum();
        let lst: f64 = holdings.iter().filter(|h| h.is_lst).map(|h| h.value_usd).sum();
        let stable: f64 = holdings.iter().filter(|h| h.is_stable).map(|h| h.value_usd).sum();
        let sol = holdings
            .iter()
            .find(|h| h.is_native())
            .map_or(0.0, |h| h.value_usd);

        let pct = |value: f64| if total > 0.0 { value * 100.0 / total } else { 0.0 };

        Self {
            wallet: wallet.into(),
            total_value_usd: total,
            allocation: Allocation {
                sol: pct(sol),
                lst: pct(lst),
                stablecoins: pct(stable),
                other: pct(total - sol - lst - stable),
            },
            holdings,
        }
    }

    /// First holding of the given symbol
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn stable_holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.iter().filter(|h| h.is_stable)
    }

    pub fn lst_holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.iter().filter(|h| h.is_lst)
    }
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================
// PORTFOLIO SOURCE
// ============================================

/// Resolves a wallet address to a portfolio snapshot
#[async_trait]
pub trait PortfolioSource: Send + Sync {
    async fn fetch_portfolio(&self, wallet: &str) -> Result<Portfolio, FetchError>;
}

/// Reads `<dir>/<wallet>.json` written by the wallet analyzer
pub struct JsonFilePortfolioSource {
    dir: PathBuf,
}

impl JsonFilePortfolioSource {
    const PROVIDER: &'static str = "portfolio-file";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PortfolioSource for JsonFilePortfolioSource {
    async fn fetch_portfolio(&self, wallet: &str) -> Result<Portfolio, FetchError> {
        if wallet.is_empty() || !wallet.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FetchError::Io {
                provider: Self::PROVIDER.to_string(),
                message: format!("'{}' is not a wallet address", wallet),
            });
        }

        let path = self.dir.join(format!("{}.json", wallet));
        debug!("📂 Loading portfolio from {}", path.display());

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FetchError::Io {
                provider: Self::PROVIDER.to_string(),
                message: format!("{}: {}", path.display(), e),
            })?;

        serde_json::from_str(&content).map_err(|e| FetchError::decode(Self::PROVIDER, e))
    }
}
