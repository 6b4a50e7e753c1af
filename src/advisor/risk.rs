//! Risk tiers and the per-tier candidate policy

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::YieldError;

/// User risk preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl Default for RiskTier {
    fn default() -> Self {
        RiskTier::Medium
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "low"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::High => write!(f, "high"),
        }
    }
}

impl FromStr for RiskTier {
    type Err = YieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskTier::Low),
            "medium" => Ok(RiskTier::Medium),
            "high" => Ok(RiskTier::High),
            other => Err(YieldError::InvalidFilter(format!(
                "unknown risk tier '{}' (expected low, medium or high)",
                other
            ))),
        }
    }
}

/// Which pools are eligible recommendation candidates for a tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub allow_impermanent_loss: bool,
    pub min_tvl_usd: f64,
}

impl RiskPolicy {
    fn with_overrides(mut self, overrides: Option<PolicyOverrides>) -> Self {
        if let Some(o) = overrides {
            if let Some(allow) = o.allow_impermanent_loss {
                self.allow_impermanent_loss = allow;
            }
            if let Some(min_tvl) = o.min_tvl_usd {
                self.min_tvl_usd = min_tvl;
            }
        }
        self
    }
}

/// Tier → policy mapping. Overridable from the config file; any tier or
/// field left out keeps that tier's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TierTableOverrides")]
pub struct RiskTierTable {
    pub low: RiskPolicy,
    pub medium: RiskPolicy,
    pub high: RiskPolicy,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyOverrides {
    allow_impermanent_loss: Option<bool>,
    min_tvl_usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TierTableOverrides {
    low: Option<PolicyOverrides>,
    medium: Option<PolicyOverrides>,
    high: Option<PolicyOverrides>,
}

impl From<TierTableOverrides> for RiskTierTable {
    fn from(overrides: TierTableOverrides) -> Self {
        let defaults = Self::default();
        Self {
            low: defaults.low.with_overrides(overrides.low),
            medium: defaults.medium.with_overrides(overrides.medium),
            high: defaults.high.with_overrides(overrides.high),
        }
    }
}

impl RiskTierTable {
    pub fn policy(&self, tier: RiskTier) -> &RiskPolicy {
        match tier {
            RiskTier::Low => &self.low,
            RiskTier::Medium => &self.medium,
            RiskTier::High => &self.high,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskTier, &RiskPolicy)> {
        [
            (RiskTier::Low, &self.low),
            (RiskTier::Medium, &self.medium),
            (RiskTier::High, &self.high),
        ]
        .into_iter()
    }
}

impl Default for RiskTierTable {
    fn default() -> Self {
        Self {
            low: RiskPolicy {
                allow_impermanent_loss: false,
                min_tvl_usd: 10_000_000.0,
            },
            medium: RiskPolicy {
                allow_impermanent_loss: true,
                min_tvl_usd: 1_000_000.0,
            },
            high: RiskPolicy {
                allow_impermanent_loss: true,
                min_tvl_usd: 100_000.0,
            },
        }
    }
}
