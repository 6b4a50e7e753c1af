//! Recommendation output types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::RiskTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    StakeSol,
    StablecoinYield,
    LstOptimize,
    LpOpportunity,
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationKind::StakeSol => write!(f, "stake-sol"),
            RecommendationKind::StablecoinYield => write!(f, "stablecoin-yield"),
            RecommendationKind::LstOptimize => write!(f, "lst-optimize"),
            RecommendationKind::LpOpportunity => write!(f, "lp-opportunity"),
        }
    }
}

/// Declaration order is display order: High sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_yield: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_yield: Option<f64>,
    pub suggested_protocol: String,
    pub suggested_pool: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub il_risk: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_annual_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_extra_return: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Recommendation {
    /// Annual return estimate, else extra return, else 0
    pub fn estimated_gain(&self) -> f64 {
        self.estimated_annual_return
            .or(self.estimated_extra_return)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub risk_tier: RiskTier,
    pub recommendations: Vec<Recommendation>,
    pub total_potential_annual_gain: f64,
    pub generated_at: DateTime<Utc>,
}
