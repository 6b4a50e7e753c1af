//! Portfolio-aware yield recommendations

pub mod engine;
pub mod risk;
pub mod types;

pub use engine::Advisor;
pub use risk::{RiskPolicy, RiskTier, RiskTierTable};
pub use types::{Priority, Recommendation, RecommendationKind, RecommendationSet};
