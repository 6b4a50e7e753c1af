//! SolYield - Solana yield dataset cache & recommendation engine
//!
//! Pulls every Solana pool from DefiLlama into a TTL snapshot, answers
//! ranking/search/rollup queries over it, and turns a wallet portfolio plus
//! a risk tier into ranked yield recommendations.

pub mod advisor;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod portfolio;
pub mod protocols;
pub mod query;
pub mod service;
pub mod tokens;
pub mod types;

pub use advisor::{Advisor, Priority, Recommendation, RecommendationKind, RecommendationSet, RiskTier};
pub use config::Config;
pub use errors::{FetchError, YieldError, YieldResult};
pub use portfolio::{Holding, Portfolio, PortfolioSource};
pub use query::PoolFilters;
pub use service::{ProtocolOverview, YieldService, YieldsOverview};
pub use types::{DatasetSnapshot, Pool, ProtocolRollup};
