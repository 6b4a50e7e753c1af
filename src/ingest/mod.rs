//! Ingestion: upstream pool source, normalization and the TTL dataset cache

pub mod clock;
pub mod normalize;
pub mod refresh;
pub mod source;
pub mod yield_cache;

pub use clock::{Clock, ManualClock, SystemClock};
pub use normalize::{normalize_pools, NormalizeRules};
pub use refresh::{Loader, RefreshCache, Stamped};
pub use source::{DefiLlamaClient, PoolSource, RawPool};
pub use yield_cache::YieldCache;
