//! Query Engine
//!
//! Pure functions over a pool slice: ranking, free-text search and the
//! per-protocol rollup. Nothing here touches the cache or mutates pools.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{YieldError, YieldResult};
use crate::types::{Pool, ProtocolRollup};

/// Optional restrictions for `top_yields`. All unset means no filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolFilters {
    /// Only pools flagged as stablecoin pools
    pub stable_only: bool,

    /// Case-insensitive project name equality
    pub project: Option<String>,

    /// Exclude pools tagged with impermanent-loss risk
    pub no_impermanent_loss: bool,

    /// Inclusive TVL floor
    pub min_tvl_usd: Option<f64>,
}

impl PoolFilters {
    pub fn validate(&self) -> YieldResult<()> {
        if let Some(min) = self.min_tvl_usd {
            if !min.is_finite() || min < 0.0 {
                return Err(YieldError::InvalidFilter(format!(
                    "min TVL must be a non-negative number, got {}",
                    min
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, pool: &Pool) -> bool {
        if let Some(min) = self.min_tvl_usd {
            if pool.tvl_usd < min {
                return false;
            }
        }
        if self.stable_only && !pool.stablecoin {
            return false;
        }
        if let Some(project) = &self.project {
            if !pool.project.eq_ignore_ascii_case(project) {
                return false;
            }
        }
        if self.no_impermanent_loss && pool.has_il_risk() {
            return false;
        }
        true
    }
}

/// Highest-APY pools passing `filters`, at most `limit` of them.
///
/// Absent APY ranks as 0. Ties keep snapshot order.
pub fn top_yields(pools: &[Pool], limit: usize, filters: &PoolFilters) -> Vec<Pool> {
    if limit == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<&Pool> = pools.iter().filter(|p| filters.matches(p)).collect();
    ranked.sort_by(|a, b| b.apy_or_zero().total_cmp(&a.apy_or_zero()));

    ranked.into_iter().take(limit).cloned().collect()
}

/// Pools whose symbol or project contains `query`, case-insensitively, in
/// snapshot order.
pub fn search(pools: &[Pool], query: &str) -> YieldResult<Vec<Pool>> {
    if query.trim().is_empty() {
        return Err(YieldError::InvalidFilter(
            "search query must not be empty".to_string(),
        ));
    }
    let needle = query.to_lowercase();

    Ok(pools
        .iter()
        .filter(|p| {
            p.symbol.to_lowercase().contains(&needle) || p.project.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect())
}

/// One rollup per project, largest total TVL first
pub fn protocol_rollup(pools: &[Pool]) -> Vec<ProtocolRollup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rollups: Vec<ProtocolRollup> = Vec::new();
    let mut apy_sums: Vec<f64> = Vec::new();

    for pool in pools {
        let slot = *index.entry(pool.project.as_str()).or_insert_with(|| {
            rollups.push(ProtocolRollup {
                project: pool.project.clone(),
                pool_count: 0,
                total_tvl: 0.0,
                avg_apy: 0.0,
                max_apy: 0.0,
            });
            apy_sums.push(0.0);
            rollups.len() - 1
        });

        let apy = pool.apy_or_zero();
        let rollup = &mut rollups[slot];
        rollup.pool_count += 1;
        rollup.total_tvl += pool.tvl_usd;
        rollup.max_apy = rollup.max_apy.max(apy);
        apy_sums[slot] += apy;
    }

    for (rollup, sum) in rollups.iter_mut().zip(apy_sums) {
        rollup.avg_apy = sum / rollup.pool_count as f64;
    }

    rollups.sort_by(|a, b| b.total_tvl.total_cmp(&a.total_tvl));
    rollups
}

// ============================================
// TESTS
// ============================================
