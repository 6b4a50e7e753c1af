//! Raw provider rows → `Pool`

use std::collections::HashSet;
use tracing::debug;

use super::source::RawPool;
use crate::types::Pool;

/// What survives normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeRules {
    /// Exact chain name, as the provider spells it
    pub chain: String,
    /// Pools must be strictly above this TVL
    pub min_tvl_usd: f64,
}

/// Keep pools on the tracked chain above the dust threshold and map them to
/// `Pool`. Rows without an id or a finite TVL are dropped; repeated ids keep
/// the first row.
pub fn normalize_pools(raw: Vec<RawPool>, rules: &NormalizeRules) -> Vec<Pool> {
    let total = raw.len();
    let mut seen = HashSet::new();
    let mut dropped_foreign = 0usize;
    let mut dropped_dust = 0usize;

    let pools: Vec<Pool> = raw
        .into_iter()
        .filter_map(|row| {
            if row.chain.as_deref() != Some(rules.chain.as_str()) {
                dropped_foreign += 1;
                return None;
            }

            let tvl_usd = match row.tvl_usd {
                Some(tvl) if tvl.is_finite() && tvl > rules.min_tvl_usd => tvl,
                _ => {
                    dropped_dust += 1;
                    return None;
                }
            };

            let pool_id = row.pool?;
            if !seen.insert(pool_id.clone()) {
                return None;
            }

            Some(Pool {
                pool_id,
                project: row.project.unwrap_or_default(),
                symbol: row.symbol.unwrap_or_default(),
                tvl_usd,
                apy: row.apy.filter(|v| v.is_finite()),
                apy_base: row.apy_base.filter(|v| v.is_finite()),
                apy_reward: row.apy_reward.filter(|v| v.is_finite()),
                il_risk: row.il_risk,
                stablecoin: row.stablecoin.unwrap_or(false),
                exposure: row.exposure,
                reward_tokens: row.reward_tokens,
                underlying_tokens: row.underlying_tokens,
                pool_meta: row.pool_meta,
            })
        })
        .collect();

    debug!(
        "Normalized {} → {} pools ({} other chains, {} dust)",
        total,
        pools.len(),
        dropped_foreign,
        dropped_dust
    );

    pools
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> NormalizeRules {
        NormalizeRules {
            chain: "Solana".to_string(),
            min_tvl_usd: 10_000.0,
        }
    }

    fn raw(id: &str, chain: &str, tvl: Option<f64>) -> RawPool {
        RawPool {
            chain: Some(chain.to_string()),
            project: Some("orca".to_string()),
            symbol: Some("SOL-USDC".to_string()),
            pool: Some(id.to_string()),
            tvl_usd: tvl,
            apy: Some(12.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_filters_chain_and_dust() {
        let pools = normalize_pools(
            vec![
                raw("a", "Solana", Some(50_000.0)),
                raw("b", "Ethereum", Some(50_000_000.0)),
                raw("c", "Solana", Some(10_000.0)),
                raw("d", "Solana", Some(10_000.01)),
                raw("e", "solana", Some(50_000.0)),
                raw("f", "Solana", None),
                raw("g", "Solana", Some(f64::NAN)),
            ],
            &rules(),
        );

        let ids: Vec<_> = pools.iter().map(|p| p.pool_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert!(pools.iter().all(|p| p.tvl_usd > 10_000.0));
    }

    #[test]
    fn test_duplicates_keep_first() {
        let mut second = raw("a", "Solana", Some(99_000.0));
        second.symbol = Some("DUP".to_string());

        let pools = normalize_pools(vec![raw("a", "Solana", Some(20_000.0)), second], &rules());

        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].symbol, "SOL-USDC");
        assert_eq!(pools[0].tvl_usd, 20_000.0);
    }

    #[test]
    fn test_maps_optional_fields() {
        let mut row = raw("a", "Solana", Some(20_000.0));
        row.apy = None;
        row.stablecoin = None;
        row.il_risk = Some("yes".to_string());
        row.pool_meta = Some("Whirlpool".to_string());

        let pool = &normalize_pools(vec![row], &rules())[0];
        assert_eq!(pool.apy, None);
        assert!(!pool.stablecoin);
        assert!(pool.has_il_risk());
        assert_eq!(pool.pool_meta.as_deref(), Some("Whirlpool"));
    }

    #[test]
    fn test_rows_without_id_are_dropped() {
        let mut row = raw("a", "Solana", Some(20_000.0));
        row.pool = None;
        assert!(normalize_pools(vec![row], &rules()).is_empty());
    }
}
