//! Recommendation Engine
//!
//! Matches a portfolio against the risk-scoped candidate pools. Rules run in
//! order and each appends zero or more recommendations:
//! 1. Idle native SOL → liquid staking
//! 2. Idle stablecoins → best stablecoin pool
//! 3. Liquid staking positions → better-yielding SOL pool
//! 4. LP opportunities (not for the low tier)

use chrono::{DateTime, Utc};
use tracing::debug;

use super::risk::{RiskPolicy, RiskTier, RiskTierTable};
use super::types::{Priority, Recommendation, RecommendationKind, RecommendationSet};
use crate::config::{AdvisorConfig, Config};
use crate::portfolio::{Holding, Portfolio};
use crate::query::{top_yields, PoolFilters};
use crate::types::Pool;

#[derive(Debug, Clone)]
pub struct Advisor {
    config: AdvisorConfig,
    tiers: RiskTierTable,
}

impl Advisor {
    pub fn new(config: AdvisorConfig, tiers: RiskTierTable) -> Self {
        Self { config, tiers }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.advisor.clone(), config.risk_tiers.clone())
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn policy(&self, tier: RiskTier) -> &RiskPolicy {
        self.tiers.policy(tier)
    }

    /// Filters that scope the candidate set to a tier
    pub fn candidate_filters(&self, tier: RiskTier) -> PoolFilters {
        let policy = self.policy(tier);
        PoolFilters {
            min_tvl_usd: Some(policy.min_tvl_usd),
            no_impermanent_loss: !policy.allow_impermanent_loss,
            ..Default::default()
        }
    }

    /// Highest-APY pools eligible for `tier`
    pub fn candidates(&self, pools: &[Pool], tier: RiskTier) -> Vec<Pool> {
        top_yields(pools, self.config.candidate_limit, &self.candidate_filters(tier))
    }

    /// Build the ranked recommendation list. Pure: same inputs, same output.
    pub fn recommend(
        &self,
        portfolio: &Portfolio,
        tier: RiskTier,
        candidates: &[Pool],
        generated_at: DateTime<Utc>,
    ) -> RecommendationSet {
        let policy = self.policy(tier);

        // Best APY first; ties keep input order
        let mut ranked: Vec<&Pool> = candidates.iter().collect();
        ranked.sort_by(|a, b| b.apy_or_zero().total_cmp(&a.apy_or_zero()));

        let mut recommendations = Vec::new();
        recommendations.extend(self.stake_idle_native(portfolio, &ranked));
        recommendations.extend(self.stablecoin_yield(portfolio, policy, &ranked));
        recommendations.extend(self.lst_optimizations(portfolio, policy, &ranked));
        recommendations.extend(self.lp_opportunities(portfolio, tier, policy, &ranked));

        recommendations.sort_by_key(|r| r.priority);

        let total_potential_annual_gain = recommendations.iter().map(|r| r.estimated_gain()).sum();

        debug!(
            "💡 {} recommendations for {} ({} tier, {} candidates)",
            recommendations.len(),
            portfolio.wallet,
            tier,
            candidates.len()
        );

        RecommendationSet {
            risk_tier: tier,
            recommendations,
            total_potential_annual_gain,
            generated_at,
        }
    }

    // ============================================
    // RULES
    // ============================================

    fn is_lst_protocol(&self, project: &str) -> bool {
        self.config.lst_protocols.iter().any(|p| p == project)
    }

    fn stake_idle_native(&self, portfolio: &Portfolio, ranked: &[&Pool]) -> Option<Recommendation> {
        let native = &self.config.native_symbol;
        let holding = portfolio.holding(native)?;
        if holding.value_usd <= self.config.idle_threshold_usd {
            return None;
        }

        let best = ranked
            .iter()
            .find(|p| p.apy.is_some() && p.symbol_mentions(native) && self.is_lst_protocol(&p.project));

        let (apy, protocol, pool) = match best {
            Some(p) => (p.apy_or_zero(), p.project.clone(), p.symbol.clone()),
            None => (
                self.config.fallback_lst_apy,
                self.config.fallback_lst_protocol.clone(),
                self.config.fallback_lst_pool.clone(),
            ),
        };

        Some(Recommendation {
            kind: RecommendationKind::StakeSol,
            priority: Priority::High,
            title: format!("Stake idle {} for yield", native),
            description: format!(
                "You have {:.2} {} (${:.2}) sitting idle. Liquid staking earns yield while keeping your {} liquid.",
                holding.amount, native, holding.value_usd, native
            ),
            current_yield: Some(0.0),
            suggested_yield: Some(apy),
            suggested_protocol: protocol,
            suggested_pool: pool,
            tvl: best.map(|p| p.tvl_usd),
            il_risk: None,
            estimated_annual_return: Some(holding.value_usd * apy / 100.0),
            estimated_extra_return: None,
            action: Some(format!("Swap {} for mSOL, jitoSOL, or bSOL via Jupiter", native)),
        })
    }

    fn stablecoin_yield(
        &self,
        portfolio: &Portfolio,
        policy: &RiskPolicy,
        ranked: &[&Pool],
    ) -> Option<Recommendation> {
        let stables: Vec<&Holding> = portfolio.stable_holdings().collect();
        if stables.is_empty() {
            return None;
        }

        let best = ranked
            .iter()
            .find(|p| p.apy.is_some() && p.stablecoin && p.tvl_usd > policy.min_tvl_usd)?;
        let total: f64 = stables.iter().map(|h| h.value_usd).sum();
        if total <= self.config.idle_threshold_usd {
            return None;
        }

        let apy = best.apy_or_zero();
        Some(Recommendation {
            kind: RecommendationKind::StablecoinYield,
            priority: Priority::Medium,
            title: "Earn yield on stablecoins".to_string(),
            description: format!(
                "You have ${:.2} in stablecoins earning nothing. Deploy to lending or LP pools for yield.",
                total
            ),
            current_yield: Some(0.0),
            suggested_yield: Some(apy),
            suggested_protocol: best.project.clone(),
            suggested_pool: best.symbol.clone(),
            tvl: Some(best.tvl_usd),
            il_risk: None,
            estimated_annual_return: Some(total * apy / 100.0),
            estimated_extra_return: None,
            action: Some(format!("Deposit into {} {} pool", best.project, best.symbol)),
        })
    }

    fn lst_optimizations(
        &self,
        portfolio: &Portfolio,
        policy: &RiskPolicy,
        ranked: &[&Pool],
    ) -> Vec<Recommendation> {
        let native = &self.config.native_symbol;

        portfolio
            .lst_holdings()
            .filter_map(|lst| {
                let current = ranked
                    .iter()
                    .find(|p| {
                        p.apy.is_some()
                            && (p.symbol_mentions(&lst.symbol)
                                || lst.protocol.as_deref() == Some(p.project.as_str()))
                    })
                    .map_or(0.0, |p| p.apy_or_zero());

                let better = ranked.iter().find(|p| {
                    p.symbol_mentions(native)
                        && !p.has_il_risk()
                        && p.tvl_usd > policy.min_tvl_usd
                        && p.apy.map_or(false, |apy| apy > current + self.config.better_yield_margin_pct)
                })?;

                let apy = better.apy_or_zero();
                Some(Recommendation {
                    kind: RecommendationKind::LstOptimize,
                    priority: Priority::Low,
                    title: format!("Consider switching from {}", lst.symbol),
                    description: format!(
                        "{} offers {:.1}% APY vs {:.1}% on your {}. Consider rebalancing.",
                        better.project, apy, current, lst.symbol
                    ),
                    current_yield: Some(current),
                    suggested_yield: Some(apy),
                    suggested_protocol: better.project.clone(),
                    suggested_pool: better.symbol.clone(),
                    tvl: Some(better.tvl_usd),
                    il_risk: None,
                    estimated_annual_return: None,
                    estimated_extra_return: Some(lst.value_usd * (apy - current) / 100.0),
                    action: Some(format!("Swap {} for {} via Jupiter", lst.symbol, better.symbol)),
                })
            })
            .collect()
    }

    fn lp_opportunities(
        &self,
        portfolio: &Portfolio,
        tier: RiskTier,
        policy: &RiskPolicy,
        ranked: &[&Pool],
    ) -> Vec<Recommendation> {
        if tier == RiskTier::Low || portfolio.total_value_usd <= self.config.lp_min_portfolio_usd {
            return Vec::new();
        }

        let priority = if tier == RiskTier::High {
            Priority::Medium
        } else {
            Priority::Low
        };

        ranked
            .iter()
            .filter(|p| {
                p.apy.map_or(false, |apy| apy > self.config.lp_min_apy) && p.tvl_usd > policy.min_tvl_usd
            })
            .take(self.config.lp_max_suggestions)
            .map(|lp| {
                let apy = lp.apy_or_zero();
                Recommendation {
                    kind: RecommendationKind::LpOpportunity,
                    priority,
                    title: format!("LP opportunity: {}", lp.symbol),
                    description: format!(
                        "{} {} pool offers {:.1}% APY with ${:.1}M TVL.",
                        lp.project,
                        lp.symbol,
                        apy,
                        lp.tvl_usd / 1e6
                    ),
                    current_yield: None,
                    suggested_yield: Some(apy),
                    suggested_protocol: lp.project.clone(),
                    suggested_pool: lp.symbol.clone(),
                    tvl: Some(lp.tvl_usd),
                    il_risk: Some(lp.has_il_risk()),
                    estimated_annual_return: None,
                    estimated_extra_return: None,
                    action: Some(format!("Provide liquidity to {} {}", lp.project, lp.symbol)),
                }
            })
            .collect()
    }
}

impl Default for Advisor {
    fn default() -> Self {
        Self::new(AdvisorConfig::default(), RiskTierTable::default())
    }
}

// ============================================
// TESTS
// ============================================
