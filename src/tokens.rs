//! Known Solana token mints
//!
//! Static registry used to classify wallet balances:
//! - Native SOL
//! - USD stablecoins (USDC, USDT)
//! - Liquid staking tokens (mSOL, jitoSOL, bSOL, stSOL, INF)
//! - A few high-volume SPL tokens (BONK, JUP)

use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;

/// Wrapped SOL mint, used for the native balance
pub const NATIVE_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// A token we know how to classify
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub mint: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
    pub kind: TokenKind,
    /// Issuing protocol for liquid staking tokens
    pub protocol: Option<&'static str>,
}

/// Token categories for portfolio classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Native,
    Stable,
    LiquidStaking,
    Other,
}

impl TokenInfo {
    pub fn is_lst(&self) -> bool {
        self.kind == TokenKind::LiquidStaking
    }

    pub fn is_stablecoin(&self) -> bool {
        self.kind == TokenKind::Stable
    }
}

fn token(
    mint: &'static str,
    symbol: &'static str,
    name: &'static str,
    decimals: u8,
    kind: TokenKind,
    protocol: Option<&'static str>,
) -> TokenInfo {
    TokenInfo { mint, symbol, name, decimals, kind, protocol }
}

// ============================================
// REGISTRY
// ============================================

lazy_static! {
    /// Mint → token info
    static ref KNOWN_TOKENS: HashMap<&'static str, TokenInfo> = {
        use TokenKind::*;
        [
            token(NATIVE_SOL_MINT, "SOL", "Solana", 9, Native, None),
            token("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC", "USD Coin", 6, Stable, None),
            token("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT", "Tether USD", 6, Stable, None),
            token("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", "mSOL", "Marinade SOL", 9, LiquidStaking, Some("marinade")),
            token("J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn", "jitoSOL", "Jito SOL", 9, LiquidStaking, Some("jito")),
            token("bSo13r4TkiE4KumL71LsHTPpL2euBYLFx6h9HP3piy1", "bSOL", "BlazeStake SOL", 9, LiquidStaking, Some("blazestake")),
            token("7dHbWXmci3dT8UFYWYZweBLXgycu7Y3iL6trKn1Y7ARj", "stSOL", "Lido SOL", 9, LiquidStaking, Some("lido")),
            token("7Q2afV64in6N6SeZsAAB81TJzwpeLmHCRHCPB3faixJM", "INF", "Sanctum Infinity", 9, LiquidStaking, Some("sanctum")),
            token("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "BONK", "Bonk", 5, Other, None),
            token("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", "JUP", "Jupiter", 6, Other, None),
        ]
        .into_iter()
        .map(|t| (t.mint, t))
        .collect()
    };
}

pub fn lookup(mint: &str) -> Option<&'static TokenInfo> {
    KNOWN_TOKENS.get(mint)
}

pub fn is_lst(mint: &str) -> bool {
    lookup(mint).map_or(false, TokenInfo::is_lst)
}

pub fn is_stablecoin(mint: &str) -> bool {
    lookup(mint).map_or(false, TokenInfo::is_stablecoin)
}

/// All liquid staking tokens, sorted by symbol
pub fn liquid_staking_tokens() -> Vec<&'static TokenInfo> {
    let mut lsts: Vec<_> = KNOWN_TOKENS.values().filter(|t| t.is_lst()).collect();
    lsts.sort_by_key(|t| t.symbol);
    lsts
}

pub fn all_tokens() -> impl Iterator<Item = &'static TokenInfo> {
    KNOWN_TOKENS.values()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_mints() {
        let sol = lookup(NATIVE_SOL_MINT).unwrap();
        assert_eq!(sol.symbol, "SOL");
        assert_eq!(sol.kind, TokenKind::Native);

        let bonk = lookup("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263").unwrap();
        assert_eq!(bonk.decimals, 5);

        assert!(lookup("NotARealMint111111111111111111111111111111").is_none());
        assert_eq!(all_tokens().count(), 10);
    }

    #[test]
    fn test_classification() {
        assert!(is_stablecoin("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
        assert!(!is_stablecoin(NATIVE_SOL_MINT));
        assert!(is_lst("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So"));
        assert!(!is_lst("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN"));
        assert!(!is_lst("unknown"));
    }

    #[test]
    fn test_liquid_staking_tokens() {
        let symbols: Vec<_> = liquid_staking_tokens().iter().map(|t| t.symbol).collect();
        assert_eq!(symbols, vec!["INF", "bSOL", "jitoSOL", "mSOL", "stSOL"]);
        assert!(liquid_staking_tokens().iter().all(|t| t.protocol.is_some()));
    }
}
