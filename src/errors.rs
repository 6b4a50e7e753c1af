//! Error types for the yield engine
//!
//! `FetchError` describes a failure reaching an upstream provider. It is
//! `Clone` because a single refresh outcome is handed to every caller that
//! waited on it. `YieldError` is what the public operations return.

use std::time::Duration;
use thiserror::Error;

/// Failure talking to an upstream provider (DefiLlama, Marinade, portfolio builder)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("{provider} request failed: {message}")]
    Http { provider: String, message: String },

    #[error("{provider} returned HTTP {status}")]
    Status { provider: String, status: u16 },

    #[error("Failed to decode {provider} response: {message}")]
    Decode { provider: String, message: String },

    #[error("{provider} did not respond within {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("{provider} I/O error: {message}")]
    Io { provider: String, message: String },
}

impl FetchError {
    pub fn http(provider: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Http {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    pub fn decode(provider: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Decode {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    /// Provider the error originated from
    pub fn provider(&self) -> &str {
        match self {
            FetchError::Http { provider, .. }
            | FetchError::Status { provider, .. }
            | FetchError::Decode { provider, .. }
            | FetchError::Timeout { provider, .. }
            | FetchError::Io { provider, .. } => provider,
        }
    }
}

/// Errors surfaced by the public yield operations
#[derive(Error, Debug, Clone)]
pub enum YieldError {
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(#[from] FetchError),

    #[error("No cached yield data available: {source}")]
    NoCachedData {
        #[source]
        source: FetchError,
    },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Could not obtain candidate pools: {source}")]
    CandidateFetch {
        #[source]
        source: Box<YieldError>,
    },
}

impl YieldError {
    /// Transient upstream problems are worth retrying; everything else is a
    /// request-shape problem.
    pub fn is_retryable(&self) -> bool {
        match self {
            YieldError::UpstreamFetch(_)
            | YieldError::NoCachedData { .. }
            | YieldError::CandidateFetch { .. } => true,
            YieldError::InvalidFilter(_) => false,
        }
    }
}

pub type YieldResult<T> = Result<T, YieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let fetch = FetchError::http("defillama", "connection reset");

        assert!(YieldError::NoCachedData { source: fetch.clone() }.is_retryable());
        assert!(YieldError::CandidateFetch {
            source: Box::new(YieldError::NoCachedData { source: fetch.clone() }),
        }
        .is_retryable());
        assert!(YieldError::UpstreamFetch(fetch).is_retryable());
        assert!(!YieldError::InvalidFilter("empty query".to_string()).is_retryable());
    }

    #[test]
    fn test_error_messages_name_provider() {
        let err = FetchError::Status {
            provider: "marinade".to_string(),
            status: 503,
        };
        assert_eq!(err.provider(), "marinade");
        assert_eq!(err.to_string(), "marinade returned HTTP 503");
    }
}
