//! Pricing abstractions and the provider error taxonomy

use crate::core::model::{Dividend, InstrumentKey, Quote};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider does not know the instrument. Never retried.
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// The provider answered but refused the request.
    #[error("Provider rejected {instrument} (status {status}): {message}")]
    Business {
        instrument: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited while fetching {0}")]
    RateLimited(String),

    /// The response could not be understood.
    #[error("Malformed response for {instrument}: {message}")]
    Malformed { instrument: String, message: String },

    /// Network failure before a usable answer arrived.
    #[error("Transport error for {instrument}: {message}")]
    Transport { instrument: String, message: String },

    #[error("Timed out after {timeout_ms}ms fetching {instrument}")]
    Timeout { instrument: String, timeout_ms: u64 },
}

impl ProviderError {
    /// Only transport-level failures are worth a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Transport { .. } | ProviderError::Timeout { .. }
        )
    }

    pub fn transport(instrument: &InstrumentKey, err: impl std::fmt::Display) -> Self {
        ProviderError::Transport {
            instrument: instrument.to_string(),
            message: err.to_string(),
        }
    }

    pub fn malformed(instrument: &InstrumentKey, err: impl std::fmt::Display) -> Self {
        ProviderError::Malformed {
            instrument: instrument.to_string(),
            message: err.to_string(),
        }
    }
}

/// Fetches the current quote of a single instrument. Implementations never touch the cache.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_quote(&self, instrument: &InstrumentKey) -> Result<Quote, ProviderError>;
}

#[async_trait]
pub trait DividendProvider: Send + Sync {
    /// Known future dividends for the given identifiers.
    async fn fetch_future_dividends(
        &self,
        identifiers: &[String],
    ) -> Result<Vec<Dividend>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_failures_are_retryable() {
        let key = InstrumentKey::metal("XAU");
        assert!(ProviderError::transport(&key, "connection reset").is_retryable());
        assert!(
            ProviderError::Timeout {
                instrument: "XAU".to_string(),
                timeout_ms: 500
            }
            .is_retryable()
        );
        assert!(!ProviderError::UnknownInstrument("XYZ".to_string()).is_retryable());
        assert!(!ProviderError::RateLimited("XAU".to_string()).is_retryable());
        assert!(!ProviderError::malformed(&key, "missing rates").is_retryable());
    }
}
