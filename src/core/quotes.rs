//! Cache-aside quote resolution in front of a price provider.

use crate::core::cache::{Namespace, QuoteCache};
use crate::core::model::{InstrumentKey, Quote};
use crate::core::price::{PriceProvider, ProviderError};
use crate::providers::util::with_retry;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// An instrument left out of a result because no usable quote was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableQuote {
    pub identifier: String,
    pub exchange: Option<String>,
    pub reason: String,
}

impl UnavailableQuote {
    pub fn new(instrument: &InstrumentKey, reason: impl ToString) -> Self {
        Self {
            identifier: instrument.identifier.clone(),
            exchange: instrument.exchange.clone(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Upper bound for a single provider call.
    pub timeout: Duration,
    /// Extra attempts after a transport failure.
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 1,
            retry_delay_ms: 250,
        }
    }
}

#[derive(Clone)]
pub struct QuoteResolver {
    cache: QuoteCache,
    options: ResolverOptions,
}

impl QuoteResolver {
    pub fn new(cache: QuoteCache, options: ResolverOptions) -> Self {
        Self { cache, options }
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Serves from the cache when live, otherwise fetches and repopulates it.
    /// No lock is held while the provider call is in flight.
    #[instrument(name = "ResolveQuote", skip_all, fields(instrument = %instrument))]
    pub async fn resolve(
        &self,
        provider: &dyn PriceProvider,
        namespace: Namespace,
        instrument: &InstrumentKey,
    ) -> Result<Quote, ProviderError> {
        let key = instrument.to_string();
        if let Some(cached) = self.cache.get::<Quote>(namespace.name(), &key).await {
            return Ok(cached);
        }

        let quote = with_retry(
            || self.fetch_bounded(provider, instrument),
            self.options.retries,
            self.options.retry_delay_ms,
        )
        .await?;
        info!(instrument = %instrument, "Fetched fresh quote");

        self.cache.set_in(namespace, &key, &quote).await;
        Ok(quote)
    }

    async fn fetch_bounded(
        &self,
        provider: &dyn PriceProvider,
        instrument: &InstrumentKey,
    ) -> Result<Quote, ProviderError> {
        match tokio::time::timeout(self.options.timeout, provider.fetch_quote(instrument)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(instrument = %instrument, "Provider call timed out");
                Err(ProviderError::Timeout {
                    instrument: instrument.to_string(),
                    timeout_ms: self.options.timeout.as_millis() as u64,
                })
            }
        }
    }
}
