use super::util::http_client;
use crate::core::model::{InstrumentKey, Quote};
use crate::core::price::{PriceProvider, ProviderError};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error, instrument};

const RATE_LIMITED: u16 = 429;

#[derive(Debug, Deserialize)]
struct MetalPriceResponse {
    success: bool,
    timestamp: Option<i64>,
    rates: Option<MetalRates>,
    error: Option<MetalPriceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct MetalRates {
    eur: Option<Decimal>,
    usd: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetalPriceError {
    status_code: u16,
    message: String,
}

/// Spot prices for precious metals from a metalpriceapi-compatible service.
pub struct MetalPriceProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl MetalPriceProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: http_client()?,
        })
    }

    fn rejection(instrument: &InstrumentKey, status: u16, message: String) -> ProviderError {
        if status == RATE_LIMITED {
            ProviderError::RateLimited(instrument.to_string())
        } else {
            ProviderError::Business {
                instrument: instrument.to_string(),
                status,
                message,
            }
        }
    }
}

#[async_trait]
impl PriceProvider for MetalPriceProvider {
    #[instrument(name = "MetalPriceFetch", skip(self), fields(metal = %instrument))]
    async fn fetch_quote(&self, instrument: &InstrumentKey) -> Result<Quote, ProviderError> {
        let url = format!(
            "{}/latest?api_key={}&base={}&currencies=EUR,USD",
            self.base_url, self.api_key, instrument.identifier
        );
        debug!("Requesting metal price for {}", instrument);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::transport(instrument, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::transport(instrument, e))?;

        let data: MetalPriceResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(_) if !status.is_success() => {
                return Err(Self::rejection(instrument, status.as_u16(), text));
            }
            Err(e) => {
                error!(error = ?e, response = %text, "Failed to parse metal price response");
                return Err(ProviderError::malformed(instrument, e));
            }
        };

        if !data.success {
            let (code, message) = match data.error {
                Some(err) => (err.status_code, err.message),
                None => (status.as_u16(), "request was not successful".to_string()),
            };
            return Err(Self::rejection(instrument, code, message));
        }

        let rates = data
            .rates
            .ok_or_else(|| ProviderError::malformed(instrument, "missing rates"))?;
        if rates.eur.is_none() && rates.usd.is_none() {
            return Err(ProviderError::malformed(instrument, "no EUR or USD rate"));
        }

        let fetched_at = data
            .timestamp
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Quote {
            instrument: instrument.clone(),
            eur: rates.eur,
            usd: rates.usd,
            fetched_at,
        })
    }
}
