use super::util::http_client;
use crate::core::clock::Clock;
use crate::core::model::{Currency, Dividend, InstrumentKey, Quote};
use crate::core::price::{DividendProvider, PriceProvider, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockQuoteResponse {
    currency: String,
    price: Decimal,
    isin: Option<String>,
    datetime: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DividendDetailList {
    dividend_details: HashMap<String, DividendDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DividendDetails {
    #[serde(default)]
    future_dividends: Option<Vec<DividendEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DividendEntry {
    price: Decimal,
    currency: String,
    payment_date: String,
}

/// Accepts plain dates as well as full ISO timestamps.
fn parse_payment_date(raw: &str) -> Option<NaiveDate> {
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

/// Security quotes and dividend calendars from the stock data service.
pub struct StockServiceProvider {
    base_url: String,
    currency: Currency,
    /// Quotes are requested for the clock's current local day.
    clock: Arc<dyn Clock>,
    client: reqwest::Client,
}

impl StockServiceProvider {
    pub fn new(
        base_url: &str,
        currency: Currency,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            currency,
            clock,
            client: http_client()?,
        })
    }

    async fn get_text(
        &self,
        url: &str,
        instrument: &InstrumentKey,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::transport(instrument, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::transport(instrument, e))?;

        match status.as_u16() {
            200..=299 => Ok(text),
            404 => Err(ProviderError::UnknownInstrument(instrument.to_string())),
            429 => Err(ProviderError::RateLimited(instrument.to_string())),
            500..=599 => Err(ProviderError::transport(
                instrument,
                format!("HTTP {status}"),
            )),
            code => Err(ProviderError::Business {
                instrument: instrument.to_string(),
                status: code,
                message: text,
            }),
        }
    }
}

#[async_trait]
impl PriceProvider for StockServiceProvider {
    #[instrument(name = "StockQuoteFetch", skip(self), fields(security = %instrument))]
    async fn fetch_quote(&self, instrument: &InstrumentKey) -> Result<Quote, ProviderError> {
        let exchange = instrument.exchange.as_deref().ok_or_else(|| {
            ProviderError::UnknownInstrument(format!("{instrument} has no exchange"))
        })?;
        let url = format!(
            "{}/v1/quotes/{}?identifier={}&exchange={}&currency={}",
            self.base_url,
            self.clock.now().format("%Y-%m-%d"),
            instrument.identifier,
            exchange,
            self.currency
        );
        debug!("Requesting stock quote from {}", url);

        let text = self.get_text(&url, instrument).await?;
        let data: StockQuoteResponse = serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, response = %text, "Failed to parse stock quote response");
            ProviderError::malformed(instrument, e)
        })?;

        if let Some(isin) = &data.isin {
            if isin != &instrument.identifier {
                warn!(requested = %instrument.identifier, returned = %isin, "Quote identifier mismatch");
            }
        }

        let currency: Currency = data
            .currency
            .parse()
            .map_err(|e| ProviderError::malformed(instrument, e))?;
        let (eur, usd) = match currency {
            Currency::Eur => (Some(data.price), None),
            Currency::Usd => (None, Some(data.price)),
        };

        Ok(Quote {
            instrument: instrument.clone(),
            eur,
            usd,
            fetched_at: data
                .datetime
                .unwrap_or_else(|| self.clock.now().with_timezone(&Utc)),
        })
    }
}

#[async_trait]
impl DividendProvider for StockServiceProvider {
    #[instrument(name = "DividendFetch", skip_all, fields(count = identifiers.len()))]
    async fn fetch_future_dividends(
        &self,
        identifiers: &[String],
    ) -> Result<Vec<Dividend>, ProviderError> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }

        let query: String = identifiers
            .iter()
            .map(|id| format!("identifier={id}&"))
            .collect();
        let url = format!(
            "{}/v1/assets/dividends?{}expand=futureDividends",
            self.base_url, query
        );
        let label = InstrumentKey {
            identifier: identifiers.join(","),
            exchange: None,
        };

        let text = self.get_text(&url, &label).await?;
        let data: DividendDetailList = serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, "Failed to parse dividend response");
            ProviderError::malformed(&label, e)
        })?;

        let mut dividends = Vec::new();
        for (identifier, details) in data.dividend_details {
            for entry in details.future_dividends.unwrap_or_default() {
                let (Ok(currency), Some(payment_date)) = (
                    entry.currency.parse::<Currency>(),
                    parse_payment_date(&entry.payment_date),
                ) else {
                    debug!(%identifier, currency = %entry.currency, "Ignoring unusable dividend entry");
                    continue;
                };
                dividends.push(Dividend {
                    identifier: identifier.clone(),
                    price: entry.price,
                    currency,
                    payment_date,
                });
            }
        }
        dividends.sort_by(|a, b| {
            (&a.identifier, a.payment_date).cmp(&(&b.identifier, b.payment_date))
        });
        Ok(dividends)
    }
}
