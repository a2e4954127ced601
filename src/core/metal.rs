//! Precious-metal catalogue and cached spot quotes.

use crate::core::cache::Namespace;
use crate::core::model::{InstrumentKey, Quote};
use crate::core::price::{PriceProvider, ProviderError};
use crate::core::quotes::{QuoteResolver, UnavailableQuote};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metal {
    pub code: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
}

const TROY_OUNCE: &str = "Troy Ounce";

pub static METALS: [Metal; 3] = [
    Metal {
        code: "XAU",
        name: "Gold",
        unit: TROY_OUNCE,
    },
    Metal {
        code: "XAG",
        name: "Silver",
        unit: TROY_OUNCE,
    },
    Metal {
        code: "XPT",
        name: "Platinum",
        unit: TROY_OUNCE,
    },
];

pub fn metal_options() -> &'static [Metal] {
    &METALS
}

pub fn find_metal(code: &str) -> Option<&'static Metal> {
    metal_options()
        .iter()
        .find(|m| m.code.eq_ignore_ascii_case(code.trim()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalQuote {
    #[serde(flatten)]
    pub metal: Metal,
    pub eur: Option<Decimal>,
    pub usd: Option<Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl MetalQuote {
    fn new(metal: Metal, quote: Quote) -> Self {
        Self {
            metal,
            eur: quote.eur,
            usd: quote.usd,
            fetched_at: quote.fetched_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetalQuotes {
    pub quotes: Vec<MetalQuote>,
    pub unavailable: Vec<UnavailableQuote>,
}

/// Metal quotes read through the daily cache namespace.
pub struct MetalDesk {
    resolver: QuoteResolver,
    provider: Arc<dyn PriceProvider>,
}

impl MetalDesk {
    pub fn new(resolver: QuoteResolver, provider: Arc<dyn PriceProvider>) -> Self {
        Self { resolver, provider }
    }

    /// Unknown codes are rejected without contacting the provider.
    pub async fn metal_quote(&self, code: &str) -> Result<MetalQuote, ProviderError> {
        let metal = find_metal(code)
            .ok_or_else(|| ProviderError::UnknownInstrument(code.to_string()))?;
        let quote = self
            .resolver
            .resolve(
                self.provider.as_ref(),
                Namespace::Metal,
                &InstrumentKey::metal(metal.code),
            )
            .await?;
        Ok(MetalQuote::new(*metal, quote))
    }

    pub async fn metal_quotes(&self) -> MetalQuotes {
        let results = join_all(METALS.iter().map(|m| self.metal_quote(m.code))).await;

        let mut out = MetalQuotes::default();
        for (metal, result) in METALS.iter().zip(results) {
            match result {
                Ok(quote) => out.quotes.push(quote),
                Err(e) => {
                    warn!(metal = metal.code, error = %e, "Metal quote unavailable");
                    out.unavailable
                        .push(UnavailableQuote::new(&InstrumentKey::metal(metal.code), e));
                }
            }
        }
        out
    }
}
