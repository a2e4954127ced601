//! Portfolio valuation over an owner's stock lots.
//!
//! Lots are grouped per instrument, each group is priced through the quote
//! resolver, and the totals only cover groups whose quote resolved. Groups
//! that could not be priced are listed separately instead of counting as zero.

use crate::core::cache::Namespace;
use crate::core::model::{Currency, Dividend, InstrumentKey, Quote};
use crate::core::price::{DividendProvider, PriceProvider, ProviderError};
use crate::core::quotes::{QuoteResolver, UnavailableQuote};
use crate::core::validate::Lot;
use chrono::NaiveDate;
use futures::StreamExt;
use futures::stream;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Net holding of one instrument across all of its lots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionGroup {
    pub instrument: InstrumentKey,
    pub net_quantity: Decimal,
    pub total_cost_basis: Decimal,
    pub lots: usize,
}

/// Groups lots by instrument. Fully divested groups are dropped.
pub fn group_lots(lots: &[Lot]) -> Vec<PositionGroup> {
    let mut groups: BTreeMap<&InstrumentKey, PositionGroup> = BTreeMap::new();
    for lot in lots {
        let group = groups
            .entry(&lot.instrument)
            .or_insert_with(|| PositionGroup {
                instrument: lot.instrument.clone(),
                net_quantity: Decimal::ZERO,
                total_cost_basis: Decimal::ZERO,
                lots: 0,
            });
        group.net_quantity += lot.quantity;
        group.total_cost_basis += lot.quantity * lot.purchase_price + lot.purchase_fee;
        group.lots += 1;
    }

    groups
        .into_values()
        .filter(|g| {
            if g.net_quantity.is_zero() {
                debug!(instrument = %g.instrument, "Skipping fully divested position");
                false
            } else {
                true
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValuation {
    pub identifier: String,
    pub exchange: Option<String>,
    pub net_quantity: Decimal,
    pub total_cost_basis: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_gain: Decimal,
}

impl PositionValuation {
    pub fn new(group: &PositionGroup, current_price: Decimal) -> Self {
        let market_value = group.net_quantity * current_price;
        Self {
            identifier: group.instrument.identifier.clone(),
            exchange: group.instrument.exchange.clone(),
            net_quantity: group.net_quantity,
            total_cost_basis: group.total_cost_basis,
            current_price,
            market_value,
            unrealized_gain: market_value - group.total_cost_basis,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioKpis {
    pub total_position_value: Decimal,
    pub absolute_capital_gains: Decimal,
    pub unrealised_profit: Decimal,
    pub unrealised_loss: Decimal,
    pub free_capital_on_profitable_positions: Decimal,
    pub bound_capital_on_losing_positions: Decimal,
    pub upcoming_dividends: Decimal,
}

impl PortfolioKpis {
    /// Totals over resolved positions. A zero gain lands in neither bucket.
    pub fn from_positions(positions: &[PositionValuation]) -> Self {
        let mut kpis = PortfolioKpis::default();
        for p in positions {
            kpis.total_position_value += p.market_value;
            kpis.absolute_capital_gains += p.unrealized_gain;
            if p.unrealized_gain > Decimal::ZERO {
                kpis.unrealised_profit += p.unrealized_gain;
                kpis.free_capital_on_profitable_positions += p.market_value;
            } else if p.unrealized_gain < Decimal::ZERO {
                kpis.unrealised_loss += -p.unrealized_gain;
                kpis.bound_capital_on_losing_positions += p.market_value;
            }
        }
        kpis
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    #[serde(flatten)]
    pub kpis: PortfolioKpis,
    pub positions: Vec<PositionValuation>,
    pub unavailable: Vec<UnavailableQuote>,
}

impl PortfolioValuation {
    pub fn is_partial(&self) -> bool {
        !self.unavailable.is_empty()
    }
}

/// Sums `price × net quantity` over dividends paid after `today` in `currency`.
pub fn upcoming_dividends(
    dividends: &[Dividend],
    groups: &[PositionGroup],
    currency: Currency,
    today: NaiveDate,
) -> Decimal {
    let mut held: BTreeMap<&str, Decimal> = BTreeMap::new();
    for group in groups {
        *held.entry(group.instrument.identifier.as_str()).or_default() += group.net_quantity;
    }

    dividends
        .iter()
        .filter(|d| d.payment_date > today && d.currency == currency)
        .filter_map(|d| held.get(d.identifier.as_str()).map(|qty| d.price * *qty))
        .sum()
}

#[derive(Debug, Clone, Copy)]
pub struct PositionOptions {
    pub currency: Currency,
    pub security_ttl: Duration,
    /// Upper bound on quote lookups in flight at once.
    pub max_concurrent: usize,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            currency: Currency::Eur,
            security_ttl: Duration::from_secs(60),
            max_concurrent: 8,
        }
    }
}

pub struct PositionAggregator {
    resolver: QuoteResolver,
    prices: Arc<dyn PriceProvider>,
    dividends: Option<Arc<dyn DividendProvider>>,
    options: PositionOptions,
}

impl PositionAggregator {
    pub fn new(
        resolver: QuoteResolver,
        prices: Arc<dyn PriceProvider>,
        options: PositionOptions,
    ) -> Self {
        Self {
            resolver,
            prices,
            dividends: None,
            options,
        }
    }

    pub fn with_dividends(mut self, dividends: Arc<dyn DividendProvider>) -> Self {
        self.dividends = Some(dividends);
        self
    }

    pub async fn valuate(&self, lots: &[Lot]) -> PortfolioValuation {
        let groups = group_lots(lots);
        info!(
            lots = lots.len(),
            instruments = groups.len(),
            "Valuating portfolio"
        );

        let namespace = Namespace::Security {
            ttl: self.options.security_ttl,
        };
        let resolved: Vec<(&PositionGroup, Result<Quote, ProviderError>)> =
            stream::iter(groups.iter().map(|group| async move {
                let quote = self
                    .resolver
                    .resolve(self.prices.as_ref(), namespace, &group.instrument)
                    .await;
                (group, quote)
            }))
            .buffer_unordered(self.options.max_concurrent.max(1))
            .collect()
            .await;

        let currency = self.options.currency;
        let mut positions = Vec::new();
        let mut unavailable = Vec::new();
        for (group, quote) in resolved {
            match quote.map(|q| q.price_in(currency)) {
                Ok(Some(price)) => positions.push(PositionValuation::new(group, price)),
                Ok(None) => {
                    warn!(instrument = %group.instrument, %currency, "Quote has no price in base currency");
                    unavailable.push(UnavailableQuote::new(
                        &group.instrument,
                        format!("no {currency} price"),
                    ));
                }
                Err(e) => {
                    warn!(instrument = %group.instrument, error = %e, "Quote unavailable");
                    unavailable.push(UnavailableQuote::new(&group.instrument, e));
                }
            }
        }
        positions.sort_by(|a, b| {
            (&a.identifier, &a.exchange).cmp(&(&b.identifier, &b.exchange))
        });
        unavailable.sort_by(|a, b| {
            (&a.identifier, &a.exchange).cmp(&(&b.identifier, &b.exchange))
        });

        let mut kpis = PortfolioKpis::from_positions(&positions);
        kpis.upcoming_dividends = self.upcoming_dividends(&groups).await;

        PortfolioValuation {
            kpis,
            positions,
            unavailable,
        }
    }

    async fn upcoming_dividends(&self, groups: &[PositionGroup]) -> Decimal {
        let Some(source) = &self.dividends else {
            return Decimal::ZERO;
        };
        if groups.is_empty() {
            return Decimal::ZERO;
        }

        let mut identifiers: Vec<String> = groups
            .iter()
            .map(|g| g.instrument.identifier.clone())
            .collect();
        identifiers.dedup();

        match source.fetch_future_dividends(&identifiers).await {
            Ok(dividends) => {
                let today = self.resolver.cache().clock().now().date_naive();
                upcoming_dividends(&dividends, groups, self.options.currency, today)
            }
            Err(e) => {
                warn!(error = %e, "Dividend lookup failed, reporting zero");
                Decimal::ZERO
            }
        }
    }
}
