pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::cache::QuoteCache;
use crate::core::clock::SystemClock;
use crate::core::config::AppConfig;
use crate::core::insights::Insights;
use crate::core::ledger::{ConfiguredOwner, RequestContext};
use crate::core::metal::MetalDesk;
use crate::core::positions::PositionAggregator;
use crate::core::quotes::QuoteResolver;
use crate::providers::{MetalPriceProvider, StockServiceProvider};
use crate::store::LedgerFile;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Balance { months: u32 },
    Categories { months: u32, totals: bool },
    Budgets,
    Portfolio,
    Metals { code: Option<String> },
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    owner: Option<&str>,
) -> Result<()> {
    info!("finsight starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let clock = Arc::new(SystemClock);
    let ledger = Arc::new(LedgerFile::new(config.ledger_file_path()));
    let owners = Arc::new(ConfiguredOwner {
        default_owner: config.owner.clone(),
    });
    let insights = Insights::new(ledger, owners, clock.clone());
    let ctx = RequestContext {
        owner_hint: owner.map(str::to_string),
    };

    let cache = QuoteCache::new(store::open_cache_store(&config), clock.clone());
    let resolver = QuoteResolver::new(cache, config.resolver_options());
    let currency = config.currency;

    match command {
        AppCommand::Balance { months } => cli::balance::run(&insights, &ctx, months, currency)
            .await
            .context("Failed to compute balance"),
        AppCommand::Categories { months, totals } => {
            cli::categories::run(&insights, &ctx, months, totals, currency)
                .await
                .context("Failed to group transactions by category")
        }
        AppCommand::Budgets => cli::budgets::run(&insights, &ctx, currency)
            .await
            .context("Failed to estimate budgets"),
        AppCommand::Portfolio => {
            let stocks = Arc::new(
                StockServiceProvider::new(config.providers.stock_url(), currency, clock)
                    .context("Failed to build stock service client")?,
            );
            let positions =
                PositionAggregator::new(resolver, stocks.clone(), config.position_options())
                    .with_dividends(stocks);
            cli::portfolio::run(&insights, &ctx, &positions, currency)
                .await
                .context("Failed to valuate portfolio")
        }
        AppCommand::Metals { code } => {
            let metals = Arc::new(
                MetalPriceProvider::new(
                    config.providers.metal_price_url(),
                    config.providers.metal_price_key(),
                )
                .context("Failed to build metal price client")?,
            );
            let desk = MetalDesk::new(resolver, metals);
            cli::metals::run(&desk, code.as_deref())
                .await
                .context("Failed to fetch metal prices")
        }
    }
}
