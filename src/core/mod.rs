//! Domain model, aggregators and the seams they depend on

pub mod budget;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod insights;
pub mod ledger;
pub mod log;
pub mod metal;
pub mod model;
pub mod positions;
pub mod price;
pub mod quotes;
pub mod transactions;
pub mod validate;

// Re-export main types for cleaner imports
pub use cache::QuoteCache;
pub use error::{InsightsError, SkippedRecord};
pub use price::{DividendProvider, PriceProvider, ProviderError};
pub use quotes::QuoteResolver;
