pub mod metal_price;
pub mod stock_service;
pub mod util;

pub use metal_price::MetalPriceProvider;
pub use stock_service::StockServiceProvider;
