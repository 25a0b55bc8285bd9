//! Price histories and the provider seam the engine consumes them through.

pub mod price_series;
pub mod provider;

pub use price_series::PriceSeries;
pub use provider::{InMemoryPriceHistory, PriceHistoryProvider};
