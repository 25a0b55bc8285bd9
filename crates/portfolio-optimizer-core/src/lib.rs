pub mod error;
pub mod market_data;
pub mod portfolio;
pub mod statistics;
pub mod types;

#[cfg(feature = "optimization")]
pub mod portfolio_optimization;

#[cfg(feature = "backtest")]
pub mod backtest;

pub mod api;

pub use error::PortfolioError;
pub use types::*;

/// Standard result type for all portfolio operations
pub type PortfolioResult<T> = Result<T, PortfolioError>;
