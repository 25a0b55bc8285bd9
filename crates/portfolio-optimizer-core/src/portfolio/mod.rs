pub mod performance;
pub mod weights;

pub use performance::{performance, sharpe_ratio, PortfolioPerformance};
pub use weights::WeightVector;
