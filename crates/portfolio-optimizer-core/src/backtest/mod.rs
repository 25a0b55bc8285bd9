//! Historical replay of a static allocation and its realised metrics.

pub mod engine;
pub mod metrics;

pub use engine::{
    resolve_allocation, run_backtest, AllocationInput, BacktestRequest, BacktestResult,
    PerformancePoint, ResolvedAllocation, WeightPolicy,
};
