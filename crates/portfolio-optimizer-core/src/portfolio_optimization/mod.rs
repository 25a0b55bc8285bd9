//! Long-only mean-variance optimization: the constrained solver, the two
//! headline objectives and the efficient frontier built on them.

pub mod frontier;
pub mod mean_variance;
pub mod solver;

pub use frontier::{efficient_frontier, FrontierOutput, FrontierPoint};
pub use mean_variance::{
    efficient_return, maximize_sharpe, minimize_variance, solve, Objective,
    DEFAULT_RISK_FREE_RATE,
};
pub use solver::{SolverOutcome, SolverSettings};
