use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::portfolio::performance::annualised_return;
use crate::portfolio_optimization::mean_variance::{efficient_return, minimize_variance};
use crate::portfolio_optimization::solver::{SolverOutcome, SolverSettings};
use crate::statistics::ReturnStatistics;
use crate::types::Rate;
use crate::PortfolioResult;

/// Fraction of the best single-asset return used as the top frontier target.
///
/// Targets near the best asset's return force the whole allocation into that
/// one asset, a corner where the return constraint is barely feasible.
pub const FRONTIER_RETURN_CAP: Decimal = dec!(0.8);

pub const DEFAULT_FRONTIER_POINTS: usize = 50;

/// One (risk, return) sample of the efficient frontier, both annualised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub risk: Decimal,
    pub expected_return: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierOutput {
    /// Solved points in order of increasing target return.
    pub points: Vec<FrontierPoint>,
    /// Targets dropped because their solve did not converge.
    pub skipped: usize,
}

/// Trace the efficient frontier between the minimum-variance return and
/// `FRONTIER_RETURN_CAP` times the best single-asset return.
///
/// Nonconvergent targets are skipped and counted; any other error aborts.
pub fn efficient_frontier(
    stats: &ReturnStatistics,
    point_count: usize,
    settings: &SolverSettings,
) -> PortfolioResult<FrontierOutput> {
    if point_count == 0 {
        return Ok(FrontierOutput {
            points: Vec::new(),
            skipped: 0,
        });
    }

    let min_var = minimize_variance(stats, settings)?;
    let min_return = annualised_return(min_var.weights.as_slice(), &stats.mean_returns);
    let best_asset = stats
        .annualised_means()
        .into_iter()
        .max()
        .unwrap_or(Decimal::ZERO);
    let max_return = FRONTIER_RETURN_CAP * best_asset;

    if max_return <= min_return {
        debug!(
            "frontier collapsed: cap {} <= min-variance return {}",
            max_return, min_return
        );
        return Ok(FrontierOutput {
            points: vec![FrontierPoint {
                risk: min_var.objective_value,
                expected_return: min_return,
            }],
            skipped: 0,
        });
    }

    let targets = linspace(min_return, max_return, point_count);
    let solved = solve_targets(stats, &targets, settings);

    let mut points = Vec::with_capacity(targets.len());
    let mut skipped = 0;
    for (target, outcome) in targets.iter().zip(solved) {
        match outcome {
            Ok(out) => points.push(FrontierPoint {
                risk: out.objective_value,
                expected_return: *target,
            }),
            Err(e) if e.is_nonconvergence() => {
                debug!("frontier target {} skipped: {}", target, e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(FrontierOutput { points, skipped })
}

#[cfg(not(feature = "parallel"))]
fn solve_targets(
    stats: &ReturnStatistics,
    targets: &[Rate],
    settings: &SolverSettings,
) -> Vec<PortfolioResult<SolverOutcome>> {
    targets
        .iter()
        .map(|t| efficient_return(stats, *t, settings))
        .collect()
}

#[cfg(feature = "parallel")]
fn solve_targets(
    stats: &ReturnStatistics,
    targets: &[Rate],
    settings: &SolverSettings,
) -> Vec<PortfolioResult<SolverOutcome>> {
    targets
        .par_iter()
        .map(|t| efficient_return(stats, *t, settings))
        .collect()
}

/// `count` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: Decimal, end: Decimal, count: usize) -> Vec<Decimal> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / Decimal::from((count - 1) as u64);
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        start + step * Decimal::from(i as u64)
                    }
                })
                .collect()
        }
    }
}
