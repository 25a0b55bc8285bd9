use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PortfolioError;
use crate::portfolio::performance::{
    mat_vec_multiply, quadratic_form, vec_dot, TRADING_DAYS_PER_YEAR,
};
use crate::portfolio_optimization::solver::{
    minimize, LinearEquality, ObjectiveFunction, SolverOutcome, SolverSettings,
};
use crate::statistics::descriptive::sqrt_decimal;
use crate::statistics::ReturnStatistics;
use crate::types::Rate;
use crate::PortfolioResult;

/// Annual risk-free rate used when a request does not supply one.
pub const DEFAULT_RISK_FREE_RATE: Rate = dec!(0.06);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the optimizer is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Maximise (return - rf) / volatility.
    Sharpe,
    /// Minimise volatility.
    Variance,
}

impl FromStr for Objective {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sharpe" => Ok(Objective::Sharpe),
            "variance" => Ok(Objective::Variance),
            other => Err(PortfolioError::invalid(
                "objective",
                format!("Unknown objective '{other}'. Use: sharpe, variance"),
            )),
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Sharpe => write!(f, "sharpe"),
            Objective::Variance => write!(f, "variance"),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Long-only portfolio with the highest Sharpe ratio.
///
/// `objective_value` in the outcome is the negated Sharpe ratio.
pub fn maximize_sharpe(
    stats: &ReturnStatistics,
    risk_free_rate: Rate,
    settings: &SolverSettings,
) -> PortfolioResult<SolverOutcome> {
    let model = AnnualisedModel::new(stats)?;
    let objective = NegativeSharpe {
        model: &model,
        risk_free_rate,
    };
    minimize(&objective, &[], model.n(), settings)
}

/// Long-only portfolio with the lowest volatility.
///
/// `objective_value` in the outcome is the annualised volatility.
pub fn minimize_variance(
    stats: &ReturnStatistics,
    settings: &SolverSettings,
) -> PortfolioResult<SolverOutcome> {
    let model = AnnualisedModel::new(stats)?;
    let objective = Variance {
        model: &model,
        name: "min_variance",
    };
    minimize(&objective, &[], model.n(), settings)
}

/// Lowest-volatility portfolio whose annualised expected return equals
/// `target_return`.
///
/// `objective_value` in the outcome is the annualised volatility.
pub fn efficient_return(
    stats: &ReturnStatistics,
    target_return: Rate,
    settings: &SolverSettings,
) -> PortfolioResult<SolverOutcome> {
    let model = AnnualisedModel::new(stats)?;
    let objective = Variance {
        model: &model,
        name: "efficient_return",
    };
    let on_target = LinearEquality {
        coefficients: model.mu.clone(),
        target: target_return,
    };
    minimize(&objective, &[on_target], model.n(), settings)
}

/// Dispatch on [`Objective`].
pub fn solve(
    objective: Objective,
    stats: &ReturnStatistics,
    risk_free_rate: Rate,
    settings: &SolverSettings,
) -> PortfolioResult<SolverOutcome> {
    match objective {
        Objective::Sharpe => maximize_sharpe(stats, risk_free_rate, settings),
        Objective::Variance => minimize_variance(stats, settings),
    }
}

// ---------------------------------------------------------------------------
// Objectives
// ---------------------------------------------------------------------------

/// Daily statistics scaled to a 252-day year once, up front.
struct AnnualisedModel {
    mu: Vec<Decimal>,
    sigma: Vec<Vec<Decimal>>,
}

impl AnnualisedModel {
    fn new(stats: &ReturnStatistics) -> PortfolioResult<Self> {
        let n = stats.num_assets();
        if n == 0 {
            return Err(PortfolioError::InsufficientData(
                "At least one asset required".into(),
            ));
        }
        validate_covariance_matrix(&stats.covariance, n)?;
        Ok(Self {
            mu: stats.mean_returns.iter().map(|m| *m * TRADING_DAYS_PER_YEAR).collect(),
            sigma: stats
                .covariance
                .iter()
                .map(|row| row.iter().map(|c| *c * TRADING_DAYS_PER_YEAR).collect())
                .collect(),
        })
    }

    fn n(&self) -> usize {
        self.mu.len()
    }
}

/// w' Sigma w, minimised in place of volatility (same argmin, smooth at 0).
struct Variance<'a> {
    model: &'a AnnualisedModel,
    name: &'static str,
}

impl ObjectiveFunction for Variance<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn value(&self, w: &[Decimal]) -> Option<Decimal> {
        Some(quadratic_form(w, &self.model.sigma))
    }

    fn gradient(&self, w: &[Decimal]) -> Option<Vec<Decimal>> {
        Some(
            mat_vec_multiply(&self.model.sigma, w)
                .into_iter()
                .map(|v| dec!(2) * v)
                .collect(),
        )
    }

    fn reported_value(&self, w: &[Decimal]) -> Option<Decimal> {
        self.value(w).map(sqrt_decimal)
    }
}

/// -(w'mu - rf) / sqrt(w' Sigma w); undefined where volatility is zero.
struct NegativeSharpe<'a> {
    model: &'a AnnualisedModel,
    risk_free_rate: Rate,
}

impl ObjectiveFunction for NegativeSharpe<'_> {
    fn name(&self) -> &str {
        "max_sharpe"
    }

    fn value(&self, w: &[Decimal]) -> Option<Decimal> {
        let vol = sqrt_decimal(quadratic_form(w, &self.model.sigma));
        if vol.is_zero() {
            return None;
        }
        Some(-(vec_dot(w, &self.model.mu) - self.risk_free_rate) / vol)
    }

    // d/dw [-(r - rf) / s] = -mu / s + (r - rf) * Sigma w / s^3
    fn gradient(&self, w: &[Decimal]) -> Option<Vec<Decimal>> {
        let sigma_w = mat_vec_multiply(&self.model.sigma, w);
        let var = vec_dot(w, &sigma_w);
        let vol = sqrt_decimal(var);
        if vol.is_zero() {
            return None;
        }
        let excess = vec_dot(w, &self.model.mu) - self.risk_free_rate;
        let vol_cubed = var * vol;
        Some(
            self.model
                .mu
                .iter()
                .zip(sigma_w.iter())
                .map(|(m, sw)| -*m / vol + excess * *sw / vol_cubed)
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_covariance_matrix(cov: &[Vec<Decimal>], n: usize) -> PortfolioResult<()> {
    if cov.len() != n {
        return Err(PortfolioError::invalid(
            "covariance",
            format!("Expected {} rows but got {}", n, cov.len()),
        ));
    }
    for (i, row) in cov.iter().enumerate() {
        if row.len() != n {
            return Err(PortfolioError::invalid(
                "covariance",
                format!("Row {} has {} columns, expected {}", i, row.len(), n),
            ));
        }
    }
    let tolerance = dec!(0.0000001);
    for i in 0..n {
        if cov[i][i] < Decimal::ZERO {
            return Err(PortfolioError::invalid(
                "covariance",
                format!("Negative variance {} on the diagonal at {}", cov[i][i], i),
            ));
        }
        for j in (i + 1)..n {
            if (cov[i][j] - cov[j][i]).abs() > tolerance {
                return Err(PortfolioError::invalid(
                    "covariance",
                    format!(
                        "Not symmetric: [{},{}]={} != [{},{}]={}",
                        i, j, cov[i][j], j, i, cov[j][i]
                    ),
                ));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
