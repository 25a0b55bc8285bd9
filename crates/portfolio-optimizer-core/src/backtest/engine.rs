use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::backtest::metrics::{
    alpha, annualized_return_pct, cumulative_growth, max_drawdown_pct, sharpe_ratio,
    total_return_pct, volatility_pct,
};
use crate::error::PortfolioError;
use crate::market_data::PriceSeries;
use crate::statistics::ReturnSeries;
use crate::types::{DateRange, Money, Percent};
use crate::PortfolioResult;

/// Allowed deviation of allocation percentages from 100 under
/// [`WeightPolicy::Strict`].
pub const WEIGHT_PCT_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How allocation percentages that do not sum to 100 are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPolicy {
    /// Reject unless the percentages sum to 100 +/- 0.01.
    #[default]
    Strict,
    /// Rescale to 100 and report a warning.
    Renormalize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInput {
    pub ticker: String,
    /// Share of the portfolio, in percent (60 = 60%).
    pub weight_pct: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub allocations: Vec<AllocationInput>,
    pub date_range: DateRange,
    pub initial_investment: Money,
    /// Annual risk-free rate, in percent.
    pub risk_free_rate_pct: Percent,
    #[serde(default)]
    pub weight_policy: WeightPolicy,
}

/// Portfolio value at the close of one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub total_return_pct: Percent,
    pub annualized_return_pct: Percent,
    pub volatility_pct: Percent,
    pub sharpe_ratio: Decimal,
    /// Always <= 0.
    pub max_drawdown_pct: Percent,
    /// Annualised return minus the risk-free rate, in percentage points.
    pub alpha: Percent,
    /// Fixed at 1: no benchmark regression is performed.
    pub beta: Decimal,
    pub performance: Vec<PerformancePoint>,
    pub trading_days: usize,
}

/// Validated allocation: tickers in request order with fractional weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAllocation {
    pub tickers: Vec<String>,
    pub weights: Vec<Decimal>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Validate a request and turn its percentages into fractional weights.
pub fn resolve_allocation(request: &BacktestRequest) -> PortfolioResult<ResolvedAllocation> {
    if request.allocations.is_empty() {
        return Err(PortfolioError::invalid(
            "allocations",
            "At least one allocation required",
        ));
    }
    if request.initial_investment <= Decimal::ZERO {
        return Err(PortfolioError::invalid(
            "initial_investment",
            format!("Must be positive, got {}", request.initial_investment),
        ));
    }

    let mut seen = HashSet::new();
    for a in &request.allocations {
        if a.ticker.trim().is_empty() {
            return Err(PortfolioError::invalid("allocations", "Ticker must not be empty"));
        }
        if !seen.insert(a.ticker.as_str()) {
            return Err(PortfolioError::invalid(
                "allocations",
                format!("Duplicate ticker {}", a.ticker),
            ));
        }
        if a.weight_pct < Decimal::ZERO {
            return Err(PortfolioError::invalid(
                "allocations",
                format!("Negative weight {}% for {}", a.weight_pct, a.ticker),
            ));
        }
    }

    let total: Decimal = request.allocations.iter().map(|a| a.weight_pct).sum();
    if total.is_zero() {
        return Err(PortfolioError::invalid(
            "allocations",
            "Allocation weights sum to zero",
        ));
    }

    let mut warnings = Vec::new();
    let scale = if (total - dec!(100)).abs() <= WEIGHT_PCT_TOLERANCE {
        dec!(100)
    } else {
        match request.weight_policy {
            WeightPolicy::Strict => {
                return Err(PortfolioError::invalid(
                    "allocations",
                    format!("Weights sum to {}%, expected 100%", total),
                ));
            }
            WeightPolicy::Renormalize => {
                warn!("allocation weights sum to {}%, renormalising to 100%", total);
                warnings.push(format!(
                    "Allocation weights summed to {}% and were rescaled to 100%",
                    total
                ));
                total
            }
        }
    };

    Ok(ResolvedAllocation {
        tickers: request.allocations.iter().map(|a| a.ticker.clone()).collect(),
        weights: request
            .allocations
            .iter()
            .map(|a| a.weight_pct / scale)
            .collect(),
        warnings,
    })
}

/// Replay a static, never-rebalanced allocation over `prices`.
///
/// `prices` must hold the allocation's tickers in the same order.
pub fn run_backtest(
    allocation: &ResolvedAllocation,
    prices: &PriceSeries,
    initial_investment: Money,
    risk_free_rate_pct: Percent,
) -> PortfolioResult<BacktestResult> {
    if prices.tickers() != allocation.tickers.as_slice() {
        return Err(PortfolioError::invalid(
            "prices",
            "Price columns do not match the allocation tickers",
        ));
    }
    if prices.is_empty() {
        return Err(PortfolioError::InsufficientData(
            "No price history in the requested range".into(),
        ));
    }

    let returns = ReturnSeries::from_prices(prices)?;
    let daily = returns.weighted(&allocation.weights);
    let cumulative = cumulative_growth(&daily)?;

    let annualized = annualized_return_pct(&daily)?;
    let performance = returns
        .dates()
        .iter()
        .zip(cumulative.iter())
        .map(|(date, c)| {
            let value = c.checked_mul(initial_investment).ok_or_else(|| {
                PortfolioError::NumericOverflow {
                    context: format!("portfolio value on {date}"),
                }
            })?;
            Ok(PerformancePoint { date: *date, value })
        })
        .collect::<PortfolioResult<Vec<_>>>()?;

    let result = BacktestResult {
        total_return_pct: total_return_pct(&cumulative)?,
        annualized_return_pct: annualized,
        volatility_pct: volatility_pct(&daily),
        sharpe_ratio: sharpe_ratio(&daily, risk_free_rate_pct),
        max_drawdown_pct: max_drawdown_pct(&cumulative),
        alpha: alpha(annualized, risk_free_rate_pct),
        beta: Decimal::ONE,
        performance,
        trading_days: daily.len(),
    };
    info!(
        "backtest of {} assets over {} trading days: total return {}%",
        allocation.tickers.len(),
        result.trading_days,
        result.total_return_pct.round_dp(4)
    );
    Ok(result)
}
