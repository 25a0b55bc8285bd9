//! Realised performance metrics of a daily portfolio return series.
//!
//! Annualisation here is geometric (compounded mean daily return), unlike the
//! linear scaling the optimizer uses for expected returns.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::PortfolioError;
use crate::portfolio::performance::{SQRT_TRADING_DAYS, TRADING_DAYS_PER_YEAR};
use crate::statistics::descriptive::{mean, sample_std_dev};
use crate::types::Percent;
use crate::PortfolioResult;

const HUNDRED: Decimal = dec!(100);

/// Running product of `(1 + r_t)`, seeded at 1.
pub fn cumulative_growth(returns: &[Decimal]) -> PortfolioResult<Vec<Decimal>> {
    let mut acc = Decimal::ONE;
    returns
        .iter()
        .map(|r| {
            acc = Decimal::ONE
                .checked_add(*r)
                .and_then(|g| g.checked_mul(acc))
                .ok_or_else(|| overflow("cumulative growth"))?;
            Ok(acc)
        })
        .collect()
}

/// `(final cumulative - 1) * 100`; zero for an empty series.
pub fn total_return_pct(cumulative: &[Decimal]) -> PortfolioResult<Percent> {
    match cumulative.last() {
        Some(c) => to_pct(*c, "total return"),
        None => Ok(Decimal::ZERO),
    }
}

/// `((1 + mean r)^252 - 1) * 100`.
pub fn annualized_return_pct(returns: &[Decimal]) -> PortfolioResult<Percent> {
    let growth = Decimal::ONE
        .checked_add(mean(returns))
        .and_then(|g| g.checked_powi(252))
        .ok_or_else(|| overflow("annualized return"))?;
    to_pct(growth, "annualized return")
}

/// `(growth - 1) * 100` without panicking near `Decimal::MAX`.
fn to_pct(growth: Decimal, context: &str) -> PortfolioResult<Percent> {
    growth
        .checked_sub(Decimal::ONE)
        .and_then(|g| g.checked_mul(HUNDRED))
        .ok_or_else(|| overflow(context))
}

fn overflow(context: &str) -> PortfolioError {
    PortfolioError::NumericOverflow {
        context: context.to_string(),
    }
}

/// Sample standard deviation of daily returns, annualised, as a percentage.
pub fn volatility_pct(returns: &[Decimal]) -> Percent {
    sample_std_dev(returns) * SQRT_TRADING_DAYS * HUNDRED
}

/// `mean(r - rf_daily) / stddev(r) * sqrt(252)` with `rf_daily = rf% / 100 / 252`.
///
/// Zero when the returns have no dispersion.
pub fn sharpe_ratio(returns: &[Decimal], risk_free_rate_pct: Percent) -> Decimal {
    let std_dev = sample_std_dev(returns);
    if std_dev.is_zero() {
        return Decimal::ZERO;
    }
    let rf_daily = risk_free_rate_pct / HUNDRED / TRADING_DAYS_PER_YEAR;
    let excess: Vec<Decimal> = returns.iter().map(|r| *r - rf_daily).collect();
    mean(&excess) / std_dev * SQRT_TRADING_DAYS
}

/// Worst peak-to-trough fall of the cumulative series, as a (non-positive)
/// percentage. The running peak starts at the first cumulative value.
pub fn max_drawdown_pct(cumulative: &[Decimal]) -> Percent {
    let mut peak = match cumulative.first() {
        Some(first) => *first,
        None => return Decimal::ZERO,
    };
    let mut worst = Decimal::ZERO;
    for value in cumulative {
        if *value > peak {
            peak = *value;
        }
        let dd = (*value - peak) / peak;
        if dd < worst {
            worst = dd;
        }
    }
    worst * HUNDRED
}

/// Excess of the annualised return over the risk-free rate, in percentage
/// points. Not a regression alpha: no benchmark is involved.
pub fn alpha(annualized_return_pct: Percent, risk_free_rate_pct: Percent) -> Percent {
    annualized_return_pct - risk_free_rate_pct
}
