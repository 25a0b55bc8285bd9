//! Annualised expected return and volatility of a weighted portfolio.
//!
//! Forward-looking (linear) annualisation used by the optimizer. The backtest
//! uses geometric annualisation instead; see `backtest::metrics`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::statistics::descriptive::sqrt_decimal;

/// Trading days per year. Fixed by design, not configurable.
pub const TRADING_DAYS_PER_YEAR: Decimal = dec!(252);

/// sqrt(252), the volatility annualisation factor. Fixed by design.
pub const SQRT_TRADING_DAYS: Decimal = dec!(15.87450786638754354300969452);

/// Annualised (volatility, expected return) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPerformance {
    pub volatility: Decimal,
    pub expected_return: Decimal,
}

/// `expected_return = 252 * (w . mu)`, `volatility = sqrt(252) * sqrt(w' Sigma w)`.
///
/// `mean_returns` and `covariance` are daily statistics.
pub fn performance(
    weights: &[Decimal],
    mean_returns: &[Decimal],
    covariance: &[Vec<Decimal>],
) -> PortfolioPerformance {
    PortfolioPerformance {
        volatility: annualised_volatility(weights, covariance),
        expected_return: annualised_return(weights, mean_returns),
    }
}

/// 252 * (w . mu)
pub fn annualised_return(weights: &[Decimal], mean_returns: &[Decimal]) -> Decimal {
    TRADING_DAYS_PER_YEAR * vec_dot(weights, mean_returns)
}

/// sqrt(252) * sqrt(w' Sigma w); rounding noise below zero clamps to 0.
pub fn annualised_volatility(weights: &[Decimal], covariance: &[Vec<Decimal>]) -> Decimal {
    SQRT_TRADING_DAYS * sqrt_decimal(quadratic_form(weights, covariance))
}

/// Sharpe ratio with division-by-zero guard.
pub fn sharpe_ratio(ret: Decimal, rf: Decimal, volatility: Decimal) -> Decimal {
    if volatility.is_zero() {
        Decimal::ZERO
    } else {
        (ret - rf) / volatility
    }
}

/// w' * Sigma * w
pub fn quadratic_form(w: &[Decimal], sigma: &[Vec<Decimal>]) -> Decimal {
    vec_dot(w, &mat_vec_multiply(sigma, w))
}

/// Matrix-vector multiplication.
pub fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> Vec<Decimal> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Dot product.
pub fn vec_dot(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter().zip(b.iter()).map(|(x, y)| *x * *y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::MathematicalOps;

    fn cov() -> Vec<Vec<Decimal>> {
        vec![
            vec![dec!(0.0004), dec!(0.0001)],
            vec![dec!(0.0001), dec!(0.0002)],
        ]
    }

    #[test]
    fn test_sqrt_constant_matches_sqrt_252() {
        let diff = (SQRT_TRADING_DAYS * SQRT_TRADING_DAYS - TRADING_DAYS_PER_YEAR).abs();
        assert!(diff < dec!(0.0000000001));
    }

    #[test]
    fn test_expected_return_formula() {
        let mu = vec![dec!(0.001), dec!(0.0005)];
        let p = performance(&[dec!(0.6), dec!(0.4)], &mu, &cov());
        // 252 * (0.0006 + 0.0002)
        assert_eq!(p.expected_return, dec!(0.2016));
    }

    #[test]
    fn test_volatility_formula() {
        let w = [dec!(0.5), dec!(0.5)];
        let p = performance(&w, &[dec!(0), dec!(0)], &cov());
        // w'Sw = 0.25*0.0004 + 2*0.25*0.0001 + 0.25*0.0002 = 0.0002
        let expected = SQRT_TRADING_DAYS * dec!(0.0002).sqrt().unwrap();
        assert!((p.volatility - expected).abs() < dec!(0.000000000001));
    }

    #[test]
    fn test_expected_return_is_linear_in_weights() {
        let mu = vec![dec!(0.0012), dec!(-0.0003)];
        let base = annualised_return(&[dec!(0.4), dec!(0.3)], &mu);
        // Double the first weight, halve the second.
        let moved = annualised_return(&[dec!(0.8), dec!(0.15)], &mu);
        let expected_delta = TRADING_DAYS_PER_YEAR
            * (dec!(0.4) * mu[0] + (dec!(0.15) - dec!(0.3)) * mu[1]);
        assert_eq!(moved - base, expected_delta);
    }

    #[test]
    fn test_volatility_never_negative() {
        // Not PSD: quadratic form is negative for this vector.
        let bad = vec![vec![dec!(0.0001), dec!(0.0009)], vec![dec!(0.0009), dec!(0.0001)]];
        let vol = annualised_volatility(&[dec!(1), dec!(-1)], &bad);
        assert_eq!(vol, Decimal::ZERO);
        let p = performance(&[dec!(1), dec!(0)], &[dec!(0), dec!(0)], &cov());
        assert!(p.volatility >= Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_zero_volatility_guard() {
        assert_eq!(sharpe_ratio(dec!(0.10), dec!(0.06), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(sharpe_ratio(dec!(0.10), dec!(0.06), dec!(0.2)), dec!(0.2));
    }
}
