use chrono::{Duration, NaiveDate};
use portfolio_optimizer_core::api::{backtest, optimize, OptimizationRequest};
use portfolio_optimizer_core::backtest::{AllocationInput, BacktestRequest, WeightPolicy};
use portfolio_optimizer_core::market_data::InMemoryPriceHistory;
use portfolio_optimizer_core::portfolio_optimization::Objective;
use portfolio_optimizer_core::{DateRange, PortfolioError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// End-to-end: prices -> optimize -> backtest through the public API
// ===========================================================================

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
}

/// Deterministic daily returns in [-2%, +2%] from a linear congruential
/// sequence, with a per-ticker drift in basis points.
fn synthetic_history(seed: u64, drift_bp: i64, days: usize) -> Vec<(NaiveDate, Decimal)> {
    let mut state = seed;
    let mut price = dec!(100);
    let mut out = Vec::with_capacity(days);
    for i in 0..days {
        out.push((start_date() + Duration::days(i as i64), price));
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let bp = ((state >> 33) % 401) as i64 - 200 + drift_bp;
        price *= Decimal::ONE + Decimal::new(bp, 4);
    }
    out
}

fn provider() -> InMemoryPriceHistory {
    InMemoryPriceHistory::new()
        .with_history("ALPHA", synthetic_history(7, 8, 120))
        .with_history("BETA", synthetic_history(1234, 3, 120))
        .with_history("GAMMA", synthetic_history(99, 5, 120))
}

fn tickers() -> Vec<String> {
    vec!["ALPHA".into(), "BETA".into(), "GAMMA".into()]
}

fn full_range() -> DateRange {
    DateRange::new(start_date(), as_of()).unwrap()
}

// ---------------------------------------------------------------------------
// Optimize
// ---------------------------------------------------------------------------

#[test]
fn test_optimize_weights_are_valid() {
    let p = provider();
    for objective in [Objective::Sharpe, Objective::Variance] {
        let mut req = OptimizationRequest::new(tickers(), objective, as_of());
        req.frontier_points = 8;
        let out = optimize(&req, &p).unwrap();
        let w = out.result.weights.as_slice();
        let total: Decimal = w.iter().sum();
        assert!((total - Decimal::ONE).abs() <= dec!(0.000001), "sum {}", total);
        assert!(w.iter().all(|x| *x >= Decimal::ZERO && *x <= Decimal::ONE));
        assert!(out.result.volatility >= Decimal::ZERO);
        assert_eq!(out.result.allocations.len(), 3);
    }
}

#[test]
fn test_frontier_targets_non_decreasing() {
    let mut req = OptimizationRequest::new(tickers(), Objective::Variance, as_of());
    req.frontier_points = 10;
    let out = optimize(&req, &provider()).unwrap();
    let frontier = &out.result.frontier;
    assert!(!frontier.is_empty());
    for pair in frontier.windows(2) {
        assert!(pair[1].expected_return >= pair[0].expected_return);
    }
}

#[test]
fn test_frontier_point_count_is_bounded() {
    let mut req = OptimizationRequest::new(tickers(), Objective::Sharpe, as_of());
    req.frontier_points = 501;
    let err = optimize(&req, &provider()).unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidRequest { .. }));
}

#[test]
fn test_unknown_ticker_is_insufficient_data() {
    let req = OptimizationRequest::new(vec!["ALPHA".into(), "NOPE".into()], Objective::Sharpe, as_of());
    let err = optimize(&req, &provider()).unwrap_err();
    assert!(matches!(err, PortfolioError::InsufficientData(_)));
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn test_min_variance_volatility_reproduced_by_backtest() {
    let p = provider();
    let mut req = OptimizationRequest::new(tickers(), Objective::Variance, as_of());
    req.frontier_points = 0;
    let opt = optimize(&req, &p).unwrap().result;

    let bt_req = BacktestRequest {
        allocations: opt
            .allocations
            .iter()
            .map(|a| AllocationInput {
                ticker: a.ticker.clone(),
                weight_pct: a.weight_pct,
            })
            .collect(),
        date_range: full_range(),
        initial_investment: dec!(10000),
        risk_free_rate_pct: dec!(6),
        weight_policy: WeightPolicy::Strict,
    };
    let bt = backtest(&bt_req, &p).unwrap().result;

    // Same returns, same sample covariance: the two volatilities agree.
    let optimizer_vol_pct = opt.volatility * dec!(100);
    assert!(
        (bt.volatility_pct - optimizer_vol_pct).abs() < dec!(0.000001),
        "backtest {} vs optimizer {}",
        bt.volatility_pct,
        optimizer_vol_pct
    );
    assert_eq!(bt.trading_days, 119);
    assert_eq!(bt.performance.len(), 119);
    assert!(bt.max_drawdown_pct <= Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// Backtest
// ---------------------------------------------------------------------------

#[test]
fn test_backtest_performance_tracks_investment() {
    let req = BacktestRequest {
        allocations: vec![
            AllocationInput { ticker: "ALPHA".into(), weight_pct: dec!(60) },
            AllocationInput { ticker: "BETA".into(), weight_pct: dec!(40) },
        ],
        date_range: full_range(),
        initial_investment: dec!(5000),
        risk_free_rate_pct: dec!(4),
        weight_policy: WeightPolicy::Strict,
    };
    let out = backtest(&req, &provider()).unwrap();
    let r = &out.result;
    let last = r.performance.last().unwrap();
    let implied = (last.value / dec!(5000) - Decimal::ONE) * dec!(100);
    assert!((implied - r.total_return_pct).abs() < dec!(0.0000001));
    assert_eq!(r.alpha, r.annualized_return_pct - dec!(4));
    assert_eq!(r.beta, Decimal::ONE);
    assert!(out.warnings.is_empty());
}

#[test]
fn test_backtest_renormalize_warns() {
    let req = BacktestRequest {
        allocations: vec![
            AllocationInput { ticker: "ALPHA".into(), weight_pct: dec!(1) },
            AllocationInput { ticker: "GAMMA".into(), weight_pct: dec!(3) },
        ],
        date_range: full_range(),
        initial_investment: dec!(100),
        risk_free_rate_pct: dec!(0),
        weight_policy: WeightPolicy::Renormalize,
    };
    let out = backtest(&req, &provider()).unwrap();
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_single_day_history_is_insufficient() {
    let one_day = InMemoryPriceHistory::new()
        .with_history("ALPHA", vec![(start_date(), dec!(100))])
        .with_history("BETA", vec![(start_date(), dec!(50))]);

    let req = OptimizationRequest::new(vec!["ALPHA".into(), "BETA".into()], Objective::Sharpe, as_of());
    assert!(matches!(
        optimize(&req, &one_day).unwrap_err(),
        PortfolioError::InsufficientData(_)
    ));

    let bt_req = BacktestRequest {
        allocations: vec![AllocationInput { ticker: "ALPHA".into(), weight_pct: dec!(100) }],
        date_range: full_range(),
        initial_investment: dec!(100),
        risk_free_rate_pct: dec!(0),
        weight_policy: WeightPolicy::Strict,
    };
    assert!(matches!(
        backtest(&bt_req, &one_day).unwrap_err(),
        PortfolioError::InsufficientData(_)
    ));
}

#[test]
fn test_backtest_range_outside_history() {
    let req = BacktestRequest {
        allocations: vec![AllocationInput { ticker: "BETA".into(), weight_pct: dec!(100) }],
        date_range: DateRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 6, 30).unwrap(),
        )
        .unwrap(),
        initial_investment: dec!(100),
        risk_free_rate_pct: dec!(0),
        weight_policy: WeightPolicy::Strict,
    };
    assert!(matches!(
        backtest(&req, &provider()).unwrap_err(),
        PortfolioError::InsufficientData(_)
    ));
}
