//! Request/response boundary: fetch prices through a provider, run the
//! engine, wrap the result in a [`ComputationOutput`].

#[cfg(feature = "optimization")]
pub use optimize_api::*;

#[cfg(feature = "backtest")]
pub use backtest_api::*;

#[cfg(feature = "optimization")]
mod optimize_api {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde::{Deserialize, Serialize};
    use std::collections::HashSet;
    use std::time::Instant;
    use tracing::info;

    use crate::error::PortfolioError;
    use crate::market_data::PriceHistoryProvider;
    use crate::portfolio::performance::{mat_vec_multiply, quadratic_form, TRADING_DAYS_PER_YEAR};
    use crate::portfolio::{performance, sharpe_ratio, WeightVector};
    use crate::portfolio_optimization::frontier::{
        efficient_frontier, FrontierPoint, DEFAULT_FRONTIER_POINTS,
    };
    use crate::portfolio_optimization::mean_variance::{solve, Objective, DEFAULT_RISK_FREE_RATE};
    use crate::portfolio_optimization::solver::SolverSettings;
    use crate::statistics::ReturnStatistics;
    use crate::types::{with_metadata, ComputationOutput, DateRange, Rate};
    use crate::PortfolioResult;

    /// Trailing window of history used to estimate statistics (two years).
    pub const DEFAULT_LOOKBACK_DAYS: u32 = 730;

    /// Upper bound on requested frontier points.
    pub const MAX_FRONTIER_POINTS: usize = 500;

    const CONCENTRATION_WARNING: Decimal = dec!(0.40);
    const HHI_WARNING: Decimal = dec!(0.5);

    fn default_objective() -> Objective {
        Objective::Sharpe
    }

    fn default_lookback_days() -> u32 {
        DEFAULT_LOOKBACK_DAYS
    }

    fn default_frontier_points() -> usize {
        DEFAULT_FRONTIER_POINTS
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct OptimizationRequest {
        pub tickers: Vec<String>,
        #[serde(default = "default_objective")]
        pub objective: Objective,
        /// Annual risk-free rate as a decimal; 0.06 when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub risk_free_rate: Option<Rate>,
        /// Last date of the estimation window.
        pub as_of: NaiveDate,
        #[serde(default = "default_lookback_days")]
        pub lookback_days: u32,
        #[serde(default = "default_frontier_points")]
        pub frontier_points: usize,
        #[serde(default)]
        pub solver: SolverSettings,
    }

    impl OptimizationRequest {
        /// Request with every optional field at its default.
        pub fn new(tickers: Vec<String>, objective: Objective, as_of: NaiveDate) -> Self {
            Self {
                tickers,
                objective,
                risk_free_rate: None,
                as_of,
                lookback_days: DEFAULT_LOOKBACK_DAYS,
                frontier_points: DEFAULT_FRONTIER_POINTS,
                solver: SolverSettings::default(),
            }
        }

        pub fn effective_risk_free_rate(&self) -> Rate {
            self.risk_free_rate.unwrap_or(DEFAULT_RISK_FREE_RATE)
        }

        pub fn window(&self) -> DateRange {
            DateRange::trailing(self.as_of, self.lookback_days)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct AssetAllocation {
        pub ticker: String,
        pub weight: Decimal,
        pub weight_pct: Decimal,
        /// w_i * annualised mean return of asset i.
        pub contribution_to_return: Rate,
        /// w_i * (Sigma w)_i / sigma_p, annualised; sums to the volatility.
        pub contribution_to_risk: Decimal,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct OptimizationResult {
        pub tickers: Vec<String>,
        pub weights: WeightVector,
        pub expected_return: Rate,
        pub volatility: Decimal,
        pub sharpe_ratio: Decimal,
        pub frontier: Vec<FrontierPoint>,
        pub allocations: Vec<AssetAllocation>,
        pub hhi_concentration: Decimal,
        pub frontier_skipped: usize,
        pub objective_value: Decimal,
        pub iterations: u32,
    }

    /// Optimize a long-only portfolio over the trailing price window and trace
    /// its efficient frontier.
    pub fn optimize(
        request: &OptimizationRequest,
        provider: &dyn PriceHistoryProvider,
    ) -> PortfolioResult<ComputationOutput<OptimizationResult>> {
        let start = Instant::now();
        let mut warnings: Vec<String> = Vec::new();

        validate_request(request)?;
        let rf = request.effective_risk_free_rate();
        let window = request.window();
        info!(
            "optimizing {} assets ({}) over {} to {}",
            request.tickers.len(),
            request.objective,
            window.start,
            window.end
        );

        let prices = provider.price_history(&request.tickers, &window)?;
        let stats = ReturnStatistics::from_prices(&prices)?;

        let outcome = solve(request.objective, &stats, rf, &request.solver)?;
        let w = outcome.weights.as_slice();
        let perf = performance(w, &stats.mean_returns, &stats.covariance);
        let sharpe = sharpe_ratio(perf.expected_return, rf, perf.volatility);

        let frontier = efficient_frontier(&stats, request.frontier_points, &request.solver)?;

        let allocations = asset_allocations(&stats, w, perf.volatility);
        let hhi_concentration = outcome.weights.herfindahl();

        for a in &allocations {
            if a.weight > CONCENTRATION_WARNING {
                warnings.push(format!(
                    "Concentrated position: {} has weight {:.4}",
                    a.ticker, a.weight
                ));
            }
        }
        if hhi_concentration > HHI_WARNING {
            warnings.push(format!("High concentration: HHI = {:.4}", hhi_concentration));
        }
        if frontier.skipped > 0 {
            warnings.push(format!(
                "{} of {} frontier points did not converge and were skipped",
                frontier.skipped, request.frontier_points
            ));
        }
        if perf.expected_return - rf <= Decimal::ZERO {
            warnings.push(format!(
                "No excess return: expected return {:.4} does not exceed the risk-free rate {}",
                perf.expected_return, rf
            ));
        }

        let result = OptimizationResult {
            tickers: stats.tickers.clone(),
            weights: outcome.weights.clone(),
            expected_return: perf.expected_return,
            volatility: perf.volatility,
            sharpe_ratio: sharpe,
            frontier: frontier.points,
            allocations,
            hhi_concentration,
            frontier_skipped: frontier.skipped,
            objective_value: outcome.objective_value,
            iterations: outcome.iterations,
        };
        info!(
            "optimization finished: return {:.4}, volatility {:.4}, sharpe {:.4}",
            result.expected_return, result.volatility, result.sharpe_ratio
        );

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Long-only mean-variance optimization (augmented Lagrangian / spectral projected gradient)",
            &serde_json::json!({
                "n_assets": stats.num_assets(),
                "objective": request.objective.to_string(),
                "risk_free_rate": rf.to_string(),
                "window_start": window.start,
                "window_end": window.end,
                "observations": stats.observations,
                "trading_days_per_year": TRADING_DAYS_PER_YEAR.to_string(),
                "frontier_points": request.frontier_points,
                "long_only": true,
            }),
            warnings,
            elapsed,
            result,
        ))
    }

    /// Reject an empty ticker list, blank tickers and duplicates.
    pub fn validate_tickers(tickers: &[String]) -> PortfolioResult<()> {
        if tickers.is_empty() {
            return Err(PortfolioError::invalid("tickers", "At least one ticker required"));
        }
        let mut seen = HashSet::new();
        for t in tickers {
            if t.trim().is_empty() {
                return Err(PortfolioError::invalid("tickers", "Ticker must not be empty"));
            }
            if !seen.insert(t.as_str()) {
                return Err(PortfolioError::invalid(
                    "tickers",
                    format!("Duplicate ticker {t}"),
                ));
            }
        }
        Ok(())
    }

    fn validate_request(request: &OptimizationRequest) -> PortfolioResult<()> {
        validate_tickers(&request.tickers)?;
        if request.frontier_points > MAX_FRONTIER_POINTS {
            return Err(PortfolioError::invalid(
                "frontier_points",
                format!(
                    "{} requested, at most {} allowed",
                    request.frontier_points, MAX_FRONTIER_POINTS
                ),
            ));
        }
        if request.lookback_days == 0 {
            return Err(PortfolioError::invalid("lookback_days", "Must be positive"));
        }
        Ok(())
    }

    fn asset_allocations(
        stats: &ReturnStatistics,
        w: &[Decimal],
        volatility: Decimal,
    ) -> Vec<AssetAllocation> {
        let annual_means = stats.annualised_means();
        let annual_cov: Vec<Vec<Decimal>> = stats
            .covariance
            .iter()
            .map(|row| row.iter().map(|c| *c * TRADING_DAYS_PER_YEAR).collect())
            .collect();
        let sigma_w = mat_vec_multiply(&annual_cov, w);
        let variance = quadratic_form(w, &annual_cov);

        stats
            .tickers
            .iter()
            .enumerate()
            .map(|(i, ticker)| {
                let contribution_to_risk = if variance.is_zero() {
                    Decimal::ZERO
                } else {
                    w[i] * sigma_w[i] / variance * volatility
                };
                AssetAllocation {
                    ticker: ticker.clone(),
                    weight: w[i],
                    weight_pct: w[i] * dec!(100),
                    contribution_to_return: w[i] * annual_means[i],
                    contribution_to_risk,
                }
            })
            .collect()
    }

}

#[cfg(feature = "backtest")]
mod backtest_api {
    use std::time::Instant;
    use tracing::info;

    use crate::backtest::engine::{resolve_allocation, run_backtest, BacktestRequest, BacktestResult};
    use crate::market_data::PriceHistoryProvider;
    use crate::types::{with_metadata, ComputationOutput};
    use crate::PortfolioResult;

    /// Replay a static allocation over historical prices.
    pub fn backtest(
        request: &BacktestRequest,
        provider: &dyn PriceHistoryProvider,
    ) -> PortfolioResult<ComputationOutput<BacktestResult>> {
        let start = Instant::now();

        let allocation = resolve_allocation(request)?;
        info!(
            "backtesting {} assets from {} to {}",
            allocation.tickers.len(),
            request.date_range.start,
            request.date_range.end
        );
        let prices = provider.price_history(&allocation.tickers, &request.date_range)?;
        let result = run_backtest(
            &allocation,
            &prices,
            request.initial_investment,
            request.risk_free_rate_pct,
        )?;

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Static-weight historical backtest (no rebalancing, geometric annualisation)",
            &serde_json::json!({
                "tickers": allocation.tickers,
                "weights": allocation.weights.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
                "start": request.date_range.start,
                "end": request.date_range.end,
                "initial_investment": request.initial_investment.to_string(),
                "risk_free_rate_pct": request.risk_free_rate_pct.to_string(),
                "weight_policy": request.weight_policy,
                "beta": "fixed at 1.0, no benchmark",
            }),
            allocation.warnings,
            elapsed,
            result,
        ))
    }
}
