use chrono::NaiveDate;
use clap::Args;
use portfolio_optimizer_core::api::{validate_tickers, DEFAULT_LOOKBACK_DAYS, MAX_FRONTIER_POINTS};
use portfolio_optimizer_core::market_data::PriceHistoryProvider;
use portfolio_optimizer_core::portfolio_optimization::frontier::{
    efficient_frontier, DEFAULT_FRONTIER_POINTS, FRONTIER_RETURN_CAP,
};
use portfolio_optimizer_core::statistics::ReturnStatistics;
use portfolio_optimizer_core::{with_metadata, DateRange};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

use crate::config::CliConfig;
use crate::provider::CsvPriceHistory;

/// Arguments for tracing the efficient frontier alone
#[derive(Args)]
pub struct FrontierArgs {
    /// Comma-separated tickers
    #[arg(long, value_delimiter = ',', required = true)]
    pub tickers: Vec<String>,

    /// Number of target returns to solve (default 50, max 500)
    #[arg(long)]
    pub points: Option<usize>,

    /// Last date of the estimation window (YYYY-MM-DD, default today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Calendar days of history before --as-of (default 730)
    #[arg(long)]
    pub lookback_days: Option<u32>,
}

pub fn run_frontier(
    args: FrontierArgs,
    config: &CliConfig,
    data_dir: &Path,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let tickers = super::normalize_tickers(&args.tickers);
    validate_tickers(&tickers)?;
    let points = args
        .points
        .or(config.frontier_points)
        .unwrap_or(DEFAULT_FRONTIER_POINTS);
    if points > MAX_FRONTIER_POINTS {
        return Err(format!("--points must be at most {}", MAX_FRONTIER_POINTS).into());
    }
    let window = DateRange::trailing(
        args.as_of.unwrap_or_else(super::today),
        args.lookback_days
            .or(config.lookback_days)
            .unwrap_or(DEFAULT_LOOKBACK_DAYS),
    );

    let provider = CsvPriceHistory::new(data_dir);
    let prices = provider.price_history(&tickers, &window)?;
    let stats = ReturnStatistics::from_prices(&prices)?;
    let frontier = efficient_frontier(&stats, points, &config.solver_settings())?;

    let mut warnings = Vec::new();
    if frontier.skipped > 0 {
        warnings.push(format!(
            "{} of {} frontier points did not converge and were skipped",
            frontier.skipped, points
        ));
    }

    let output = with_metadata(
        "Efficient frontier: minimum volatility at evenly spaced target returns",
        &serde_json::json!({
            "tickers": tickers,
            "window_start": window.start,
            "window_end": window.end,
            "points_requested": points,
            "return_cap": FRONTIER_RETURN_CAP.to_string(),
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        frontier,
    );
    Ok(serde_json::to_value(output)?)
}
