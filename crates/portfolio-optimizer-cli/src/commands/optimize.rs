use chrono::NaiveDate;
use clap::Args;
use portfolio_optimizer_core::api::{optimize, OptimizationRequest};
use portfolio_optimizer_core::portfolio_optimization::Objective;
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::Path;

use crate::config::CliConfig;
use crate::input;
use crate::provider::CsvPriceHistory;

/// Arguments for portfolio optimization
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to a JSON optimization request (overrides the flags below)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated tickers (e.g. "AAPL,MSFT,GOOG")
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Objective: sharpe or variance
    #[arg(long, default_value = "sharpe")]
    pub objective: String,

    /// Annual risk-free rate as a decimal (default 0.06)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Last date of the estimation window (YYYY-MM-DD, default today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Calendar days of history before --as-of (default 730)
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Efficient frontier points (default 50, max 500)
    #[arg(long)]
    pub frontier_points: Option<usize>,
}

pub fn run_optimize(
    args: OptimizeArgs,
    config: &CliConfig,
    data_dir: &Path,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = build_request(args, config)?;
    let provider = CsvPriceHistory::new(data_dir);
    let output = optimize(&request, &provider)?;
    Ok(serde_json::to_value(output)?)
}

fn build_request(
    args: OptimizeArgs,
    config: &CliConfig,
) -> Result<OptimizationRequest, Box<dyn std::error::Error>> {
    let mut request = if let Some(ref path) = args.input {
        input::file::read_json::<OptimizationRequest>(path)?
    } else if let Some(ref tickers) = args.tickers {
        from_flags(&args, tickers, config)?
    } else {
        match input::stdin::read_stdin::<OptimizationRequest>()? {
            Some(request) => request,
            None => {
                return Err(
                    "Provide --tickers or --input file or pipe a JSON request via stdin".into(),
                )
            }
        }
    };
    request.tickers = super::normalize_tickers(&request.tickers);
    Ok(request)
}

fn from_flags(
    args: &OptimizeArgs,
    tickers: &[String],
    config: &CliConfig,
) -> Result<OptimizationRequest, Box<dyn std::error::Error>> {
    let objective: Objective = args.objective.parse()?;
    let mut request = OptimizationRequest::new(
        tickers.to_vec(),
        objective,
        args.as_of.unwrap_or_else(super::today),
    );
    request.risk_free_rate = args.risk_free_rate.or(config.risk_free_rate);
    if let Some(days) = args.lookback_days.or(config.lookback_days) {
        request.lookback_days = days;
    }
    if let Some(points) = args.frontier_points.or(config.frontier_points) {
        request.frontier_points = points;
    }
    request.solver = config.solver_settings();
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn args(tickers: &[&str]) -> OptimizeArgs {
        OptimizeArgs {
            input: None,
            tickers: Some(tickers.iter().map(|t| t.to_string()).collect()),
            objective: "variance".into(),
            risk_free_rate: None,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 28),
            lookback_days: None,
            frontier_points: Some(10),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = CliConfig {
            risk_free_rate: Some(dec!(0.03)),
            frontier_points: Some(99),
            lookback_days: Some(365),
            ..CliConfig::default()
        };
        let req = build_request(args(&["AAA", "BBB"]), &config).unwrap();
        assert_eq!(req.objective, Objective::Variance);
        assert_eq!(req.frontier_points, 10);
        assert_eq!(req.lookback_days, 365);
        assert_eq!(req.effective_risk_free_rate(), dec!(0.03));
    }

    #[test]
    fn test_tickers_are_upper_cased() {
        let req = build_request(args(&[" aapl", "Msft"]), &CliConfig::default()).unwrap();
        assert_eq!(req.tickers, vec!["AAPL".to_string(), "MSFT".to_string()]);
    }

    #[test]
    fn test_unknown_objective() {
        let mut a = args(&["AAA"]);
        a.objective = "momentum".into();
        let err = build_request(a, &CliConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Unknown objective"));
    }
}
