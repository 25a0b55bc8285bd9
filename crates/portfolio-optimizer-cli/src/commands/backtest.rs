use chrono::NaiveDate;
use clap::Args;
use portfolio_optimizer_core::api::backtest;
use portfolio_optimizer_core::backtest::{AllocationInput, BacktestRequest, WeightPolicy};
use portfolio_optimizer_core::DateRange;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::path::Path;

use crate::config::CliConfig;
use crate::input;
use crate::provider::CsvPriceHistory;

/// Arguments for a historical backtest
#[derive(Args)]
pub struct BacktestArgs {
    /// Path to a JSON backtest request (overrides the flags below)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated TICKER=PERCENT pairs (e.g. "AAPL=60,MSFT=40")
    #[arg(long, value_delimiter = ',')]
    pub allocation: Option<Vec<String>>,

    /// First date of the backtest (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date of the backtest (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Starting portfolio value
    #[arg(long, default_value = "10000")]
    pub initial_investment: Decimal,

    /// Annual risk-free rate in percent (e.g. 4.5)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Rescale weights that do not sum to 100 instead of rejecting them
    #[arg(long)]
    pub renormalize: bool,
}

pub fn run_backtest(
    args: BacktestArgs,
    config: &CliConfig,
    data_dir: &Path,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = build_request(args, config)?;
    let provider = CsvPriceHistory::new(data_dir);
    let output = backtest(&request, &provider)?;
    Ok(serde_json::to_value(output)?)
}

fn build_request(
    args: BacktestArgs,
    config: &CliConfig,
) -> Result<BacktestRequest, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return Ok(normalized(input::file::read_json(path)?));
    }
    let Some(pairs) = args.allocation else {
        return match input::stdin::read_stdin::<BacktestRequest>()? {
            Some(request) => Ok(normalized(request)),
            None => {
                Err("Provide --allocation or --input file or pipe a JSON request via stdin".into())
            }
        };
    };

    let (Some(start), Some(end)) = (args.start, args.end) else {
        return Err("--start and --end are required with --allocation".into());
    };

    let weight_policy = if args.renormalize {
        WeightPolicy::Renormalize
    } else {
        config.weight_policy.unwrap_or_default()
    };
    let risk_free_rate_pct = args
        .risk_free_rate
        .or(config.risk_free_rate.map(|r| r * dec!(100)))
        .unwrap_or(dec!(6));

    Ok(BacktestRequest {
        allocations: pairs
            .iter()
            .map(|p| parse_allocation(p))
            .collect::<Result<_, _>>()?,
        date_range: DateRange::new(start, end)?,
        initial_investment: args.initial_investment,
        risk_free_rate_pct,
        weight_policy,
    })
}

fn normalized(mut request: BacktestRequest) -> BacktestRequest {
    for a in &mut request.allocations {
        a.ticker = super::normalize_ticker(&a.ticker);
    }
    request
}

/// Parse one `TICKER=PERCENT` pair.
fn parse_allocation(pair: &str) -> Result<AllocationInput, String> {
    let (ticker, weight) = pair
        .split_once('=')
        .ok_or_else(|| format!("Invalid allocation '{}': expected TICKER=PERCENT", pair))?;
    let weight_pct = weight
        .trim()
        .trim_end_matches('%')
        .parse::<Decimal>()
        .map_err(|e| format!("Invalid weight in '{}': {}", pair, e))?;
    Ok(AllocationInput {
        ticker: super::normalize_ticker(ticker),
        weight_pct,
    })
}
