use chrono::NaiveDate;
use csv::ReaderBuilder;
use portfolio_optimizer_core::market_data::{
    InMemoryPriceHistory, PriceHistoryProvider, PriceSeries,
};
use portfolio_optimizer_core::{DateRange, PortfolioError, PortfolioResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One row of a daily price file (Yahoo-style export).
#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(alias = "Date", alias = "DATE", alias = "Timestamp", alias = "timestamp")]
    date: String,
    #[serde(default, rename = "Adj Close", alias = "adj_close", alias = "AdjClose")]
    adj_close: Option<String>,
    #[serde(default, alias = "Close", alias = "CLOSE")]
    close: Option<String>,
}

/// Price histories read from `<data_dir>/<TICKER>.csv`.
///
/// Each file needs a `Date` column and an `Adj Close` or `Close` column;
/// `Adj Close` wins when both are present.
#[derive(Debug, Clone)]
pub struct CsvPriceHistory {
    data_dir: PathBuf,
}

impl CsvPriceHistory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn ticker_path(&self, ticker: &str) -> PortfolioResult<PathBuf> {
        if ticker.is_empty() || ticker.contains(['/', '\\']) || ticker.contains("..") {
            return Err(PortfolioError::invalid(
                "tickers",
                format!("'{ticker}' is not a valid ticker symbol"),
            ));
        }
        Ok(self.data_dir.join(format!("{ticker}.csv")))
    }

    fn load(&self, ticker: &str) -> PortfolioResult<Vec<(NaiveDate, Decimal)>> {
        let path = self.ticker_path(ticker)?;
        if !path.is_file() {
            return Err(PortfolioError::InsufficientData(format!(
                "No price history for {} (expected {})",
                ticker,
                path.display()
            )));
        }
        load_price_csv(&path)
    }
}

impl PriceHistoryProvider for CsvPriceHistory {
    fn price_history(&self, tickers: &[String], range: &DateRange) -> PortfolioResult<PriceSeries> {
        let mut histories = InMemoryPriceHistory::new();
        for ticker in tickers {
            histories.insert(ticker.clone(), self.load(ticker)?);
        }
        histories.price_history(tickers, range)
    }
}

/// Load `(date, price)` pairs from one CSV file, skipping rows whose date or
/// price does not parse (e.g. Yahoo's `null` rows).
pub fn load_price_csv(path: &Path) -> PortfolioResult<Vec<(NaiveDate, Decimal)>> {
    info!("Loading prices from: {}", path.display());

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PortfolioError::PriceHistory(format!("{}: {}", path.display(), e)))?;

    let mut prices = Vec::new();
    let mut skipped = 0;
    for (row_num, result) in reader.deserialize::<PriceRow>().enumerate() {
        let row = result
            .map_err(|e| PortfolioError::PriceHistory(format!("{}: {}", path.display(), e)))?;

        let raw = row
            .adj_close
            .filter(|s| !s.is_empty())
            .or(row.close.filter(|s| !s.is_empty()));
        let parsed = raw.as_deref().and_then(|s| s.parse::<Decimal>().ok());
        match (parse_date(&row.date), parsed) {
            (Some(date), Some(price)) => prices.push((date, price)),
            _ => {
                debug!("Skipping row {} of {}", row_num + 1, path.display());
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unparseable rows in {}", skipped, path.display());
    }
    if prices.is_empty() && skipped == 0 {
        return Err(PortfolioError::PriceHistory(format!(
            "{}: no price column found (need 'Adj Close' or 'Close') or file is empty",
            path.display()
        )));
    }

    prices.sort_by_key(|(d, _)| *d);
    Ok(prices)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%m/%d/%Y"))
        .ok()
}
