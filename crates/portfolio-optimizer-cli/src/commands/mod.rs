pub mod backtest;
pub mod frontier;
pub mod optimize;

use chrono::NaiveDate;

/// Default `--as-of`: today in local time.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Price files are named `<TICKER>.csv` in upper case.
pub(crate) fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

pub(crate) fn normalize_tickers(tickers: &[String]) -> Vec<String> {
    tickers.iter().map(|t| normalize_ticker(t)).collect()
}
