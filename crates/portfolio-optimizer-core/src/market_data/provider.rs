use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::PortfolioError;
use crate::market_data::PriceSeries;
use crate::types::DateRange;
use crate::PortfolioResult;

/// Source of aligned adjusted-close histories.
///
/// Implementations must return rows aligned across `tickers` (in that order)
/// and fail with [`PortfolioError::InsufficientData`] when the range holds no
/// data. I/O or parse failures belong in [`PortfolioError::PriceHistory`].
pub trait PriceHistoryProvider {
    fn price_history(&self, tickers: &[String], range: &DateRange) -> PortfolioResult<PriceSeries>;
}

/// Provider backed by histories held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceHistory {
    histories: HashMap<String, Vec<(NaiveDate, Decimal)>>,
}

impl InMemoryPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the history of one ticker.
    pub fn insert(&mut self, ticker: impl Into<String>, prices: Vec<(NaiveDate, Decimal)>) {
        self.histories.insert(ticker.into(), prices);
    }

    pub fn with_history(
        mut self,
        ticker: impl Into<String>,
        prices: Vec<(NaiveDate, Decimal)>,
    ) -> Self {
        self.insert(ticker, prices);
        self
    }
}

impl PriceHistoryProvider for InMemoryPriceHistory {
    fn price_history(&self, tickers: &[String], range: &DateRange) -> PortfolioResult<PriceSeries> {
        let mut selected = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let history = self.histories.get(ticker).ok_or_else(|| {
                PortfolioError::InsufficientData(format!("No price history for {ticker}"))
            })?;
            let in_range: Vec<(NaiveDate, Decimal)> = history
                .iter()
                .filter(|(d, _)| range.contains(*d))
                .copied()
                .collect();
            if in_range.is_empty() {
                return Err(PortfolioError::InsufficientData(format!(
                    "No price history for {} between {} and {}",
                    ticker, range.start, range.end
                )));
            }
            selected.push((ticker.clone(), in_range));
        }

        let series = PriceSeries::align(&selected)?;
        if series.is_empty() {
            return Err(PortfolioError::InsufficientData(format!(
                "No common trading dates between {} and {}",
                range.start, range.end
            )));
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn provider() -> InMemoryPriceHistory {
        InMemoryPriceHistory::new()
            .with_history("AAA", vec![(d(1), dec!(10)), (d(2), dec!(11)), (d(3), dec!(12))])
            .with_history("BBB", vec![(d(2), dec!(5)), (d(3), dec!(6))])
    }

    #[test]
    fn test_returns_aligned_rows_in_request_order() {
        let range = DateRange::new(d(1), d(3)).unwrap();
        let series = provider()
            .price_history(&["BBB".into(), "AAA".into()], &range)
            .unwrap();
        assert_eq!(series.tickers(), &["BBB".to_string(), "AAA".to_string()]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.rows()[0], vec![dec!(5), dec!(11)]);
    }

    #[test]
    fn test_unknown_ticker_is_insufficient_data() {
        let range = DateRange::new(d(1), d(3)).unwrap();
        let err = provider()
            .price_history(&["ZZZ".into()], &range)
            .unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientData(_)));
    }

    #[test]
    fn test_empty_range_is_insufficient_data() {
        let range = DateRange::new(d(20), d(25)).unwrap();
        let err = provider()
            .price_history(&["AAA".into()], &range)
            .unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientData(_)));
    }
}
