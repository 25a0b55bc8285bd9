use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::PortfolioError;
use crate::types::DateRange;
use crate::PortfolioResult;

/// Adjusted close prices for several tickers on common trading dates.
///
/// Invariants: dates strictly increasing, one price per ticker in every row,
/// every price strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    /// Row-major: `rows[t][i]` is the price of ticker `i` on `dates[t]`.
    rows: Vec<Vec<Decimal>>,
}

impl PriceSeries {
    /// Build from already-aligned rows, validating the invariants.
    pub fn new(
        tickers: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<Decimal>>,
    ) -> PortfolioResult<Self> {
        if tickers.is_empty() {
            return Err(PortfolioError::InsufficientData(
                "At least one ticker required".into(),
            ));
        }
        if dates.len() != rows.len() {
            return Err(PortfolioError::invalid(
                "rows",
                format!("{} dates but {} price rows", dates.len(), rows.len()),
            ));
        }
        for (t, row) in rows.iter().enumerate() {
            if row.len() != tickers.len() {
                return Err(PortfolioError::invalid(
                    "rows",
                    format!(
                        "Row {} has {} prices, expected {}",
                        t,
                        row.len(),
                        tickers.len()
                    ),
                ));
            }
            if let Some(i) = row.iter().position(|p| *p <= Decimal::ZERO) {
                return Err(PortfolioError::invalid(
                    "rows",
                    format!(
                        "Non-positive price {} for {} on {}",
                        row[i], tickers[i], dates[t]
                    ),
                ));
            }
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(PortfolioError::invalid(
                "dates",
                format!("Dates not strictly increasing: {} then {}", w[0], w[1]),
            ));
        }
        Ok(Self {
            tickers,
            dates,
            rows,
        })
    }

    /// Join per-ticker histories on their common dates.
    ///
    /// A date missing for any ticker is dropped for all of them. Within one
    /// ticker, a repeated date keeps the last observation.
    pub fn align(histories: &[(String, Vec<(NaiveDate, Decimal)>)]) -> PortfolioResult<Self> {
        if histories.is_empty() {
            return Err(PortfolioError::InsufficientData(
                "At least one ticker required".into(),
            ));
        }

        let mut by_ticker: Vec<BTreeMap<NaiveDate, Decimal>> = Vec::with_capacity(histories.len());
        for (ticker, observations) in histories {
            if observations.is_empty() {
                return Err(PortfolioError::InsufficientData(format!(
                    "No price history for {ticker}"
                )));
            }
            by_ticker.push(observations.iter().copied().collect());
        }

        let mut common: BTreeSet<NaiveDate> = by_ticker[0].keys().copied().collect();
        for series in &by_ticker[1..] {
            common.retain(|d| series.contains_key(d));
        }

        let union: BTreeSet<NaiveDate> = by_ticker.iter().flat_map(|s| s.keys().copied()).collect();
        if union.len() > common.len() {
            debug!(
                "Dropped {} dates missing for at least one ticker",
                union.len() - common.len()
            );
        }

        let dates: Vec<NaiveDate> = common.into_iter().collect();
        let rows: Vec<Vec<Decimal>> = dates
            .iter()
            .map(|d| by_ticker.iter().map(|s| s[d]).collect())
            .collect();
        let tickers = histories.iter().map(|(t, _)| t.clone()).collect();

        Self::new(tickers, dates, rows)
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<Decimal>] {
        &self.rows
    }

    /// Number of trading dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn num_assets(&self) -> usize {
        self.tickers.len()
    }

    /// Rows whose date falls inside `range`.
    pub fn slice(&self, range: &DateRange) -> PriceSeries {
        let (dates, rows) = self
            .dates
            .iter()
            .zip(self.rows.iter())
            .filter(|(d, _)| range.contains(**d))
            .map(|(d, r)| (*d, r.clone()))
            .unzip();
        PriceSeries {
            tickers: self.tickers.clone(),
            dates,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_align_drops_dates_missing_for_any_ticker() {
        let histories = vec![
            (
                "AAA".to_string(),
                vec![(d(1), dec!(10)), (d(4), dec!(11)), (d(5), dec!(12))],
            ),
            (
                "BBB".to_string(),
                vec![(d(1), dec!(20)), (d(5), dec!(22)), (d(6), dec!(23))],
            ),
        ];
        let series = PriceSeries::align(&histories).unwrap();
        assert_eq!(series.dates(), &[d(1), d(5)]);
        assert_eq!(
            series.rows(),
            &[vec![dec!(10), dec!(20)], vec![dec!(12), dec!(22)]]
        );
    }

    #[test]
    fn test_align_sorts_and_keeps_last_duplicate() {
        let histories = vec![(
            "AAA".to_string(),
            vec![(d(5), dec!(12)), (d(1), dec!(10)), (d(5), dec!(13))],
        )];
        let series = PriceSeries::align(&histories).unwrap();
        assert_eq!(series.dates(), &[d(1), d(5)]);
        assert_eq!(series.rows()[1], vec![dec!(13)]);
    }

    #[test]
    fn test_align_empty_ticker_is_insufficient_data() {
        let histories = vec![
            ("AAA".to_string(), vec![(d(1), dec!(10))]),
            ("BBB".to_string(), vec![]),
        ];
        let err = PriceSeries::align(&histories).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientData(_)));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let result = PriceSeries::new(
            vec!["AAA".into()],
            vec![d(1), d(2)],
            vec![vec![dec!(10)], vec![dec!(0)]],
        );
        assert!(matches!(
            result,
            Err(PortfolioError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_unordered_dates_rejected() {
        let result = PriceSeries::new(
            vec!["AAA".into()],
            vec![d(2), d(2)],
            vec![vec![dec!(10)], vec![dec!(11)]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_slice_is_inclusive() {
        let series = PriceSeries::new(
            vec!["AAA".into()],
            vec![d(1), d(2), d(3), d(4)],
            vec![vec![dec!(1)], vec![dec!(2)], vec![dec!(3)], vec![dec!(4)]],
        )
        .unwrap();
        let range = DateRange::new(d(2), d(3)).unwrap();
        let sliced = series.slice(&range);
        assert_eq!(sliced.dates(), &[d(2), d(3)]);
        assert_eq!(sliced.num_assets(), 1);
    }
}
