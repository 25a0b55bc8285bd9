use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioError;
use crate::market_data::PriceSeries;
use crate::portfolio::performance::TRADING_DAYS_PER_YEAR;
use crate::statistics::descriptive::{covariance, mean};
use crate::PortfolioResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Day-over-day fractional changes derived from a [`PriceSeries`].
///
/// One row shorter than its prices: the first date has no prior reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<Decimal>>,
}

/// Daily mean return per asset plus the sample covariance matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    pub tickers: Vec<String>,
    /// Daily mean return per asset.
    pub mean_returns: Vec<Decimal>,
    /// N x N sample covariance of daily returns.
    pub covariance: Vec<Vec<Decimal>>,
    /// Number of return observations the statistics were estimated from.
    pub observations: usize,
}

// ---------------------------------------------------------------------------
// ReturnSeries
// ---------------------------------------------------------------------------

impl ReturnSeries {
    pub fn from_prices(prices: &PriceSeries) -> PortfolioResult<Self> {
        if prices.num_assets() == 0 {
            return Err(PortfolioError::InsufficientData(
                "At least one ticker required".into(),
            ));
        }
        if prices.len() < 2 {
            return Err(PortfolioError::InsufficientData(format!(
                "At least 2 aligned price rows required to compute a return, got {}",
                prices.len()
            )));
        }

        let rows: Vec<Vec<Decimal>> = prices
            .rows()
            .windows(2)
            .map(|w| {
                w[0].iter()
                    .zip(w[1].iter())
                    .map(|(prev, cur)| (*cur - *prev) / *prev)
                    .collect()
            })
            .collect();

        Ok(Self {
            tickers: prices.tickers().to_vec(),
            dates: prices.dates()[1..].to_vec(),
            rows,
        })
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

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_assets(&self) -> usize {
        self.tickers.len()
    }

    /// All returns of asset `i`, in date order.
    pub fn column(&self, i: usize) -> Vec<Decimal> {
        self.rows.iter().map(|row| row[i]).collect()
    }

    /// Static-weight combination of each day's asset returns.
    pub fn weighted(&self, weights: &[Decimal]) -> Vec<Decimal> {
        self.rows
            .iter()
            .map(|row| row.iter().zip(weights.iter()).map(|(r, w)| *r * *w).sum())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ReturnStatistics
// ---------------------------------------------------------------------------

impl ReturnStatistics {
    /// Prices -> returns -> (mean vector, covariance matrix).
    pub fn from_prices(prices: &PriceSeries) -> PortfolioResult<Self> {
        let returns = ReturnSeries::from_prices(prices)?;
        Self::from_returns(&returns)
    }

    pub fn from_returns(returns: &ReturnSeries) -> PortfolioResult<Self> {
        let n = returns.num_assets();
        if n == 0 || returns.is_empty() {
            return Err(PortfolioError::InsufficientData(
                "Return series is empty".into(),
            ));
        }

        let columns: Vec<Vec<Decimal>> = (0..n).map(|i| returns.column(i)).collect();
        let means: Vec<Decimal> = columns.iter().map(|c| mean(c)).collect();

        let mut cov = vec![vec![Decimal::ZERO; n]; n];
        for i in 0..n {
            for j in i..n {
                let c = covariance(&columns[i], &columns[j], means[i], means[j]);
                cov[i][j] = c;
                cov[j][i] = c;
            }
        }

        Ok(Self {
            tickers: returns.tickers().to_vec(),
            mean_returns: means,
            covariance: cov,
            observations: returns.len(),
        })
    }

    pub fn num_assets(&self) -> usize {
        self.mean_returns.len()
    }

    /// Mean returns scaled to a 252-day year.
    pub fn annualised_means(&self) -> Vec<Decimal> {
        self.mean_returns
            .iter()
            .map(|m| *m * TRADING_DAYS_PER_YEAR)
            .collect()
    }
}
