use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioError;
use crate::PortfolioResult;

/// Allowed deviation of a weight vector's sum from 1.
pub const WEIGHT_SUM_TOLERANCE: Decimal = dec!(0.000001);

/// Long-only, fully-invested allocation as fractions.
///
/// Positional: index `i` belongs to the `i`-th ticker of the statistics the
/// weights were solved against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<Decimal>);

impl WeightVector {
    pub fn new(weights: Vec<Decimal>) -> PortfolioResult<Self> {
        if weights.is_empty() {
            return Err(PortfolioError::invalid("weights", "At least one weight required"));
        }
        if let Some((i, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| **w < Decimal::ZERO || **w > Decimal::ONE)
        {
            return Err(PortfolioError::invalid(
                "weights",
                format!("Weight {} at position {} is outside [0, 1]", w, i),
            ));
        }
        let total: Decimal = weights.iter().sum();
        if (total - Decimal::ONE).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PortfolioError::invalid(
                "weights",
                format!("Weights sum to {}, expected 1", total),
            ));
        }
        Ok(Self(weights))
    }

    /// Equal weights for n assets.
    pub fn uniform(n: usize) -> Self {
        let w = Decimal::ONE / Decimal::from(n.max(1) as i64);
        Self(vec![w; n])
    }

    pub fn as_slice(&self) -> &[Decimal] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Decimal> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Herfindahl-Hirschman index of the weights.
    pub fn herfindahl(&self) -> Decimal {
        self.0.iter().map(|w| *w * *w).sum()
    }
}

impl AsRef<[Decimal]> for WeightVector {
    fn as_ref(&self) -> &[Decimal] {
        &self.0
    }
}
