use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Optimization did not converge: {objective} stopped after {iterations} iterations ({reason})")]
    OptimizationNonconvergence {
        objective: String,
        iterations: u32,
        reason: String,
    },

    #[error("Invalid request: {field}: {reason}")]
    InvalidRequest { field: String, reason: String },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Price history error: {0}")]
    PriceHistory(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PortfolioError {
    /// Shorthand for the common `InvalidRequest` construction.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PortfolioError::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for solver failures the efficient frontier is allowed to skip.
    pub fn is_nonconvergence(&self) -> bool {
        matches!(self, PortfolioError::OptimizationNonconvergence { .. })
    }
}

impl From<serde_json::Error> for PortfolioError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioError::SerializationError(e.to_string())
    }
}
