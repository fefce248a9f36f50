use thiserror::Error;

use crate::external::price_provider::PriceProviderError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Infeasible constraints: {0}")]
    InfeasibleConstraints(String),
    #[error("Optimization did not converge: {0}")]
    NonConvergence(String),
    #[error("Price provider error: {0}")]
    Provider(#[from] PriceProviderError),
}

impl From<String> for EngineError {
    fn from(value: String) -> Self {
        EngineError::InvalidRequest(value)
    }
}
