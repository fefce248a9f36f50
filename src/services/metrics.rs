use ndarray::Array1;

use crate::services::statistics::ReturnStatistics;

/// Finite stand-in for an infinite Sharpe ratio when volatility is exactly
/// zero (e.g., single-asset constant-price data). Signed by the excess
/// return; keeps results JSON-serializable.
pub const SHARPE_CAP: f64 = 1e6;

const ZERO_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioStats {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

/// Expected return, volatility, and Sharpe ratio for a candidate weight
/// vector. Pure function of the inputs.
pub fn portfolio_stats(
    weights: &Array1<f64>,
    stats: &ReturnStatistics,
    risk_free_rate: f64,
) -> PortfolioStats {
    let expected_return = stats.mean_returns.dot(weights);
    // wᵀΣw can dip below zero under floating error; clamp before sqrt
    let variance = weights.dot(&stats.covariance.dot(weights)).max(0.0);
    let volatility = variance.sqrt();
    let sharpe_ratio = sharpe_ratio(expected_return, volatility, risk_free_rate);

    PortfolioStats { expected_return, volatility, sharpe_ratio }
}

/// Sharpe ratio with an explicit zero-volatility policy: zero when the
/// excess return is also ~zero, otherwise ±`SHARPE_CAP`.
pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    let excess = expected_return - risk_free_rate;
    if volatility > ZERO_TOLERANCE {
        excess / volatility
    } else if excess.abs() <= ZERO_TOLERANCE {
        0.0
    } else {
        SHARPE_CAP * excess.signum()
    }
}
