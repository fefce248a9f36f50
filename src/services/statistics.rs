use ndarray::{Array1, Array2};

use crate::errors::EngineError;
use crate::models::PriceMatrix;

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Annualized return statistics derived fresh per request from a price
/// matrix; never persisted.
#[derive(Debug, Clone)]
pub struct ReturnStatistics {
    /// Annualized mean daily return per symbol, request order
    pub mean_returns: Array1<f64>,
    /// Annualized sample covariance of daily returns, symmetric PSD
    pub covariance: Array2<f64>,
}

impl ReturnStatistics {
    pub fn num_assets(&self) -> usize {
        self.mean_returns.len()
    }
}

/// Compute annualized mean returns and covariance from aligned daily closes.
///
/// Uses simple period-over-period returns (first row dropped) and the sample
/// covariance with an n−1 divisor. The covariance may be only
/// positive-semidefinite when observations are scarce or symbols are
/// perfectly correlated in-sample; downstream solvers must not invert it.
pub fn compute_return_statistics(matrix: &PriceMatrix) -> Result<ReturnStatistics, EngineError> {
    let rows = matrix.num_rows();
    let cols = matrix.num_symbols();
    if rows < 3 {
        return Err(EngineError::DataUnavailable(format!(
            "Need at least 3 price rows to estimate covariance, got {}",
            rows
        )));
    }

    // Daily simple returns, one fewer row than prices
    let mut returns = Array2::zeros((rows - 1, cols));
    for col in 0..cols {
        for row in 1..rows {
            let prev = matrix.closes[[row - 1, col]];
            let cur = matrix.closes[[row, col]];
            returns[[row - 1, col]] = if prev.abs() > f64::EPSILON {
                (cur - prev) / prev
            } else {
                0.0
            };
        }
    }

    let n = (rows - 1) as f64;
    let means: Vec<f64> = (0..cols)
        .map(|col| returns.column(col).sum() / n)
        .collect();

    // Sample covariance, filled symmetrically
    let mut covariance = Array2::zeros((cols, cols));
    for i in 0..cols {
        for j in i..cols {
            let mut sum = 0.0;
            for row in 0..rows - 1 {
                sum += (returns[[row, i]] - means[i]) * (returns[[row, j]] - means[j]);
            }
            let cov = sum / (n - 1.0) * TRADING_DAYS;
            covariance[[i, j]] = cov;
            covariance[[j, i]] = cov;
        }
    }

    let mean_returns = Array1::from_iter(means.into_iter().map(|m| m * TRADING_DAYS));

    Ok(ReturnStatistics { mean_returns, covariance })
}

/// Pairwise Pearson correlation matrix derived from the covariance.
///
/// Values are clamped to [-1, 1] against floating error. Assets with
/// (near-)zero variance correlate 0 with everything and 1 with themselves.
pub fn correlation_matrix(stats: &ReturnStatistics) -> Array2<f64> {
    let n = stats.num_assets();
    let mut corr = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            if i == j {
                corr[[i, j]] = 1.0;
                continue;
            }
            let denom = (stats.covariance[[i, i]] * stats.covariance[[j, j]]).sqrt();
            corr[[i, j]] = if denom > f64::EPSILON {
                (stats.covariance[[i, j]] / denom).clamp(-1.0, 1.0)
            } else {
                0.0
            };
        }
    }
    corr
}
