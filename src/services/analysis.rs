use std::collections::HashMap;

use ndarray::Array1;
use tracing::info;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::external::price_provider::PriceProvider;
use crate::models::{AnalysisRequest, AssetMetrics, PortfolioAnalysis, PortfolioMetricsReport};
use crate::services::market_data;
use crate::services::metrics;
use crate::services::statistics;

/// Tolerance on Σweights = 1 for caller-supplied weights. Looser than the
/// optimizer's internal budget constraint, which is exact.
const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Analyze an existing portfolio: portfolio-level metrics, per-asset
/// metrics, and the pairwise correlation matrix.
///
/// Weights default to equal allocation when omitted.
pub async fn run_analysis(
    provider: &dyn PriceProvider,
    request: &AnalysisRequest,
    config: &EngineConfig,
) -> Result<PortfolioAnalysis, EngineError> {
    let n = request.symbols.len();
    let weights = resolve_weights(request.weights.as_deref(), n)?;

    info!("Analyzing portfolio of {} symbols", n);

    let matrix = market_data::fetch_price_matrix(
        provider,
        &request.symbols,
        &config.default_period,
        config,
    )
    .await?;
    let stats = statistics::compute_return_statistics(&matrix)?;

    let portfolio = metrics::portfolio_stats(&weights, &stats, config.risk_free_rate);
    let portfolio_metrics = PortfolioMetricsReport {
        expected_return: portfolio.expected_return,
        volatility: portfolio.volatility,
        sharpe_ratio: portfolio.sharpe_ratio,
        risk_free_rate: config.risk_free_rate,
    };

    let asset_metrics = request
        .symbols
        .iter()
        .enumerate()
        .map(|(i, symbol)| {
            let expected_return = stats.mean_returns[i];
            let volatility = stats.covariance[[i, i]].max(0.0).sqrt();
            AssetMetrics {
                symbol: symbol.clone(),
                weight: weights[i],
                expected_return,
                volatility,
                sharpe_ratio: metrics::sharpe_ratio(
                    expected_return,
                    volatility,
                    config.risk_free_rate,
                ),
            }
        })
        .collect();

    let corr = statistics::correlation_matrix(&stats);
    let mut correlation_matrix = HashMap::with_capacity(n);
    for (i, row_symbol) in request.symbols.iter().enumerate() {
        let mut row = HashMap::with_capacity(n);
        for (j, col_symbol) in request.symbols.iter().enumerate() {
            row.insert(col_symbol.clone(), corr[[i, j]]);
        }
        correlation_matrix.insert(row_symbol.clone(), row);
    }

    Ok(PortfolioAnalysis {
        portfolio_metrics,
        asset_metrics,
        correlation_matrix,
    })
}

fn resolve_weights(provided: Option<&[f64]>, num_symbols: usize) -> Result<Array1<f64>, EngineError> {
    match provided {
        None => Ok(Array1::from_elem(num_symbols, 1.0 / num_symbols as f64)),
        Some(weights) => {
            if weights.len() != num_symbols {
                return Err(EngineError::InvalidRequest(format!(
                    "Got {} weights for {} symbols",
                    weights.len(),
                    num_symbols
                )));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(EngineError::InvalidRequest(
                    "Weights must be finite and non-negative".to_string(),
                ));
            }
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(EngineError::InvalidRequest(format!(
                    "Weights must sum to 1 (within {}), got {:.4}",
                    WEIGHT_SUM_TOLERANCE, sum
                )));
            }
            Ok(Array1::from_vec(weights.to_vec()))
        }
    }
}
