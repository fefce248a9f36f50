use ndarray::Array1;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::external::price_provider::PriceProvider;
use crate::models::{
    AllocationMap, OptimizationMethod, OptimizationRequest, OptimizationResult, RiskTolerance,
};
use crate::services::frontier;
use crate::services::market_data;
use crate::services::metrics::{self, PortfolioStats};
use crate::services::solver;
use crate::services::statistics::{self, ReturnStatistics};

/// Frontier resolution attached to an optimization response.
const ATTACHED_FRONTIER_POINTS: usize = 10;

/// Validate that equal division of the budget can satisfy the bounds at all:
/// `n·lower ≤ 1 ≤ n·upper`. A single symbol is always infeasible since every
/// tolerance caps individual weights below 1.
pub fn validate_feasibility(
    num_assets: usize,
    tolerance: RiskTolerance,
) -> Result<(f64, f64), EngineError> {
    let (lower, upper) = tolerance.bounds();
    let n = num_assets as f64;
    if n * lower > 1.0 + 1e-12 || n * upper < 1.0 - 1e-12 {
        return Err(EngineError::InfeasibleConstraints(format!(
            "{:?} bounds ({}, {}) cannot satisfy the budget constraint with {} assets",
            tolerance, lower, upper, num_assets
        )));
    }
    Ok((lower, upper))
}

/// Solve for the weight vector extremizing `method` under budget and bound
/// constraints, starting from equal weights.
pub fn solve_weights(
    stats: &ReturnStatistics,
    method: OptimizationMethod,
    lower: f64,
    upper: f64,
    config: &EngineConfig,
) -> Result<Array1<f64>, EngineError> {
    let n = stats.num_assets();
    let initial = Array1::from_elem(n, 1.0 / n as f64);
    let risk_free_rate = config.risk_free_rate;

    let objective: Box<dyn Fn(&Array1<f64>) -> f64> = match method {
        OptimizationMethod::Sharpe => {
            let stats = stats.clone();
            Box::new(move |w: &Array1<f64>| {
                -metrics::portfolio_stats(w, &stats, risk_free_rate).sharpe_ratio
            })
        }
        OptimizationMethod::MinVolatility => {
            let stats = stats.clone();
            Box::new(move |w: &Array1<f64>| {
                metrics::portfolio_stats(w, &stats, risk_free_rate).volatility
            })
        }
        OptimizationMethod::MaxReturn => {
            let means = stats.mean_returns.clone();
            Box::new(move |w: &Array1<f64>| -means.dot(w))
        }
    };

    solver::minimize(|w| objective(w), &initial, lower, upper, None, &config.solver)
}

/// Full optimization pipeline: fetch prices, derive statistics, solve, and
/// assemble the response with dollar allocations and (when it converges)
/// the efficient frontier.
pub async fn run_optimization(
    provider: &dyn PriceProvider,
    request: &OptimizationRequest,
    config: &EngineConfig,
) -> Result<OptimizationResult, EngineError> {
    if !(request.investment_amount > 0.0) {
        return Err(EngineError::InvalidRequest(format!(
            "investment_amount must be positive, got {}",
            request.investment_amount
        )));
    }

    let (lower, upper) = validate_feasibility(request.symbols.len(), request.risk_tolerance)?;

    info!(
        "Optimizing {} symbols, method {:?}, tolerance {:?}",
        request.symbols.len(),
        request.optimization_method,
        request.risk_tolerance
    );

    let matrix = market_data::fetch_price_matrix(
        provider,
        &request.symbols,
        &config.default_period,
        config,
    )
    .await?;
    let stats = statistics::compute_return_statistics(&matrix)?;

    let weights = solve_weights(&stats, request.optimization_method, lower, upper, config)?;
    let PortfolioStats { expected_return, volatility, sharpe_ratio } =
        metrics::portfolio_stats(&weights, &stats, config.risk_free_rate);

    let allocation: AllocationMap = request
        .symbols
        .iter()
        .zip(weights.iter())
        .map(|(symbol, &w)| (symbol.clone(), w * request.investment_amount))
        .collect();

    // The frontier is supplementary; a sweep failure does not fail the
    // optimization itself
    let efficient_frontier = if request.symbols.len() >= 2 {
        match frontier::generate_frontier(&stats, ATTACHED_FRONTIER_POINTS, config) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("Efficient frontier unavailable for this request: {}", e);
                None
            }
        }
    } else {
        None
    };

    Ok(OptimizationResult {
        symbols: request.symbols.clone(),
        weights: weights.to_vec(),
        expected_return,
        volatility,
        sharpe_ratio,
        allocation,
        efficient_frontier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Four assets with distinct risk/return profiles and mild correlation.
    fn four_asset_stats() -> ReturnStatistics {
        ReturnStatistics {
            mean_returns: array![0.08, 0.12, 0.18, 0.05],
            covariance: array![
                [0.040, 0.006, 0.010, 0.002],
                [0.006, 0.090, 0.015, 0.003],
                [0.010, 0.015, 0.160, 0.004],
                [0.002, 0.003, 0.004, 0.010]
            ],
        }
    }

    fn equal_weights(n: usize) -> Array1<f64> {
        Array1::from_elem(n, 1.0 / n as f64)
    }

    #[test]
    fn test_single_symbol_is_infeasible_for_every_tolerance() {
        for tolerance in [
            RiskTolerance::Conservative,
            RiskTolerance::Moderate,
            RiskTolerance::Aggressive,
        ] {
            let result = validate_feasibility(1, tolerance);
            assert!(matches!(result, Err(EngineError::InfeasibleConstraints(_))));
        }
    }

    #[test]
    fn test_conservative_lower_bound_caps_asset_count() {
        // 0.05 lower bound: 20 assets is the limit, 21 is infeasible
        assert!(validate_feasibility(20, RiskTolerance::Conservative).is_ok());
        assert!(validate_feasibility(21, RiskTolerance::Conservative).is_err());
    }

    #[test]
    fn test_sharpe_weights_sum_and_bounds() {
        let stats = four_asset_stats();
        let config = EngineConfig::default();
        let w = solve_weights(&stats, OptimizationMethod::Sharpe, 0.02, 0.60, &config).unwrap();

        let sum: f64 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(w.iter().all(|&x| x >= 0.02 - 1e-9 && x <= 0.60 + 1e-9));
    }

    #[test]
    fn test_sharpe_beats_equal_weight() {
        let stats = four_asset_stats();
        let config = EngineConfig::default();
        let w = solve_weights(&stats, OptimizationMethod::Sharpe, 0.02, 0.60, &config).unwrap();

        let optimized = metrics::portfolio_stats(&w, &stats, config.risk_free_rate);
        let baseline = metrics::portfolio_stats(&equal_weights(4), &stats, config.risk_free_rate);
        assert!(optimized.sharpe_ratio >= baseline.sharpe_ratio - 1e-9);
    }

    #[test]
    fn test_min_volatility_beats_equal_weight() {
        let stats = four_asset_stats();
        let config = EngineConfig::default();
        let w =
            solve_weights(&stats, OptimizationMethod::MinVolatility, 0.02, 0.60, &config).unwrap();

        let optimized = metrics::portfolio_stats(&w, &stats, config.risk_free_rate);
        let baseline = metrics::portfolio_stats(&equal_weights(4), &stats, config.risk_free_rate);
        assert!(optimized.volatility <= baseline.volatility + 1e-9);
    }

    #[test]
    fn test_max_return_concentrates_on_best_asset() {
        let stats = four_asset_stats();
        let config = EngineConfig::default();
        let w = solve_weights(&stats, OptimizationMethod::MaxReturn, 0.02, 0.60, &config).unwrap();

        // Asset 2 has the highest mean; it should sit at the upper bound
        assert!((w[2] - 0.60).abs() < 1e-6, "weights: {:?}", w);
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let stats = four_asset_stats();
        let config = EngineConfig::default();
        let a = solve_weights(&stats, OptimizationMethod::Sharpe, 0.05, 0.40, &config).unwrap();
        let b = solve_weights(&stats, OptimizationMethod::Sharpe, 0.05, 0.40, &config).unwrap();
        assert_eq!(a, b);
    }
}
