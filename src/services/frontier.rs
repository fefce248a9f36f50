use ndarray::Array1;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::external::price_provider::PriceProvider;
use crate::models::{EfficientFrontier, FrontierPoint, FrontierRequest};
use crate::services::market_data;
use crate::services::metrics;
use crate::services::optimizer;
use crate::services::solver::{self, TargetConstraint};
use crate::services::statistics::{self, ReturnStatistics};

use crate::models::OptimizationMethod;

/// Fixed per-asset bounds for frontier solves, distinct from the
/// risk-tolerance bounds used by the optimizer.
const FRONTIER_BOUNDS: (f64, f64) = (0.01, 0.70);

/// Sweep the efficient frontier between the minimum-volatility and
/// maximum-return portfolios.
///
/// `num_points` equally spaced target returns are solved independently from
/// the equal-weight start (no warm starting). Targets where the solve fails
/// to converge are dropped and counted; upstream data or statistics failures
/// propagate as errors.
pub fn generate_frontier(
    stats: &ReturnStatistics,
    num_points: usize,
    config: &EngineConfig,
) -> Result<EfficientFrontier, EngineError> {
    let n = stats.num_assets();
    let (lower, upper) = FRONTIER_BOUNDS;
    if (n as f64) * lower > 1.0 + 1e-12 || (n as f64) * upper < 1.0 - 1e-12 {
        return Err(EngineError::InfeasibleConstraints(format!(
            "Frontier bounds ({}, {}) cannot satisfy the budget constraint with {} assets",
            lower, upper, n
        )));
    }
    if num_points == 0 {
        return Err(EngineError::InvalidRequest(
            "num_points must be positive".to_string(),
        ));
    }

    // Frontier endpoints define the target-return range
    let min_vol_weights =
        optimizer::solve_weights(stats, OptimizationMethod::MinVolatility, lower, upper, config)?;
    let max_ret_weights =
        optimizer::solve_weights(stats, OptimizationMethod::MaxReturn, lower, upper, config)?;

    let return_floor = stats.mean_returns.dot(&min_vol_weights);
    let return_ceiling = stats.mean_returns.dot(&max_ret_weights);

    let initial = Array1::from_elem(n, 1.0 / n as f64);
    let mut points = Vec::with_capacity(num_points);
    let mut dropped = 0usize;

    for i in 0..num_points {
        let fraction = if num_points == 1 {
            0.0
        } else {
            i as f64 / (num_points - 1) as f64
        };
        let target = return_floor + fraction * (return_ceiling - return_floor);
        let constraint = TargetConstraint {
            coefficients: stats.mean_returns.clone(),
            target,
        };

        let solve = solver::minimize(
            |w| metrics::portfolio_stats(w, stats, config.risk_free_rate).volatility,
            &initial,
            lower,
            upper,
            Some(&constraint),
            &config.solver,
        );

        match solve {
            Ok(weights) => {
                let result = metrics::portfolio_stats(&weights, stats, config.risk_free_rate);
                points.push(FrontierPoint {
                    ret: result.expected_return,
                    volatility: result.volatility,
                    sharpe_ratio: result.sharpe_ratio,
                });
            }
            Err(e) => {
                warn!("Dropping frontier point at target {:.4}: {}", target, e);
                dropped += 1;
            }
        }
    }

    points.sort_by(|a, b| a.ret.total_cmp(&b.ret));

    info!(
        "Generated frontier with {} of {} points ({} dropped)",
        points.len(),
        num_points,
        dropped
    );

    Ok(EfficientFrontier {
        points,
        requested_points: num_points,
        dropped_points: dropped,
    })
}

/// Request-level frontier operation: fetch prices, derive statistics, sweep.
pub async fn run_frontier(
    provider: &dyn PriceProvider,
    request: &FrontierRequest,
    config: &EngineConfig,
) -> Result<EfficientFrontier, EngineError> {
    if request.symbols.len() < 2 {
        return Err(EngineError::InvalidRequest(format!(
            "Frontier generation requires at least 2 symbols, got {}",
            request.symbols.len()
        )));
    }

    let matrix = market_data::fetch_price_matrix(
        provider,
        &request.symbols,
        &config.default_period,
        config,
    )
    .await?;
    let stats = statistics::compute_return_statistics(&matrix)?;

    generate_frontier(&stats, request.num_points, config)
}
