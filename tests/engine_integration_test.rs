/// End-to-end engine tests against a deterministic mock price provider:
/// optimization, efficient frontier, portfolio analysis, and the synthetic
/// fallback path.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use financebot_engine::config::EngineConfig;
use financebot_engine::errors::EngineError;
use financebot_engine::external::price_provider::{DailyClose, PriceProvider, PriceProviderError};
use financebot_engine::models::{
    AnalysisRequest, DataProvenance, FrontierRequest, OptimizationMethod, OptimizationRequest,
    RiskTolerance,
};
use financebot_engine::services::{market_data, metrics, statistics};
use financebot_engine::PortfolioEngine;

/// Deterministic provider: each symbol gets a distinct drift and a sine
/// perturbation at its own frequency, so the assets are neither constant
/// nor perfectly correlated.
struct MockProvider {
    series: HashMap<String, Vec<DailyClose>>,
}

impl MockProvider {
    fn with_symbols(symbols: &[&str]) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut series = HashMap::new();
        for (k, symbol) in symbols.iter().enumerate() {
            let drift = 0.0003 * (k as f64 + 1.0);
            let amplitude = 0.010 + 0.002 * k as f64;
            let frequency = 0.7 + 0.13 * k as f64;

            let mut price = 100.0;
            let mut closes = Vec::with_capacity(320);
            for t in 0..320 {
                let daily_return = drift + amplitude * (t as f64 * frequency).sin();
                price *= 1.0 + daily_return;
                closes.push(DailyClose {
                    date: start + Duration::days(t),
                    close: price,
                });
            }
            series.insert(symbol.to_string(), closes);
        }
        Self { series }
    }
}

#[async_trait]
impl PriceProvider for MockProvider {
    async fn fetch_daily_closes(
        &self,
        symbol: &str,
        trading_days: u32,
    ) -> Result<Vec<DailyClose>, PriceProviderError> {
        let closes = self
            .series
            .get(symbol)
            .ok_or_else(|| PriceProviderError::BadResponse(format!("unknown symbol {symbol}")))?;
        let skip = closes.len().saturating_sub(trading_days as usize);
        Ok(closes[skip..].to_vec())
    }
}

/// Provider that always fails, forcing the synthetic fallback.
struct FailingProvider;

#[async_trait]
impl PriceProvider for FailingProvider {
    async fn fetch_daily_closes(
        &self,
        _symbol: &str,
        _trading_days: u32,
    ) -> Result<Vec<DailyClose>, PriceProviderError> {
        Err(PriceProviderError::Network("connection refused".to_string()))
    }
}

fn symbols() -> Vec<String> {
    vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()]
}

fn engine(provider: impl PriceProvider + 'static) -> PortfolioEngine {
    PortfolioEngine::new(Arc::new(provider), EngineConfig::default())
}

#[tokio::test]
async fn optimize_sharpe_moderate_four_assets() {
    let engine = engine(MockProvider::with_symbols(&["A", "B", "C", "D"]));
    let request = OptimizationRequest {
        symbols: symbols(),
        investment_amount: 10_000.0,
        risk_tolerance: RiskTolerance::Moderate,
        optimization_method: OptimizationMethod::Sharpe,
    };

    let result = engine.optimize(&request).await.unwrap();

    let weight_sum: f64 = result.weights.iter().sum();
    assert!((weight_sum - 1.0).abs() < 1e-6, "weights sum to {weight_sum}");
    assert!(result
        .weights
        .iter()
        .all(|&w| w >= 0.02 - 1e-9 && w <= 0.60 + 1e-9));

    assert!(result.sharpe_ratio.is_finite());
    assert!(result.volatility > 0.0);

    let allocation_sum: f64 = result.allocation.values().sum();
    assert!((allocation_sum - 10_000.0).abs() < 10_000.0 * 1e-3);
    assert_eq!(result.allocation.len(), 4);
}

#[tokio::test]
async fn optimize_result_round_trips_through_metrics() {
    let provider = MockProvider::with_symbols(&["A", "B", "C", "D"]);
    let config = EngineConfig::default();
    let request = OptimizationRequest {
        symbols: symbols(),
        investment_amount: 5_000.0,
        risk_tolerance: RiskTolerance::Moderate,
        optimization_method: OptimizationMethod::Sharpe,
    };

    let engine = PortfolioEngine::new(Arc::new(MockProvider::with_symbols(&["A", "B", "C", "D"])), config.clone());
    let result = engine.optimize(&request).await.unwrap();

    // Recompute statistics from the same deterministic data and verify the
    // reported metrics match the returned weights
    let matrix = market_data::fetch_price_matrix(&provider, &symbols(), "1y", &config)
        .await
        .unwrap();
    let stats = statistics::compute_return_statistics(&matrix).unwrap();
    let weights = ndarray::Array1::from_vec(result.weights.clone());
    let recomputed = metrics::portfolio_stats(&weights, &stats, config.risk_free_rate);

    assert!((recomputed.expected_return - result.expected_return).abs() < 1e-6);
    assert!((recomputed.volatility - result.volatility).abs() < 1e-6);
    assert!((recomputed.sharpe_ratio - result.sharpe_ratio).abs() < 1e-6);
}

#[tokio::test]
async fn optimize_attaches_efficient_frontier() {
    let engine = engine(MockProvider::with_symbols(&["A", "B", "C", "D"]));
    let request = OptimizationRequest {
        symbols: symbols(),
        investment_amount: 10_000.0,
        risk_tolerance: RiskTolerance::Aggressive,
        optimization_method: OptimizationMethod::MinVolatility,
    };

    let result = engine.optimize(&request).await.unwrap();
    let frontier = result.efficient_frontier.expect("frontier should be attached");
    assert!(!frontier.points.is_empty());
    assert_eq!(frontier.requested_points, 10);
}

#[tokio::test]
async fn frontier_ten_points_sorted_and_shaped() {
    let engine = engine(MockProvider::with_symbols(&["A", "B", "C", "D"]));
    let request = FrontierRequest { symbols: symbols(), num_points: 10 };

    let frontier = engine.efficient_frontier(&request).await.unwrap();

    assert!(!frontier.points.is_empty());
    assert!(frontier.points.len() <= 10);
    assert_eq!(
        frontier.points.len() + frontier.dropped_points,
        frontier.requested_points
    );
    for pair in frontier.points.windows(2) {
        assert!(pair[1].ret >= pair[0].ret - 1e-9);
        assert!(pair[1].volatility >= pair[0].volatility - 1e-6);
    }
}

#[tokio::test]
async fn frontier_requires_two_symbols() {
    let engine = engine(MockProvider::with_symbols(&["A"]));
    let request = FrontierRequest { symbols: vec!["A".to_string()], num_points: 10 };

    let result = engine.efficient_frontier(&request).await;
    assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
}

#[tokio::test]
async fn single_symbol_optimize_is_rejected() {
    let engine = engine(MockProvider::with_symbols(&["A"]));
    let request = OptimizationRequest {
        symbols: vec!["A".to_string()],
        investment_amount: 1_000.0,
        risk_tolerance: RiskTolerance::Aggressive,
        optimization_method: OptimizationMethod::Sharpe,
    };

    let result = engine.optimize(&request).await;
    assert!(matches!(result, Err(EngineError::InfeasibleConstraints(_))));
}

#[tokio::test]
async fn non_positive_investment_rejected() {
    let engine = engine(MockProvider::with_symbols(&["A", "B"]));
    let request = OptimizationRequest {
        symbols: vec!["A".to_string(), "B".to_string()],
        investment_amount: 0.0,
        risk_tolerance: RiskTolerance::Moderate,
        optimization_method: OptimizationMethod::Sharpe,
    };

    let result = engine.optimize(&request).await;
    assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
}

#[tokio::test]
async fn analysis_defaults_to_equal_weights() {
    let engine = engine(MockProvider::with_symbols(&["A", "B", "C", "D"]));
    let request = AnalysisRequest { symbols: symbols(), weights: None };

    let analysis = engine.analyze(&request).await.unwrap();

    assert_eq!(analysis.asset_metrics.len(), 4);
    for asset in &analysis.asset_metrics {
        assert!((asset.weight - 0.25).abs() < 1e-12);
        assert!(asset.volatility >= 0.0);
    }
    assert_eq!(analysis.portfolio_metrics.risk_free_rate, 0.02);

    // Correlation matrix: unit diagonal, symmetric values in [-1, 1]
    for symbol in &symbols() {
        let row = &analysis.correlation_matrix[symbol];
        assert!((row[symbol] - 1.0).abs() < 1e-9);
        for (other, value) in row {
            assert!((-1.0..=1.0).contains(value));
            let mirrored = analysis.correlation_matrix[other][symbol];
            assert!((value - mirrored).abs() < 1e-9);
        }
    }
}

#[tokio::test]
async fn analysis_rejects_bad_weights() {
    let engine = engine(MockProvider::with_symbols(&["A", "B"]));

    let wrong_sum = AnalysisRequest {
        symbols: vec!["A".to_string(), "B".to_string()],
        weights: Some(vec![0.4, 0.4]),
    };
    assert!(matches!(
        engine.analyze(&wrong_sum).await,
        Err(EngineError::InvalidRequest(_))
    ));

    let wrong_count = AnalysisRequest {
        symbols: vec!["A".to_string(), "B".to_string()],
        weights: Some(vec![1.0]),
    };
    assert!(matches!(
        engine.analyze(&wrong_count).await,
        Err(EngineError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn provider_failure_falls_back_to_synthetic_data() {
    let config = EngineConfig::default();
    let matrix = market_data::fetch_price_matrix(&FailingProvider, &symbols(), "1y", &config)
        .await
        .unwrap();

    assert_eq!(matrix.provenance, DataProvenance::Synthetic);
    assert_eq!(matrix.num_rows(), 252);

    // The full pipeline still produces a well-formed result on fallback data
    let engine = engine(FailingProvider);
    let request = OptimizationRequest {
        symbols: symbols(),
        investment_amount: 10_000.0,
        risk_tolerance: RiskTolerance::Moderate,
        optimization_method: OptimizationMethod::Sharpe,
    };
    let result = engine.optimize(&request).await.unwrap();

    let weight_sum: f64 = result.weights.iter().sum();
    assert!((weight_sum - 1.0).abs() < 1e-6);
    assert!(result.sharpe_ratio.is_finite());
}
