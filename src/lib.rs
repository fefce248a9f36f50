//! Portfolio optimization engine implementing Modern Portfolio Theory:
//! mean-variance optimization, Sharpe-ratio maximization, and
//! efficient-frontier generation over historical (or synthetic-fallback)
//! price data.
//!
//! Transport, persistence, and the conversational advisory proxy live in
//! collaborating services; this crate only consumes a [`PriceProvider`]
//! and produces plain serde payloads.

pub mod config;
pub mod errors;
pub mod external;
pub mod logging;
pub mod models;
pub mod services;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::external::price_provider::PriceProvider;
use crate::models::{
    AnalysisRequest, EfficientFrontier, FrontierRequest, OptimizationRequest, OptimizationResult,
    PortfolioAnalysis,
};

/// Stateless facade over the optimization services. Each call is an
/// independent, per-request computation; the engine holds only the shared
/// price provider and configuration.
#[derive(Clone)]
pub struct PortfolioEngine {
    provider: Arc<dyn PriceProvider>,
    config: EngineConfig,
}

impl PortfolioEngine {
    pub fn new(provider: Arc<dyn PriceProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Find the weight vector extremizing the requested objective under
    /// budget and risk-tolerance bound constraints.
    pub async fn optimize(
        &self,
        request: &OptimizationRequest,
    ) -> Result<OptimizationResult, EngineError> {
        services::optimizer::run_optimization(self.provider.as_ref(), request, &self.config).await
    }

    /// Sweep the efficient frontier for a symbol set.
    pub async fn efficient_frontier(
        &self,
        request: &FrontierRequest,
    ) -> Result<EfficientFrontier, EngineError> {
        services::frontier::run_frontier(self.provider.as_ref(), request, &self.config).await
    }

    /// Compute portfolio, per-asset, and correlation metrics for given
    /// (or equal-default) weights.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<PortfolioAnalysis, EngineError> {
        services::analysis::run_analysis(self.provider.as_ref(), request, &self.config).await
    }
}
