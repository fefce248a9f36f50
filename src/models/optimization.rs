use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-symbol dollar allocation (weight × investment amount).
pub type AllocationMap = HashMap<String, f64>;

/// Investor profile selecting the per-asset weight bounds.
///
/// Tighter bounds for conservative profiles force diversification and cap
/// single-asset exposure; aggressive profiles permit concentration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    /// `(lower, upper)` bound applied uniformly to every asset weight.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            RiskTolerance::Conservative => (0.05, 0.40),
            RiskTolerance::Moderate => (0.02, 0.60),
            RiskTolerance::Aggressive => (0.01, 0.80),
        }
    }
}

/// Objective selected for a constrained solve. Closed set: the engine
/// dispatches to a dedicated objective function per variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    Sharpe,
    MinVolatility,
    MaxReturn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub symbols: Vec<String>,
    pub investment_amount: f64,
    pub risk_tolerance: RiskTolerance,
    pub optimization_method: OptimizationMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub symbols: Vec<String>,
    /// One weight per symbol in request order; sums to 1
    pub weights: Vec<f64>,
    /// Annualized expected portfolio return
    pub expected_return: f64,
    /// Annualized portfolio volatility
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub allocation: AllocationMap,
    /// Present when the frontier sweep converged alongside the optimization
    pub efficient_frontier: Option<EfficientFrontier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierRequest {
    pub symbols: Vec<String>,
    #[serde(default = "default_num_points")]
    pub num_points: usize,
}

fn default_num_points() -> usize {
    20
}

/// One solved point on the efficient frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    #[serde(rename = "return")]
    pub ret: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

/// Frontier sweep result. Points where the solver failed to converge are
/// omitted and counted in `dropped_points`, so `points.len()` may be less
/// than `requested_points`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficientFrontier {
    /// Ascending by target return
    pub points: Vec<FrontierPoint>,
    pub requested_points: usize,
    pub dropped_points: usize,
}
