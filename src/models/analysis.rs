use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbols: Vec<String>,
    /// Defaults to equal weighting when omitted. If provided, must match the
    /// symbol count and sum to 1 within 0.01.
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

/// Portfolio-level metrics echoed with the risk-free rate they were
/// computed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioMetricsReport {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMetrics {
    pub symbol: String,
    pub weight: f64,
    /// Annualized expected return of the single asset
    pub expected_return: f64,
    /// Annualized volatility of the single asset
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub portfolio_metrics: PortfolioMetricsReport,
    pub asset_metrics: Vec<AssetMetrics>,
    /// symbol × symbol pairwise Pearson correlation, each value in [-1, 1]
    pub correlation_matrix: HashMap<String, HashMap<String, f64>>,
}
