mod market;
pub mod analysis;
pub mod optimization;

pub use analysis::{AnalysisRequest, AssetMetrics, PortfolioAnalysis, PortfolioMetricsReport};
pub use market::{DataProvenance, PriceMatrix};
pub use optimization::{
    AllocationMap, EfficientFrontier, FrontierPoint, FrontierRequest, OptimizationMethod,
    OptimizationRequest, OptimizationResult, RiskTolerance,
};
