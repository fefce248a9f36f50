pub mod analysis;
pub mod frontier;
pub mod market_data;
pub mod metrics;
pub mod optimizer;
pub mod solver;
pub mod statistics;
