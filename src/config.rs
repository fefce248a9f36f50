/// Engine configuration, loaded once at startup and threaded into every
/// operation. The engine itself keeps no mutable state between requests.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Annual risk-free rate used as the Sharpe-ratio baseline (e.g., 0.02 for 2%)
    pub risk_free_rate: f64,

    /// Lookback period requested from the market data provider ("1mo", "3mo", "6mo", "1y", "2y")
    pub default_period: String,

    /// Maximum number of symbols accepted in a single request
    pub max_symbols: usize,

    pub solver: SolverSettings,
}

/// Iteration and tolerance budgets for each constrained solve.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    /// Hard cap on descent iterations; exceeding it is a non-convergence failure
    pub max_iterations: usize,

    /// Step-norm threshold below which a solve is considered converged
    pub step_tolerance: f64,

    /// Maximum allowed residual on a target-return equality constraint
    pub constraint_tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            step_tolerance: 1e-10,
            constraint_tolerance: 1e-4,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            default_period: "1y".to_string(),
            max_symbols: 20,
            solver: SolverSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = EngineConfig::default();
        Self {
            risk_free_rate: std::env::var("RISK_FREE_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.risk_free_rate),
            default_period: std::env::var("DEFAULT_PERIOD")
                .unwrap_or(defaults.default_period),
            max_symbols: std::env::var("MAX_SYMBOLS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_symbols),
            solver: SolverSettings {
                max_iterations: std::env::var("SOLVER_MAX_ITERATIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.solver.max_iterations),
                ..defaults.solver
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.risk_free_rate < 0.0 || self.risk_free_rate >= 1.0 {
            return Err(format!(
                "RISK_FREE_RATE must be in [0, 1), got {}",
                self.risk_free_rate
            ));
        }
        if self.max_symbols == 0 {
            return Err("MAX_SYMBOLS must be positive".to_string());
        }
        if self.solver.max_iterations == 0 {
            return Err("SOLVER_MAX_ITERATIONS must be positive".to_string());
        }
        Ok(())
    }
}
