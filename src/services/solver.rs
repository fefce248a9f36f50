//! Constrained minimization over the capped simplex
//! `{ w : Σw = 1, lower ≤ wᵢ ≤ upper }`.
//!
//! Projected-gradient descent with central-difference gradients and a
//! backtracking line search. A linear target constraint (used by the
//! frontier sweep for `m·w = target`) is enforced through an increasing
//! quadratic-penalty outer loop. Fully deterministic: the same inputs and
//! initial point always produce the same weights.

use ndarray::Array1;

use crate::config::SolverSettings;
use crate::errors::EngineError;

const GRADIENT_STEP: f64 = 1e-6;
const PENALTY_SCHEDULE: [f64; 5] = [1e2, 1e3, 1e4, 1e5, 1e6];
const LINE_SEARCH_HALVINGS: usize = 40;
const PROJECTION_BISECTIONS: usize = 200;

/// Linear equality `coefficients · w = target`.
#[derive(Debug, Clone)]
pub struct TargetConstraint {
    pub coefficients: Array1<f64>,
    pub target: f64,
}

/// Euclidean projection onto `{ Σw = 1, lower ≤ wᵢ ≤ upper }`.
///
/// Bisects on the shift τ of `clamp(vᵢ − τ, lower, upper)`, whose sum is
/// continuous and non-increasing in τ. Requires `n·lower ≤ 1 ≤ n·upper`.
pub fn project_capped_simplex(v: &Array1<f64>, lower: f64, upper: f64) -> Array1<f64> {
    let min = v.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = v.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let mut lo = min - upper - 1.0;
    let mut hi = max - lower + 1.0;

    for _ in 0..PROJECTION_BISECTIONS {
        let tau = 0.5 * (lo + hi);
        let sum: f64 = v.iter().map(|&x| (x - tau).clamp(lower, upper)).sum();
        if sum > 1.0 {
            lo = tau;
        } else {
            hi = tau;
        }
    }

    let tau = 0.5 * (lo + hi);
    v.mapv(|x| (x - tau).clamp(lower, upper))
}

/// Minimize `objective` over the capped simplex from `initial`, optionally
/// subject to a linear target constraint.
///
/// Local minimizer: the result is the stationary point reached from the
/// initial guess, with no global-optimality guarantee. Exceeding the
/// iteration cap or leaving the target constraint unmet is reported as
/// `EngineError::NonConvergence`.
pub fn minimize<F>(
    objective: F,
    initial: &Array1<f64>,
    lower: f64,
    upper: f64,
    target: Option<&TargetConstraint>,
    settings: &SolverSettings,
) -> Result<Array1<f64>, EngineError>
where
    F: Fn(&Array1<f64>) -> f64,
{
    let n = initial.len() as f64;
    if n * lower > 1.0 + 1e-12 || n * upper < 1.0 - 1e-12 {
        return Err(EngineError::InfeasibleConstraints(format!(
            "Bounds ({}, {}) cannot satisfy the budget constraint for {} assets",
            lower,
            upper,
            initial.len()
        )));
    }

    let mut weights = project_capped_simplex(initial, lower, upper);

    let stages: &[f64] = if target.is_some() { &PENALTY_SCHEDULE } else { &[0.0] };
    for &mu in stages {
        let penalized = |w: &Array1<f64>| {
            let mut value = objective(w);
            if let Some(constraint) = target {
                let residual = constraint.coefficients.dot(w) - constraint.target;
                value += mu * residual * residual;
            }
            value
        };
        weights = descend(&penalized, weights, lower, upper, settings)?;
    }

    if let Some(constraint) = target {
        let residual = (constraint.coefficients.dot(&weights) - constraint.target).abs();
        if residual > settings.constraint_tolerance {
            return Err(EngineError::NonConvergence(format!(
                "Target-return constraint residual {:.3e} exceeds tolerance {:.1e}",
                residual, settings.constraint_tolerance
            )));
        }
    }

    Ok(weights)
}

fn descend<F>(
    f: &F,
    mut weights: Array1<f64>,
    lower: f64,
    upper: f64,
    settings: &SolverSettings,
) -> Result<Array1<f64>, EngineError>
where
    F: Fn(&Array1<f64>) -> f64,
{
    let mut current = f(&weights);

    for _ in 0..settings.max_iterations {
        let gradient = numeric_gradient(f, &weights);

        let mut improved = false;
        let mut alpha = 1.0;
        for _ in 0..LINE_SEARCH_HALVINGS {
            let candidate =
                project_capped_simplex(&(&weights - &gradient.mapv(|g| g * alpha)), lower, upper);
            let value = f(&candidate);
            if value < current - 1e-14 {
                let step = (&candidate - &weights)
                    .iter()
                    .fold(0.0f64, |acc, d| acc.max(d.abs()));
                weights = candidate;
                current = value;
                improved = true;
                if step < settings.step_tolerance {
                    return Ok(weights);
                }
                break;
            }
            alpha *= 0.5;
        }

        // No descent direction along the projected gradient: stationary point
        if !improved {
            return Ok(weights);
        }
    }

    Err(EngineError::NonConvergence(format!(
        "Iteration cap of {} exceeded before reaching a stationary point",
        settings.max_iterations
    )))
}

fn numeric_gradient<F>(f: &F, w: &Array1<f64>) -> Array1<f64>
where
    F: Fn(&Array1<f64>) -> f64,
{
    let mut gradient = Array1::zeros(w.len());
    let mut probe = w.clone();
    for i in 0..w.len() {
        let original = probe[i];
        probe[i] = original + GRADIENT_STEP;
        let forward = f(&probe);
        probe[i] = original - GRADIENT_STEP;
        let backward = f(&probe);
        probe[i] = original;
        gradient[i] = (forward - backward) / (2.0 * GRADIENT_STEP);
    }
    gradient
}
