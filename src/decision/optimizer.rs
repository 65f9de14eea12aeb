//! Constrained allocation optimizer.
//!
//! Maximizes the ethics score `w · x` subject to `Σx = N` and
//! `0 ≤ x_i ≤ N`. The feasible set is the simplex scaled by N (the upper
//! bound is implied by the others), so the solver is projected-gradient
//! ascent: step along `w`, project back onto the simplex, repeat.
//!
//! Epistemic foundation:
//! - K_i: For a linear objective the optimum is a vertex, so a unique
//!   highest weight receives all N units
//! - K_i: A feasible point is optimal iff every unit sits on a maximal
//!   weight; convergence requires that, not just a short step
//! - I^B: The iteration cap bounds runtime; hitting it is reported, never
//!   papered over with the seed

use crate::models::{AllocationVector, OptimizerConfig, PriorityWeights, QerraError, Result};
use nalgebra::DVector;
use tracing::debug;

/// Result of a converged solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    /// Feasible, score-maximizing allocation
    pub allocation: AllocationVector,

    /// Projected steps taken
    pub iterations: usize,
}

/// Projected-gradient solver over the resource simplex.
#[derive(Debug, Clone, Copy)]
pub struct ConstrainedAllocationOptimizer {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for ConstrainedAllocationOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl ConstrainedAllocationOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }

    /// Refine `seed` into the allocation maximizing the ethics score.
    ///
    /// The step starts at `N / (max w - min w)`, large enough to cross the
    /// simplex once, and doubles every iteration so ties between close
    /// weights resolve in logarithmically many steps.
    pub fn optimize(
        &self,
        seed: &AllocationVector,
        weights: &PriorityWeights,
        resources: u64,
    ) -> Result<Optimum> {
        if seed.len() != weights.len() {
            return Err(QerraError::invalid(format!(
                "seed has {} entries but there are {} priority weights",
                seed.len(),
                weights.len()
            )));
        }
        if seed.as_slice().iter().any(|u| !u.is_finite() || *u < 0.0) {
            return Err(QerraError::invalid(
                "seed entries must be finite and non-negative",
            ));
        }

        if resources == 0 {
            return Ok(Optimum {
                allocation: AllocationVector::zeros(weights.len()),
                iterations: 0,
            });
        }

        let total = resources as f64;
        let w = DVector::from_column_slice(weights.as_slice());
        let mut x = project_onto_simplex(&DVector::from_column_slice(seed.as_slice()), total);

        let spread = w.max() - w.min();
        if spread <= 0.0 {
            // every feasible point scores the same
            debug!("Equal weights, returning projected seed");
            return Ok(Optimum {
                allocation: to_allocation(&x),
                iterations: 0,
            });
        }

        let top = w.max();
        let converged_below = self.tolerance * total.max(1.0);
        let mut step = total / spread;
        let mut residual = f64::INFINITY;

        for iteration in 1..=self.max_iterations {
            let next = project_onto_simplex(&(&x + &w * step), total);
            residual = (&next - &x).amax();
            x = next;

            if residual <= converged_below && on_top_face(&x, &w, top) {
                debug!(iteration, step, "Optimizer converged");
                return Ok(Optimum {
                    allocation: to_allocation(&x),
                    iterations: iteration,
                });
            }
            step *= 2.0;
        }

        Err(QerraError::OptimizerNonConvergence {
            iterations: self.max_iterations,
            residual,
        })
    }
}

/// Every unit of `x` sits on a recipient holding the maximal weight.
fn on_top_face(x: &DVector<f64>, w: &DVector<f64>, top: f64) -> bool {
    x.iter().zip(w.iter()).all(|(units, weight)| *units == 0.0 || *weight == top)
}

fn to_allocation(x: &DVector<f64>) -> AllocationVector {
    AllocationVector::new(x.iter().copied().collect())
}

/// Euclidean projection onto `{x ≥ 0, Σx = total}`.
///
/// Sort-based threshold search. The input is shifted so its largest entry
/// is 0 first; the projection is shift-invariant and this keeps the vertex
/// coordinate exact when steps grow large.
pub fn project_onto_simplex(y: &DVector<f64>, total: f64) -> DVector<f64> {
    let shift = y.max();
    let mut sorted: Vec<f64> = y.iter().map(|v| v - shift).collect();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (j, u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - total) / (j + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        } else {
            break;
        }
    }

    y.map(|v| (v - shift - theta).max(0.0))
}
