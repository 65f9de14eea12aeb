//! Ethics scorer.
//!
//! K_i: The score is the dot product of an allocation with the priority
//! weights. Pure and deterministic; higher means more units on higher
//! priority recipients.

use crate::models::{AllocationVector, Candidate, PriorityWeights, QerraError, Result};

/// Weighted-sum desirability of allocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthicsScorer;

impl EthicsScorer {
    /// Score one allocation.
    pub fn score(&self, allocation: &AllocationVector, weights: &PriorityWeights) -> Result<f64> {
        if allocation.len() != weights.len() {
            return Err(QerraError::invalid(format!(
                "allocation has {} entries but there are {} priority weights",
                allocation.len(),
                weights.len()
            )));
        }
        Ok(allocation
            .as_slice()
            .iter()
            .zip(weights.as_slice())
            .map(|(units, weight)| units * weight)
            .sum())
    }

    /// Highest-scoring candidate; the earliest wins ties.
    pub fn best<'a>(
        &self,
        candidates: &'a [Candidate],
        weights: &PriorityWeights,
    ) -> Result<Option<(&'a Candidate, f64)>> {
        let mut best: Option<(&Candidate, f64)> = None;
        for candidate in candidates {
            let score = self.score(&candidate.allocation, weights)?;
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }
        Ok(best)
    }
}
