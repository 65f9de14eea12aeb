//! Candidate sampler.
//!
//! K_i: A decoded candidate always sums to the resource count and every
//! entry is a non-negative integer. It is a feasible seed, not an optimum.
//! B_i: The draw is random; decoding is not.

use crate::models::{
    AllocationVector, Candidate, OutcomeLabel, ProbabilityDistribution, QerraError, Result,
};
use rand::distributions::{Distribution, WeightedIndex};
use rand::RngCore;
use tracing::debug;

/// Draws outcome labels by probability mass and decodes them to allocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateSampler;

impl CandidateSampler {
    /// Draw one candidate.
    ///
    /// Zero-mass labels are never selected.
    pub fn sample(
        &self,
        distribution: &ProbabilityDistribution,
        recipients: usize,
        resources: u64,
        rng: &mut dyn RngCore,
    ) -> Result<Candidate> {
        let index = label_index(distribution)?;
        self.draw(&index, recipients, resources, rng)
    }

    /// Draw `count` independent candidates.
    pub fn sample_many(
        &self,
        distribution: &ProbabilityDistribution,
        recipients: usize,
        resources: u64,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Candidate>> {
        if count == 0 {
            return Err(QerraError::invalid("candidate count must be at least 1"));
        }
        let index = label_index(distribution)?;
        (0..count)
            .map(|_| self.draw(&index, recipients, resources, rng))
            .collect()
    }

    fn draw(
        &self,
        index: &WeightedIndex<f64>,
        recipients: usize,
        resources: u64,
        rng: &mut dyn RngCore,
    ) -> Result<Candidate> {
        let label = OutcomeLabel(index.sample(rng) as u64);
        let allocation = decode_label(label, recipients, resources)?;
        debug!(label = %label, allocation = %allocation, "Candidate drawn");
        Ok(Candidate { label, allocation })
    }
}

fn label_index(distribution: &ProbabilityDistribution) -> Result<WeightedIndex<f64>> {
    WeightedIndex::new(distribution.masses())
        .map_err(|e| QerraError::DistributionNormalization(format!("cannot sample: {e}")))
}

/// Decode a label into an allocation by base-`recipients` digit extraction.
///
/// Each of the `resources` digits assigns one unit to `label mod recipients`,
/// then the label is divided by `recipients`. Once the label reaches zero
/// the remaining units all land on recipient 0.
pub fn decode_label(
    label: OutcomeLabel,
    recipients: usize,
    resources: u64,
) -> Result<AllocationVector> {
    if recipients == 0 {
        return Err(QerraError::invalid("at least one recipient is required"));
    }
    let base = recipients as u64;
    let mut remaining = label.value();
    let mut allocation = AllocationVector::zeros(recipients);

    for _ in 0..resources {
        allocation.add_unit((remaining % base) as usize);
        remaining /= base;
    }
    Ok(allocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_decode_digits() {
        // 5 = 12 in base 3 → digits (low first) 2, 1, 0
        let a = decode_label(OutcomeLabel(5), 3, 3).unwrap();
        assert_eq!(a.as_slice(), &[1.0, 1.0, 1.0]);

        // 7 = 21 in base 3 → digits 1, 2, 0
        let a = decode_label(OutcomeLabel(7), 3, 3).unwrap();
        assert_eq!(a.as_slice(), &[1.0, 1.0, 1.0]);

        let a = decode_label(OutcomeLabel(0), 3, 3).unwrap();
        assert_eq!(a.as_slice(), &[3.0, 0.0, 0.0]);

        // 8 = 22 in base 3 → digits 2, 2, 0
        let a = decode_label(OutcomeLabel(8), 3, 3).unwrap();
        assert_eq!(a.as_slice(), &[1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_decode_requires_recipients() {
        assert!(matches!(
            decode_label(OutcomeLabel(1), 0, 3),
            Err(QerraError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_mass_labels_never_drawn() {
        let dist = ProbabilityDistribution::new(2, vec![0.0, 0.0, 1.0, 0.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        let candidates = CandidateSampler
            .sample_many(&dist, 2, 4, 50, &mut rng)
            .unwrap();
        assert!(candidates.iter().all(|c| c.label == OutcomeLabel(2)));
        // 2 = 010 in base 2, four digits → 0,1,0,0
        assert_eq!(candidates[0].allocation.as_slice(), &[3.0, 1.0]);
    }

    #[test]
    fn test_sample_many_needs_a_count() {
        let dist = ProbabilityDistribution::new(1, vec![0.5, 0.5]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(CandidateSampler.sample_many(&dist, 2, 1, 0, &mut rng).is_err());
    }

    proptest! {
        #[test]
        fn prop_decoded_allocation_is_feasible(
            label in 0u64..1 << 20,
            recipients in 1usize..8,
            resources in 0u64..40,
        ) {
            let a = decode_label(OutcomeLabel(label), recipients, resources).unwrap();
            prop_assert_eq!(a.len(), recipients);
            prop_assert_eq!(a.total(), resources as f64);
            prop_assert!(a.as_slice().iter().all(|u| *u >= 0.0 && u.fract() == 0.0));
        }

        #[test]
        fn prop_sampled_candidate_sums_to_resources(seed in any::<u64>(), resources in 0u64..12) {
            let dist = ProbabilityDistribution::new(3, vec![0.125; 8]).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let c = CandidateSampler.sample(&dist, 3, resources, &mut rng).unwrap();
            prop_assert_eq!(c.allocation.total(), resources as f64);
            prop_assert!(c.label.value() < 8);
        }
    }
}
