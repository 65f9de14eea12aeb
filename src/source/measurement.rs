//! Measurement-statistics distribution source.
//!
//! Runs independent trials of a two-outcome-per-qubit process and reports
//! empirical frequencies. Trials run sequentially so aggregate counts are
//! reproducible for a seeded RNG.

use super::DistributionSource;
use crate::models::{check_qubits, ProbabilityDistribution, QerraError, Result};
use rand::{Rng, RngCore};
use tracing::debug;

/// Bias used for qubits without an explicit entry.
pub const UNBIASED: f64 = 0.5;

/// Empirical frequencies of repeated biased trials.
#[derive(Debug, Clone)]
pub struct MeasurementSource {
    trials: u32,
    /// Probability that qubit `q` reads 1
    qubit_bias: Vec<f64>,
}

impl MeasurementSource {
    pub fn new(trials: u32, qubit_bias: Vec<f64>) -> Result<Self> {
        if trials == 0 {
            return Err(QerraError::invalid("trial count must be positive"));
        }
        if let Some((q, b)) = qubit_bias
            .iter()
            .enumerate()
            .find(|(_, b)| !(0.0..=1.0).contains(*b))
        {
            return Err(QerraError::invalid(format!(
                "bias for qubit {q} must be within [0, 1], got {b}"
            )));
        }
        Ok(Self { trials, qubit_bias })
    }

    /// Fair coin on every qubit.
    pub fn unbiased(trials: u32) -> Result<Self> {
        Self::new(trials, Vec::new())
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    fn bias(&self, qubit: u32) -> f64 {
        self.qubit_bias
            .get(qubit as usize)
            .copied()
            .unwrap_or(UNBIASED)
    }
}

impl DistributionSource for MeasurementSource {
    fn name(&self) -> &'static str {
        "measurement"
    }

    fn generate(&self, qubits: u32, rng: &mut dyn RngCore) -> Result<ProbabilityDistribution> {
        check_qubits(qubits)?;
        let biases: Vec<f64> = (0..qubits).map(|q| self.bias(q)).collect();
        let mut counts = vec![0u64; 1usize << qubits];

        for _ in 0..self.trials {
            let mut label = 0usize;
            for (q, bias) in biases.iter().enumerate() {
                if rng.gen_bool(*bias) {
                    label |= 1 << q;
                }
            }
            counts[label] += 1;
        }

        let observed = counts.iter().filter(|c| **c > 0).count();
        debug!(qubits, trials = self.trials, observed, "Measurement trials complete");
        ProbabilityDistribution::from_counts(qubits, &counts, self.trials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutcomeLabel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(MeasurementSource::new(0, vec![]).is_err());
        assert!(MeasurementSource::new(10, vec![1.2]).is_err());
        assert!(MeasurementSource::new(10, vec![-0.1]).is_err());
    }

    #[test]
    fn test_certain_bias_is_deterministic() {
        let source = MeasurementSource::new(64, vec![1.0, 0.0, 1.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let dist = source.generate(3, &mut rng).unwrap();
        assert_eq!(dist.probability(OutcomeLabel(0b101)), 1.0);
        assert_eq!(dist.histogram().len(), 1);
        assert_eq!(dist.shots(), Some(64));
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let source = MeasurementSource::unbiased(1024).unwrap();
        let a = source.generate(3, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = source.generate(3, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unobserved_labels_have_zero_mass() {
        // qubit 1 never fires, so labels 2 and 3 are never seen
        let source = MeasurementSource::new(200, vec![0.5, 0.0]).unwrap();
        let dist = source.generate(2, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(dist.probability(OutcomeLabel(2)), 0.0);
        assert_eq!(dist.probability(OutcomeLabel(3)), 0.0);
        assert!((dist.total() - 1.0).abs() < 1e-12);
    }
}
