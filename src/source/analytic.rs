//! Analytic distribution source.
//!
//! Builds the superposition directly instead of sampling it: amplitude
//! `√w_i` per label, normalized so squared magnitudes sum to 1. Without
//! shaping every weight is 1 and the result is uniform.

use super::DistributionSource;
use crate::models::{check_qubits, ProbabilityDistribution, QerraError, Result};
use nalgebra::DVector;
use rand::RngCore;
use tracing::debug;

/// Closed-form superposition over all labels.
#[derive(Debug, Clone, Default)]
pub struct AnalyticSource {
    /// Per-label relative weights; `None` means equal amplitudes
    shaping: Option<Vec<f64>>,
}

impl AnalyticSource {
    /// Equal-amplitude superposition.
    pub fn uniform() -> Self {
        Self { shaping: None }
    }

    /// Superposition biased upstream of normalization.
    ///
    /// Probability of label `i` ends up proportional to `weights[i]`.
    pub fn shaped(weights: Vec<f64>) -> Result<Self> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(QerraError::invalid(
                "shaping weights must be finite and non-negative",
            ));
        }
        if !weights.iter().any(|w| *w > 0.0) {
            return Err(QerraError::invalid("shaping weights are all zero"));
        }
        Ok(Self {
            shaping: Some(weights),
        })
    }

    fn amplitudes(&self, labels: usize) -> Result<DVector<f64>> {
        match &self.shaping {
            None => Ok(DVector::from_element(labels, 1.0)),
            Some(weights) if weights.len() == labels => {
                Ok(DVector::from_iterator(labels, weights.iter().map(|w| w.sqrt())))
            }
            Some(weights) => Err(QerraError::invalid(format!(
                "{} shaping weights for {labels} labels",
                weights.len()
            ))),
        }
    }
}

impl DistributionSource for AnalyticSource {
    fn name(&self) -> &'static str {
        "analytic"
    }

    fn generate(&self, qubits: u32, _rng: &mut dyn RngCore) -> Result<ProbabilityDistribution> {
        check_qubits(qubits)?;
        let labels = 1usize << qubits;

        let amplitudes = self.amplitudes(labels)?;
        let norm = amplitudes.norm();
        let state = amplitudes / norm;
        let masses: Vec<f64> = state.iter().map(|a| a * a).collect();

        debug!(qubits, shaped = self.shaping.is_some(), "Analytic distribution built");
        ProbabilityDistribution::new(qubits, masses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutcomeLabel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_superposition() {
        let mut rng = StdRng::seed_from_u64(0);
        let dist = AnalyticSource::uniform().generate(3, &mut rng).unwrap();
        assert_eq!(dist.len(), 8);
        for mass in dist.masses() {
            assert!((mass - 0.125).abs() < 1e-12);
        }
        assert!(dist.shots().is_none());
    }

    #[test]
    fn test_shaping_sets_probabilities() {
        let mut rng = StdRng::seed_from_u64(0);
        let source = AnalyticSource::shaped(vec![0.2, 0.1, 0.1, 0.6]).unwrap();
        let dist = source.generate(2, &mut rng).unwrap();
        assert!((dist.probability(OutcomeLabel(3)) - 0.6).abs() < 1e-12);
        assert!((dist.probability(OutcomeLabel(0)) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_shaping_rejects_bad_weights() {
        assert!(AnalyticSource::shaped(vec![0.0, 0.0]).is_err());
        assert!(AnalyticSource::shaped(vec![1.0, -1.0]).is_err());

        let mut rng = StdRng::seed_from_u64(0);
        let source = AnalyticSource::shaped(vec![1.0, 1.0]).unwrap();
        assert!(matches!(
            source.generate(2, &mut rng),
            Err(QerraError::InvalidParameter(_))
        ));
    }
}
