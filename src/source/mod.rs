//! Distribution sources - where candidate allocations come from.
//!
//! Epistemic foundation:
//! - K_i: Every backend yields a distribution over `2^k` labels summing to 1
//! - B_i: Construction may fail on bad parameters → Result
//! - I^R: Backend choice and its knobs come from `[source]`
//!
//! Backends:
//! - `AnalyticSource`: closed-form superposition (uniform unless shaped)
//! - `MeasurementSource`: empirical frequencies of biased trials
//! - `CircuitSource`: gate-level state-vector simulation

mod analytic;
mod circuit;
mod measurement;

pub use analytic::*;
pub use circuit::*;
pub use measurement::*;

use crate::models::{PriorityLevel, ProbabilityDistribution, Result, SourceConfig};
use rand::RngCore;

/// Produces a normalized probability mass function over `2^qubits` labels.
///
/// Implementations must return masses summing to 1 within
/// [`crate::models::NORMALIZATION_TOLERANCE`]; `ProbabilityDistribution::new`
/// enforces this and fails fast otherwise.
pub trait DistributionSource: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Generate a fresh distribution. Backends that are not random ignore `rng`.
    fn generate(&self, qubits: u32, rng: &mut dyn RngCore) -> Result<ProbabilityDistribution>;
}

impl SourceConfig {
    /// Build the configured backend.
    ///
    /// `priorities` feeds backends that encode per-site priority: the
    /// measurement bias when none is given, and the default circuit.
    pub fn build(&self, priorities: &[PriorityLevel]) -> Result<Box<dyn DistributionSource>> {
        match self {
            Self::Analytic { shaping } => {
                let source = match shaping {
                    Some(weights) => AnalyticSource::shaped(weights.clone())?,
                    None => AnalyticSource::uniform(),
                };
                Ok(Box::new(source))
            }
            Self::Measurement { trials, qubit_bias } => {
                let bias = if qubit_bias.is_empty() {
                    priorities.iter().map(|p| p.bias()).collect()
                } else {
                    qubit_bias.clone()
                };
                Ok(Box::new(MeasurementSource::new(*trials, bias)?))
            }
            Self::Circuit { gates, shots } => {
                let circuit = match gates {
                    Some(gates) => Circuit::from_gates(gates.clone()),
                    None => Circuit::priority_entangler(priorities),
                };
                Ok(Box::new(CircuitSource::new(circuit, *shots)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NORMALIZATION_TOLERANCE;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn all_backends() -> Vec<Box<dyn DistributionSource>> {
        let priorities = [PriorityLevel::High, PriorityLevel::Low];
        vec![
            SourceConfig::Analytic { shaping: None }.build(&priorities).unwrap(),
            SourceConfig::default().build(&priorities).unwrap(),
            SourceConfig::Circuit {
                gates: None,
                shots: None,
            }
            .build(&priorities)
            .unwrap(),
            SourceConfig::Circuit {
                gates: None,
                shots: Some(256),
            }
            .build(&priorities)
            .unwrap(),
        ]
    }

    #[test]
    fn test_every_backend_is_normalized() {
        let mut rng = StdRng::seed_from_u64(11);
        for source in all_backends() {
            for qubits in 2..=6 {
                let dist = source.generate(qubits, &mut rng).unwrap();
                assert_eq!(dist.len(), 1 << qubits, "{}", source.name());
                assert!(
                    (dist.total() - 1.0).abs() <= NORMALIZATION_TOLERANCE,
                    "{} at k={qubits}",
                    source.name()
                );
                assert!(dist.masses().iter().all(|m| *m >= 0.0));
            }
        }
    }

    #[test]
    fn test_every_backend_rejects_zero_qubits() {
        let mut rng = StdRng::seed_from_u64(0);
        for source in all_backends() {
            assert!(source.generate(0, &mut rng).is_err(), "{}", source.name());
        }
    }

    #[test]
    fn test_measurement_bias_follows_priorities() {
        let source = SourceConfig::Measurement {
            trials: 4000,
            qubit_bias: vec![],
        }
        .build(&[PriorityLevel::High])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let dist = source.generate(1, &mut rng).unwrap();
        // qubit 0 biased to 0.75 toward 1
        assert!(dist.masses()[1] > 0.7 && dist.masses()[1] < 0.8);
    }
}
