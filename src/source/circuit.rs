//! Gate-based distribution source.
//!
//! A minimal state-vector simulator: `k` qubits start in `|0…0⟩`, gates are
//! applied in order, and the outcome distribution is the squared magnitude
//! of each amplitude. With shots configured the distribution is sampled
//! instead, mirroring what a hardware run would report.

use super::DistributionSource;
use crate::models::{check_qubits, PriorityLevel, ProbabilityDistribution, QerraError, Result};
use nalgebra::{Complex, DVector, Matrix2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2};
use tracing::debug;

type Amplitude = Complex<f64>;

/// A single gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Gate {
    /// Hadamard
    H { qubit: u32 },
    /// Pauli-X
    X { qubit: u32 },
    /// Rotation about X by `theta` radians
    Rx { qubit: u32, theta: f64 },
    /// Rotation about Y by `theta` radians
    Ry { qubit: u32, theta: f64 },
    /// Controlled NOT
    Cx { control: u32, target: u32 },
}

impl Gate {
    /// Highest qubit index the gate touches.
    fn max_qubit(&self) -> u32 {
        match *self {
            Self::H { qubit } | Self::X { qubit } => qubit,
            Self::Rx { qubit, .. } | Self::Ry { qubit, .. } => qubit,
            Self::Cx { control, target } => control.max(target),
        }
    }

    fn validate(&self, qubits: u32) -> Result<()> {
        if self.max_qubit() >= qubits {
            return Err(QerraError::invalid(format!(
                "{self:?} references a qubit outside a {qubits}-qubit register"
            )));
        }
        match *self {
            Self::Cx { control, target } if control == target => Err(QerraError::invalid(
                format!("cx control and target are both qubit {control}"),
            )),
            Self::Rx { theta, .. } | Self::Ry { theta, .. } if !theta.is_finite() => {
                Err(QerraError::invalid(format!("{self:?} has a non-finite angle")))
            }
            _ => Ok(()),
        }
    }

    /// 2x2 unitary for single-qubit gates.
    fn matrix(&self) -> Option<(u32, Matrix2<Amplitude>)> {
        let re = |x: f64| Complex::new(x, 0.0);
        let im = |x: f64| Complex::new(0.0, x);
        match *self {
            Self::H { qubit } => Some((
                qubit,
                Matrix2::new(
                    re(FRAC_1_SQRT_2),
                    re(FRAC_1_SQRT_2),
                    re(FRAC_1_SQRT_2),
                    re(-FRAC_1_SQRT_2),
                ),
            )),
            Self::X { qubit } => Some((qubit, Matrix2::new(re(0.0), re(1.0), re(1.0), re(0.0)))),
            Self::Rx { qubit, theta } => {
                let (s, c) = (theta / 2.0).sin_cos();
                Some((qubit, Matrix2::new(re(c), im(-s), im(-s), re(c))))
            }
            Self::Ry { qubit, theta } => {
                let (s, c) = (theta / 2.0).sin_cos();
                Some((qubit, Matrix2::new(re(c), re(-s), re(s), re(c))))
            }
            Self::Cx { .. } => None,
        }
    }
}

/// Ordered gate list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Circuit {
    gates: Vec<Gate>,
}

impl Circuit {
    pub fn from_gates(gates: Vec<Gate>) -> Self {
        Self { gates }
    }

    /// Site-priority circuit.
    ///
    /// Qubit 0 carries the lead site's priority: Hadamard for a fair chance,
    /// then RX(π/2) when the lead site is high priority. Every other qubit
    /// is a resource-balance qubit entangled with it through CX.
    pub fn priority_entangler(priorities: &[PriorityLevel]) -> Self {
        let sites = priorities.len().max(1) as u32;
        let mut gates = vec![Gate::H { qubit: 0 }];
        if priorities.first() == Some(&PriorityLevel::High) {
            gates.push(Gate::Rx {
                qubit: 0,
                theta: FRAC_PI_2,
            });
        }
        gates.extend((1..sites).map(|target| Gate::Cx { control: 0, target }));
        Self { gates }
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Final state after applying every gate to `|0…0⟩`.
    pub fn state_vector(&self, qubits: u32) -> Result<DVector<Amplitude>> {
        check_qubits(qubits)?;
        for gate in &self.gates {
            gate.validate(qubits)?;
        }

        let mut state = DVector::from_element(1usize << qubits, Complex::new(0.0, 0.0));
        state[0] = Complex::new(1.0, 0.0);

        for gate in &self.gates {
            if let Gate::Cx { control, target } = *gate {
                apply_cx(&mut state, control, target);
            } else if let Some((qubit, m)) = gate.matrix() {
                apply_single(&mut state, qubit, &m);
            }
        }
        Ok(state)
    }

    /// Exact outcome probabilities (squared amplitude magnitudes).
    pub fn probabilities(&self, qubits: u32) -> Result<Vec<f64>> {
        Ok(self
            .state_vector(qubits)?
            .iter()
            .map(|a| a.norm_sqr())
            .collect())
    }
}

fn apply_single(state: &mut DVector<Amplitude>, qubit: u32, m: &Matrix2<Amplitude>) {
    let mask = 1usize << qubit;
    for i in 0..state.len() {
        if i & mask == 0 {
            let j = i | mask;
            let (a, b) = (state[i], state[j]);
            state[i] = m[(0, 0)] * a + m[(0, 1)] * b;
            state[j] = m[(1, 0)] * a + m[(1, 1)] * b;
        }
    }
}

fn apply_cx(state: &mut DVector<Amplitude>, control: u32, target: u32) {
    let (cmask, tmask) = (1usize << control, 1usize << target);
    for i in 0..state.len() {
        if i & cmask != 0 && i & tmask == 0 {
            let j = i | tmask;
            let tmp = state[i];
            state[i] = state[j];
            state[j] = tmp;
        }
    }
}

/// Distribution from a simulated circuit, exact or sampled.
#[derive(Debug, Clone)]
pub struct CircuitSource {
    circuit: Circuit,
    shots: Option<u32>,
}

impl CircuitSource {
    pub fn new(circuit: Circuit, shots: Option<u32>) -> Result<Self> {
        if shots == Some(0) {
            return Err(QerraError::invalid("shot count must be positive"));
        }
        Ok(Self { circuit, shots })
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

impl DistributionSource for CircuitSource {
    fn name(&self) -> &'static str {
        "circuit"
    }

    fn generate(&self, qubits: u32, rng: &mut dyn RngCore) -> Result<ProbabilityDistribution> {
        let probabilities = self.circuit.probabilities(qubits)?;

        let Some(shots) = self.shots else {
            debug!(qubits, gates = self.circuit.gates.len(), "Exact circuit distribution");
            return ProbabilityDistribution::new(qubits, probabilities);
        };

        let index = WeightedIndex::new(&probabilities)
            .map_err(|e| QerraError::DistributionNormalization(format!("circuit state: {e}")))?;
        let mut counts = vec![0u64; probabilities.len()];
        for _ in 0..shots {
            counts[index.sample(rng)] += 1;
        }

        debug!(qubits, shots, gates = self.circuit.gates.len(), "Circuit shots sampled");
        ProbabilityDistribution::from_counts(qubits, &counts, shots)
    }
}
