//! Allocation-space value types.
//!
//! K_i: These types carry the invariants every stage relies on. Constructors
//! validate once so downstream code can index without re-checking.

use super::{QerraError, Result};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Allowed deviation of a distribution's total mass from 1.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// Largest qubit-count-equivalent a dense distribution may span.
pub const MAX_QUBITS: u32 = 24;

/// Per-recipient priority weights, index `i` belongs to recipient `i`.
///
/// K_i: Non-empty, finite, non-negative. Not normalized: relative magnitude
/// is the influence on the ethics score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct PriorityWeights(Vec<f64>);

impl PriorityWeights {
    /// Validate and wrap caller-supplied weights.
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(QerraError::invalid("priority weights must not be empty"));
        }
        if let Some((i, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(QerraError::invalid(format!(
                "priority weight {i} must be finite and non-negative, got {w}"
            )));
        }
        Ok(Self(weights))
    }

    /// Number of recipients.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no recipients.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Index of the highest weight (first one on ties).
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, w) in self.0.iter().enumerate() {
            if *w > self.0[best] {
                best = i;
            }
        }
        best
    }
}

impl TryFrom<Vec<f64>> for PriorityWeights {
    type Error = QerraError;

    fn try_from(weights: Vec<f64>) -> Result<Self> {
        Self::new(weights)
    }
}

impl From<PriorityWeights> for Vec<f64> {
    fn from(weights: PriorityWeights) -> Self {
        weights.0
    }
}

/// Units assigned per recipient.
///
/// K_i: When produced by the sampler the entries are integral and sum to N
/// exactly; when produced by the optimizer they sum to N within tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationVector(Vec<f64>);

impl AllocationVector {
    pub fn new(units: Vec<f64>) -> Self {
        Self(units)
    }

    pub fn zeros(recipients: usize) -> Self {
        Self(vec![0.0; recipients])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Total units allocated.
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub(crate) fn add_unit(&mut self, recipient: usize) {
        self.0[recipient] += 1.0;
    }
}

impl fmt::Display for AllocationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|u| format!("{u:.3}")).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Identifier of one cell of a distribution's sample space.
///
/// Bit `q` is the outcome of qubit-equivalent `q`, so qubit 0 is the
/// right-most character of the bitstring form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OutcomeLabel(pub u64);

impl OutcomeLabel {
    /// Label with the lowest `bits` bits set (e.g. `'11'` for two bits).
    pub fn all_ones(bits: u32) -> Self {
        if bits >= 64 {
            Self(u64::MAX)
        } else {
            Self((1u64 << bits) - 1)
        }
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Number of bits needed to write this label (at least 1).
    pub fn bit_length(self) -> u32 {
        (u64::BITS - self.0.leading_zeros()).max(1)
    }

    /// Zero-padded bitstring of the given width.
    pub fn to_bitstring(self, width: u32) -> String {
        format!("{:0width$b}", self.0, width = width as usize)
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deserializes from an integer or any string [`FromStr`] accepts.
impl<'de> Deserialize<'de> for OutcomeLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

impl FromStr for OutcomeLabel {
    type Err = QerraError;

    /// Accepts decimal, `0b…` binary or `0x…` hex.
    fn from_str(s: &str) -> Result<Self> {
        let re = Regex::new(r"^(?:0([bBxX]))?([0-9a-fA-F]+)$")
            .map_err(|e| QerraError::Internal(format!("label pattern: {e}")))?;
        let trimmed = s.trim().replace('_', "");
        let caps = re
            .captures(&trimmed)
            .ok_or_else(|| QerraError::ParseError(format!("not an outcome label: {s:?}")))?;

        let radix = match caps.get(1).map(|m| m.as_str()) {
            Some("b") | Some("B") => 2,
            Some("x") | Some("X") => 16,
            _ => 10,
        };
        u64::from_str_radix(&caps[2], radix)
            .map(Self)
            .map_err(|e| QerraError::ParseError(format!("outcome label {s:?}: {e}")))
    }
}

/// Probability mass over the `2^k` labels of a `k`-qubit sample space.
///
/// K_i: Masses are non-negative and sum to 1 within
/// [`NORMALIZATION_TOLERANCE`]. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityDistribution {
    qubits: u32,
    masses: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shots: Option<u32>,
}

impl ProbabilityDistribution {
    /// Build a distribution, enforcing the normalization postcondition.
    pub fn new(qubits: u32, masses: Vec<f64>) -> Result<Self> {
        check_qubits(qubits)?;
        let expected = 1usize << qubits;
        if masses.len() != expected {
            return Err(QerraError::DistributionNormalization(format!(
                "{} masses for {qubits} qubits, expected {expected}",
                masses.len()
            )));
        }
        if let Some((label, mass)) = masses
            .iter()
            .enumerate()
            .find(|(_, m)| !m.is_finite() || **m < 0.0)
        {
            return Err(QerraError::DistributionNormalization(format!(
                "label {label} has invalid mass {mass}"
            )));
        }
        let total: f64 = masses.iter().sum();
        if (total - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(QerraError::DistributionNormalization(format!(
                "masses sum to {total}, expected 1 within {NORMALIZATION_TOLERANCE:e}"
            )));
        }
        Ok(Self {
            qubits,
            masses,
            shots: None,
        })
    }

    /// Build an empirical distribution from per-label counts.
    pub fn from_counts(qubits: u32, counts: &[u64], shots: u32) -> Result<Self> {
        if shots == 0 {
            return Err(QerraError::invalid("trial count must be positive"));
        }
        let masses = counts
            .iter()
            .map(|c| *c as f64 / f64::from(shots))
            .collect();
        let mut dist = Self::new(qubits, masses)?;
        dist.shots = Some(shots);
        Ok(dist)
    }

    pub fn qubits(&self) -> u32 {
        self.qubits
    }

    /// Number of labels in the sample space (`2^k`).
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Trial count when the distribution is empirical.
    pub fn shots(&self) -> Option<u32> {
        self.shots
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Mass of a label; 0 for labels outside the sample space.
    pub fn probability(&self, label: OutcomeLabel) -> f64 {
        usize::try_from(label.0)
            .ok()
            .and_then(|i| self.masses.get(i).copied())
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.masses.iter().sum()
    }

    /// Non-zero masses keyed by bitstring, for reporting.
    pub fn histogram(&self) -> BTreeMap<String, f64> {
        self.masses
            .iter()
            .enumerate()
            .filter(|(_, m)| **m > 0.0)
            .map(|(i, m)| (OutcomeLabel(i as u64).to_bitstring(self.qubits), *m))
            .collect()
    }
}

/// Reject qubit counts the dense representation cannot hold.
pub fn check_qubits(qubits: u32) -> Result<()> {
    if qubits == 0 {
        return Err(QerraError::invalid("qubit count must be positive"));
    }
    if qubits > MAX_QUBITS {
        return Err(QerraError::invalid(format!(
            "qubit count {qubits} exceeds the maximum of {MAX_QUBITS}"
        )));
    }
    Ok(())
}

/// Smallest qubit count whose label space covers `recipients * resources`.
pub fn qubits_for(recipients: usize, resources: u64) -> u32 {
    let cells = (recipients as u128).saturating_mul(u128::from(resources));
    if cells <= 2 {
        return 1;
    }
    // ceil(log2(cells)) == bit length of (cells - 1)
    u128::BITS - (cells - 1).leading_zeros()
}
