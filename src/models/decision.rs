//! Decision artifacts and batch records.
//!
//! K_i: These types represent what flows out of the engine. Once returned
//! they are never mutated; reporting collaborators only read them.

use super::{AllocationVector, ModeKind, OutcomeLabel, PriorityWeights, ThresholdSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which pipeline one engine invocation runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Sample a seed allocation and refine it to the ethics optimum.
    Optimize,
    /// Gate a binary decision on one outcome's probability.
    Threshold(ThresholdSettings),
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Optimize => ModeKind::Optimize,
            Self::Threshold(_) => ModeKind::Threshold,
        }
    }
}

/// Threshold-mode verdict.
///
/// K_i: Binary. BALANCE is an ordinary outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    /// Outcome probability cleared the threshold and enough units exist
    Allocate,
    /// Diversify instead of committing to the target outcome
    Balance,
}

impl Category {
    /// Human-readable verdict for reports.
    pub fn verdict(self) -> &'static str {
        match self {
            Self::Allocate => {
                "ETHICAL ALLOCATE: Send high-priority resources (bias-free verdict)."
            }
            Self::Balance => {
                "BALANCE ETHICALLY: Diversify allocation (outcome uncertainty detected)."
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocate => write!(f, "ALLOCATE"),
            Self::Balance => write!(f, "BALANCE"),
        }
    }
}

/// A sampled, feasible but not yet optimal allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Label the allocation was decoded from
    pub label: OutcomeLabel,

    /// Integral allocation summing to the resource count
    pub allocation: AllocationVector,
}

/// Optimization-mode result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationDecision {
    /// Unique identifier for this decision
    pub id: String,

    /// Ethics-optimal allocation
    pub allocation: AllocationVector,

    /// Score of the optimal allocation
    pub score: f64,

    /// Seed the optimizer started from
    pub seed: Candidate,

    /// Score of the seed
    pub seed_score: f64,

    /// Solver iterations used
    pub iterations: usize,

    /// Qubit-count-equivalent of the sampled distribution
    pub qubits: u32,

    /// Decision timestamp
    pub decided_at: DateTime<Utc>,
}

/// Threshold-mode result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdDecision {
    /// Unique identifier for this decision
    pub id: String,

    /// ALLOCATE or BALANCE
    pub category: Category,

    /// Probability mass of the target outcome
    pub supporting_probability: f64,

    /// Threshold the probability had to exceed
    pub threshold_used: f64,

    /// Outcome treated as the success cell
    pub target_outcome: OutcomeLabel,

    /// Units on hand
    pub resource_available: u64,

    /// Units required before allocating
    pub min_units_required: u64,

    /// Qubit-count-equivalent of the sampled distribution
    pub qubits: u32,

    /// Non-zero masses keyed by bitstring
    pub histogram: BTreeMap<String, f64>,

    /// Decision timestamp
    pub decided_at: DateTime<Utc>,
}

/// Output of one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DecisionArtifact {
    Optimize(AllocationDecision),
    Threshold(ThresholdDecision),
}

impl DecisionArtifact {
    pub fn id(&self) -> &str {
        match self {
            Self::Optimize(d) => &d.id,
            Self::Threshold(d) => &d.id,
        }
    }

    pub fn as_allocation(&self) -> Option<&AllocationDecision> {
        match self {
            Self::Optimize(d) => Some(d),
            Self::Threshold(_) => None,
        }
    }

    pub fn as_threshold(&self) -> Option<&ThresholdDecision> {
        match self {
            Self::Threshold(d) => Some(d),
            Self::Optimize(_) => None,
        }
    }
}

/// One line of a scenario batch file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique identifier for this scenario
    pub id: String,

    /// Units to distribute
    pub num_resources: u64,

    /// One weight per recipient
    pub priority_weights: PriorityWeights,

    /// Pipeline to run
    #[serde(default)]
    pub mode: ModeKind,

    /// Required when mode is threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<ThresholdSettings>,

    /// RNG seed for reproducible draws
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Result record written for each scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// ID of the source scenario
    pub scenario_id: String,

    /// Decision, when the engine succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<DecisionArtifact>,

    /// Error message, when it did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Total scenarios processed
    pub total_scenarios: usize,

    /// Optimization-mode decisions
    pub total_optimized: usize,

    /// Threshold-mode ALLOCATE verdicts
    pub total_allocate: usize,

    /// Threshold-mode BALANCE verdicts
    pub total_balance: usize,

    /// Scenarios that returned an error
    pub total_failed: usize,

    /// Total runtime in seconds
    pub runtime_secs: f64,

    /// Scenarios per second
    pub throughput_per_sec: f64,

    /// Share of threshold decisions that allocated (0.0 - 1.0)
    pub allocate_rate: f64,
}

impl RunStats {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &ScenarioOutcome) {
        match &outcome.artifact {
            Some(DecisionArtifact::Optimize(_)) => self.total_optimized += 1,
            Some(DecisionArtifact::Threshold(d)) => match d.category {
                Category::Allocate => self.total_allocate += 1,
                Category::Balance => self.total_balance += 1,
            },
            None => self.total_failed += 1,
        }
    }

    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        let thresholded = self.total_allocate + self.total_balance;
        if thresholded > 0 {
            self.allocate_rate = self.total_allocate as f64 / thresholded as f64;
        }
        if self.runtime_secs > 0.0 {
            self.throughput_per_sec = self.total_scenarios as f64 / self.runtime_secs;
        }
    }
}
