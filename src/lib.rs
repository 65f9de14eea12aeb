//! qerra - Ethics-weighted resource allocation from sampled outcome distributions.
//!
//! ## Architecture
//!
//! A decision runs in two stages:
//! - **Source**: A backend (analytic, measurement, circuit) yields a
//!   probability distribution over `2^k` outcome labels
//! - **Decision**: The distribution either seeds a constrained optimizer or
//!   gates a binary ALLOCATE/BALANCE verdict
//!
//! ## Pipelines
//!
//! - **Optimize**: Source → Sample candidates → Score → Optimize → Artifact
//! - **Threshold**: Source → p(target) vs threshold and stock check → Artifact
//! - **Batch**: Scenarios (JSONL) → Scenario Pool → Outcomes (JSONL)
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Validated newtypes (weights, distributions, labels)
//! - B_i (Beliefs): Sampling and solving are fallible → Result
//! - I^R (Resolvable): Backend, solver and threshold settings come from config
//! - I^B (Bounded): Iteration caps and qubit limits bound every run

pub mod decision;
pub mod models;
pub mod pipeline;
pub mod pool;
pub mod source;

// Re-exports for convenience
pub use decision::{
    CandidateSampler, ConstrainedAllocationOptimizer, EthicsScorer, ThresholdDecisionPolicy,
};
pub use models::{
    AllocationVector, Category, Config, DecisionArtifact, Mode, OutcomeLabel,
    PriorityWeights, ProbabilityDistribution, QerraError, Result, Scenario,
};
pub use pipeline::{AllocationEngine, BatchPipeline};
pub use pool::ScenarioPool;
pub use source::{AnalyticSource, CircuitSource, DistributionSource, MeasurementSource};
