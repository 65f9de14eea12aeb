//! Decision stages - turn a distribution into an allocation or a verdict.
//!
//! Stages:
//! - `CandidateSampler`: draw a label, decode it into a feasible seed
//! - `EthicsScorer`: weighted-sum desirability of an allocation
//! - `ConstrainedAllocationOptimizer`: refine a seed to the ethics optimum
//! - `ThresholdDecisionPolicy`: ALLOCATE / BALANCE gate on one outcome

mod optimizer;
mod sampler;
mod scorer;
mod threshold;

pub use optimizer::*;
pub use sampler::*;
pub use scorer::*;
pub use threshold::*;
