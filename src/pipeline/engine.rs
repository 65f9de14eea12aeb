//! Allocation engine.
//!
//! Pipeline flow:
//! - Optimize:  Source → Sampler → Scorer (best seed) → Optimizer → Artifact
//! - Threshold: Source → ThresholdDecisionPolicy → Artifact
//!
//! The engine holds only what is fixed at construction (weights, resource
//! count, backend, solver settings). Every invocation builds and drops its
//! own distribution and RNG, so one engine can serve concurrent callers.

use crate::decision::{
    CandidateSampler, ConstrainedAllocationOptimizer, EthicsScorer, ThresholdDecisionPolicy,
};
use crate::models::{
    qubits_for, AllocationDecision, Config, DecisionArtifact, Mode, OptimizerConfig,
    PriorityWeights, QerraError, Result, ThresholdDecision, ThresholdSettings,
};
use crate::source::DistributionSource;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};
use uuid::Uuid;

/// Orchestrates one decision per invocation.
pub struct AllocationEngine {
    weights: PriorityWeights,
    resources: u64,
    source: Box<dyn DistributionSource>,
    sampler: CandidateSampler,
    scorer: EthicsScorer,
    optimizer: ConstrainedAllocationOptimizer,
    policy: ThresholdDecisionPolicy,
    /// Seeds drawn per optimize run
    candidates: usize,
    /// RNG seed; entropy when `None`
    seed: Option<u64>,
}

impl AllocationEngine {
    /// Create an engine with default solver settings and a single candidate.
    pub fn new(
        weights: PriorityWeights,
        resources: u64,
        source: Box<dyn DistributionSource>,
    ) -> Self {
        Self {
            weights,
            resources,
            source,
            sampler: CandidateSampler,
            scorer: EthicsScorer,
            optimizer: ConstrainedAllocationOptimizer::default(),
            policy: ThresholdDecisionPolicy,
            candidates: 1,
            seed: None,
        }
    }

    /// Build the engine and its backend from a loaded config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = config.source.build(config.priorities())?;
        Ok(Self::new(
            config.engine.priority_weights.clone(),
            config.engine.num_resources,
            source,
        )
        .with_optimizer(config.optimizer)
        .with_candidates(config.engine.candidates)
        .with_seed(config.engine.seed))
    }

    pub fn with_optimizer(mut self, config: OptimizerConfig) -> Self {
        self.optimizer = ConstrainedAllocationOptimizer::new(config);
        self
    }

    pub fn with_candidates(mut self, candidates: usize) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn weights(&self) -> &PriorityWeights {
        &self.weights
    }

    pub fn resources(&self) -> u64 {
        self.resources
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Run one invocation with a fresh RNG.
    pub fn run(&self, mode: &Mode) -> Result<DecisionArtifact> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(mode, &mut rng)
    }

    /// Run one invocation with a caller-supplied RNG.
    pub fn run_with_rng(&self, mode: &Mode, rng: &mut dyn RngCore) -> Result<DecisionArtifact> {
        match mode {
            Mode::Optimize => self.optimize(rng).map(DecisionArtifact::Optimize),
            Mode::Threshold(settings) => self
                .threshold(settings, rng)
                .map(DecisionArtifact::Threshold),
        }
    }

    fn optimize(&self, rng: &mut dyn RngCore) -> Result<AllocationDecision> {
        let recipients = self.weights.len();
        let qubits = qubits_for(recipients, self.resources);
        let distribution = self.source.generate(qubits, rng)?;
        debug!(
            source = self.source.name(),
            qubits,
            labels = distribution.len(),
            "Distribution generated"
        );

        let candidates = self.sampler.sample_many(
            &distribution,
            recipients,
            self.resources,
            self.candidates,
            rng,
        )?;
        let (seed, seed_score) = self
            .scorer
            .best(&candidates, &self.weights)?
            .ok_or_else(|| QerraError::Internal("sampler returned no candidates".to_string()))?;

        let optimum = self
            .optimizer
            .optimize(&seed.allocation, &self.weights, self.resources)?;
        let score = self.scorer.score(&optimum.allocation, &self.weights)?;

        info!(
            seed_label = %seed.label,
            seed_score,
            score,
            iterations = optimum.iterations,
            allocation = %optimum.allocation,
            "Allocation optimized"
        );

        Ok(AllocationDecision {
            id: Uuid::new_v4().to_string(),
            allocation: optimum.allocation,
            score,
            seed: seed.clone(),
            seed_score,
            iterations: optimum.iterations,
            qubits,
            decided_at: Utc::now(),
        })
    }

    fn threshold(
        &self,
        settings: &ThresholdSettings,
        rng: &mut dyn RngCore,
    ) -> Result<ThresholdDecision> {
        let qubits = settings.qubits();
        let target = settings.target();
        let distribution = self.source.generate(qubits, rng)?;

        let outcome = self.policy.decide(
            &distribution,
            target,
            settings.resource_available,
            settings.min_units_required,
            settings.probability_threshold,
        )?;

        info!(
            category = %outcome.category,
            target = %target.to_bitstring(qubits),
            probability = format!("{:.2}%", outcome.probability * 100.0),
            threshold = outcome.threshold,
            "Threshold decision made"
        );

        Ok(ThresholdDecision {
            id: Uuid::new_v4().to_string(),
            category: outcome.category,
            supporting_probability: outcome.probability,
            threshold_used: outcome.threshold,
            target_outcome: target,
            resource_available: settings.resource_available,
            min_units_required: settings.min_units_required,
            qubits,
            histogram: distribution.histogram(),
            decided_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, OutcomeLabel, PriorityLevel};
    use crate::source::{AnalyticSource, Circuit, CircuitSource, MeasurementSource};

    fn weights(w: &[f64]) -> PriorityWeights {
        PriorityWeights::new(w.to_vec()).unwrap()
    }

    #[test]
    fn test_optimize_mode_reaches_vertex() {
        let engine = AllocationEngine::new(
            weights(&[3.0, 2.0, 1.0]),
            3,
            Box::new(MeasurementSource::unbiased(1024).unwrap()),
        )
        .with_seed(Some(7));

        let artifact = engine.run(&Mode::Optimize).unwrap();
        let decision = artifact.as_allocation().unwrap();
        assert_eq!(decision.allocation.as_slice(), &[3.0, 0.0, 0.0]);
        assert_eq!(decision.score, 9.0);
        assert_eq!(decision.qubits, 4);
        assert_eq!(decision.seed.allocation.total(), 3.0);
        assert!(decision.seed_score <= decision.score);
    }

    #[test]
    fn test_seeded_runs_repeat_seed_candidate() {
        let engine = AllocationEngine::new(
            weights(&[1.0, 2.0, 4.0]),
            3,
            Box::new(MeasurementSource::unbiased(256).unwrap()),
        )
        .with_seed(Some(99));

        let a = engine.run(&Mode::Optimize).unwrap();
        let b = engine.run(&Mode::Optimize).unwrap();
        let (a, b) = (a.as_allocation().unwrap(), b.as_allocation().unwrap());
        assert_eq!(a.seed, b.seed);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_more_candidates_never_lower_seed_score() {
        let source = || Box::new(AnalyticSource::uniform());
        let single = AllocationEngine::new(weights(&[1.0, 5.0]), 4, source()).with_seed(Some(3));
        let many = AllocationEngine::new(weights(&[1.0, 5.0]), 4, source())
            .with_seed(Some(3))
            .with_candidates(16);

        let single = single.run(&Mode::Optimize).unwrap();
        let many = many.run(&Mode::Optimize).unwrap();
        assert!(
            many.as_allocation().unwrap().seed_score >= single.as_allocation().unwrap().seed_score
        );
    }

    #[test]
    fn test_zero_candidates_rejected() {
        let engine = AllocationEngine::new(weights(&[1.0]), 2, Box::new(AnalyticSource::uniform()))
            .with_candidates(0);
        assert!(matches!(
            engine.run(&Mode::Optimize),
            Err(QerraError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_threshold_mode_with_priority_circuit() {
        let priorities = [PriorityLevel::High, PriorityLevel::Low];
        let source = CircuitSource::new(Circuit::priority_entangler(&priorities), None).unwrap();
        let engine = AllocationEngine::new(weights(&[2.0, 1.0]), 10, Box::new(source));

        let mut settings = ThresholdSettings::new(10);
        settings.priorities = priorities.to_vec();
        settings.probability_threshold = 0.4;
        let artifact = engine.run(&Mode::Threshold(settings)).unwrap();
        let decision = artifact.as_threshold().unwrap();

        assert_eq!(decision.category, Category::Allocate);
        assert_eq!(decision.target_outcome, OutcomeLabel(3));
        assert!((decision.supporting_probability - 0.5).abs() < 1e-12);
        assert_eq!(decision.histogram.len(), 2);
    }

    #[test]
    fn test_threshold_mode_allocates_on_shaped_prior() {
        let source = AnalyticSource::shaped(vec![0.2, 0.1, 0.1, 0.6]).unwrap();
        let engine = AllocationEngine::new(weights(&[1.0, 1.0]), 10, Box::new(source));

        let mut settings = ThresholdSettings::new(10);
        settings.target_outcome = Some(OutcomeLabel(0b11));
        let decision = engine.run(&Mode::Threshold(settings)).unwrap();
        assert_eq!(
            decision.as_threshold().unwrap().category,
            Category::Allocate
        );
    }
}
