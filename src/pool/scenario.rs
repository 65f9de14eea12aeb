//! Scenario pool for batch evaluation.
//!
//! Epistemic foundation:
//! - K_i: Each scenario gets its own engine; nothing is shared between runs
//!   except the read-only base config
//! - K_i: Engine work is CPU-bound, so it runs on the blocking thread pool
//! - B_i: Each scenario may fail → ScenarioOutcome carries the error
//! - I^R: Concurrency is bounded by `[pool] size`

use crate::models::{
    Config, DecisionArtifact, Mode, ModeKind, QerraError, Result, Scenario, ScenarioOutcome,
    ThresholdSettings,
};
use crate::pipeline::AllocationEngine;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Bounded pool running one engine invocation per scenario.
#[derive(Clone)]
pub struct ScenarioPool {
    /// Base config; scenarios override weights, resources and mode
    config: Arc<Config>,
    /// Pool size (max concurrent scenarios)
    pool_size: usize,
    /// Semaphore for concurrency control
    semaphore: Arc<Semaphore>,
}

impl ScenarioPool {
    pub fn new(config: Config) -> Self {
        let pool_size = config.pool.size.max(1);
        Self {
            config: Arc::new(config),
            pool_size,
            semaphore: Arc::new(Semaphore::new(pool_size)),
        }
    }

    pub fn size(&self) -> usize {
        self.pool_size
    }

    /// Evaluate a single scenario.
    ///
    /// B_i(decision succeeds) → Result<DecisionArtifact>, folded into the outcome
    pub async fn evaluate(&self, scenario: Scenario) -> ScenarioOutcome {
        let scenario_id = scenario.id.clone();
        match self.run(scenario).await {
            Ok(artifact) => ScenarioOutcome {
                scenario_id,
                artifact: Some(artifact),
                error: None,
            },
            Err(e) => {
                warn!(scenario_id = %scenario_id, error = %e, "Scenario failed");
                ScenarioOutcome {
                    scenario_id,
                    artifact: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn run(&self, scenario: Scenario) -> Result<DecisionArtifact> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| QerraError::Internal("Semaphore closed".to_string()))?;

        let config = Arc::clone(&self.config);
        let start = Instant::now();
        let scenario_id = scenario.id.clone();

        let artifact = tokio::task::spawn_blocking(move || {
            let (engine, mode) = build_engine(&config, &scenario)?;
            engine.run(&mode)
        })
        .await
        .map_err(|e| QerraError::Internal(format!("scenario task failed: {e}")))??;

        debug!(
            scenario_id = %scenario_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scenario evaluated"
        );
        Ok(artifact)
    }

    /// Evaluate scenarios concurrently. Outcomes keep input order.
    pub async fn evaluate_batch(&self, scenarios: Vec<Scenario>) -> Vec<ScenarioOutcome> {
        let mut handles = Vec::with_capacity(scenarios.len());

        for scenario in scenarios {
            let pool = self.clone();
            let scenario_id = scenario.id.clone();
            let handle = tokio::spawn(async move { pool.evaluate(scenario).await });
            handles.push((scenario_id, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (scenario_id, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!(scenario_id = %scenario_id, error = %e, "Task panicked");
                    outcomes.push(ScenarioOutcome {
                        scenario_id,
                        artifact: None,
                        error: Some(format!("task panicked: {e}")),
                    });
                }
            }
        }
        outcomes
    }
}

/// Engine and mode for one scenario, falling back to the base config.
pub fn build_engine(config: &Config, scenario: &Scenario) -> Result<(AllocationEngine, Mode)> {
    let threshold: Option<&ThresholdSettings> =
        scenario.threshold.as_ref().or(config.threshold.as_ref());

    let mode = match scenario.mode {
        ModeKind::Optimize => Mode::Optimize,
        ModeKind::Threshold => Mode::Threshold(threshold.cloned().ok_or_else(|| {
            QerraError::invalid(format!(
                "scenario {} uses threshold mode without threshold settings",
                scenario.id
            ))
        })?),
    };

    let priorities = threshold.map(|t| t.priorities.as_slice()).unwrap_or(&[]);
    let source = config.source.build(priorities)?;

    let engine = AllocationEngine::new(
        scenario.priority_weights.clone(),
        scenario.num_resources,
        source,
    )
    .with_optimizer(config.optimizer)
    .with_candidates(config.engine.candidates)
    .with_seed(scenario.seed.or(config.engine.seed));

    Ok((engine, mode))
}
