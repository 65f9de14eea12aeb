//! Batch scenario pipeline.
//!
//! Pipeline flow:
//! Scenarios (JSONL) → Scenario Pool → Outcomes → JSONL

use crate::models::{Config, DecisionArtifact, QerraError, Result, RunStats, Scenario};
use crate::pool::ScenarioPool;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Runs a file of scenarios through a bounded pool.
pub struct BatchPipeline {
    pool: ScenarioPool,
    show_progress: bool,
}

impl BatchPipeline {
    pub fn new(config: Config) -> Self {
        Self {
            pool: ScenarioPool::new(config),
            show_progress: true,
        }
    }

    /// Disable the progress bar (tests, piped output).
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Load scenarios from a JSONL file.
    pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
        let file = File::open(path).map_err(|e| QerraError::io("opening scenarios file", e))?;
        let reader = BufReader::new(file);
        let mut scenarios = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| QerraError::io("reading scenarios file", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let scenario: Scenario = serde_json::from_str(&line)
                .map_err(|e| QerraError::ParseError(format!("Line {}: {}", line_num + 1, e)))?;
            scenarios.push(scenario);
        }

        info!(count = scenarios.len(), "Loaded scenarios");
        Ok(scenarios)
    }

    /// Evaluate every scenario and write one outcome per line.
    pub async fn run(&self, scenarios: Vec<Scenario>, output_path: &Path) -> Result<RunStats> {
        let start = Instant::now();
        let total = scenarios.len();

        info!(
            total_scenarios = total,
            pool = self.pool.size(),
            "Starting batch pipeline"
        );

        let pb = if self.show_progress {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
                .map_err(|e| QerraError::Internal(format!("progress template: {e}")))?
                .progress_chars("##-"),
        );

        let output_file =
            File::create(output_path).map_err(|e| QerraError::io("creating output file", e))?;
        let mut writer = BufWriter::new(output_file);

        let mut stats = RunStats {
            total_scenarios: total,
            ..RunStats::default()
        };

        let batch_size = (self.pool.size() * 2).max(10);
        let mut processed = 0;

        for chunk in scenarios.chunks(batch_size) {
            let outcomes = self.pool.evaluate_batch(chunk.to_vec()).await;

            for outcome in &outcomes {
                stats.record(outcome);
                let json = serde_json::to_string(outcome).map_err(|e| {
                    QerraError::Internal(format!("Failed to serialize outcome: {}", e))
                })?;
                writeln!(writer, "{}", json).map_err(|e| QerraError::io("writing output", e))?;

                if let Some(DecisionArtifact::Optimize(decision)) = &outcome.artifact {
                    pb.println(format!(
                        "{}: {} (score {:.3})",
                        outcome.scenario_id, decision.allocation, decision.score
                    ));
                }
            }

            writer
                .flush()
                .map_err(|e| QerraError::io("flushing output", e))?;

            processed += chunk.len();
            pb.set_position(processed as u64);
            pb.set_message(format!(
                "allocate: {}, balance: {}, failed: {}",
                stats.total_allocate, stats.total_balance, stats.total_failed
            ));
        }

        writer
            .flush()
            .map_err(|e| QerraError::io("flushing output", e))?;
        pb.finish_with_message(format!(
            "Done! {} optimized, {} thresholded, {} failed",
            stats.total_optimized,
            stats.total_allocate + stats.total_balance,
            stats.total_failed
        ));

        stats.runtime_secs = start.elapsed().as_secs_f64();
        stats.finalize();

        if stats.total_failed > 0 {
            warn!(failed = stats.total_failed, "Some scenarios failed");
        }
        info!(
            optimized = stats.total_optimized,
            allocate = stats.total_allocate,
            balance = stats.total_balance,
            allocate_rate = format!("{:.1}%", stats.allocate_rate * 100.0),
            throughput = format!("{:.0}/s", stats.throughput_per_sec),
            "Batch pipeline complete"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScenarioOutcome;
    use tempfile::{tempdir, NamedTempFile};

    fn config() -> Config {
        toml::from_str(
            r#"
            [engine]
            num_resources = 1
            priority_weights = [1.0]
            seed = 5

            [source]
            backend = "analytic"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_load_scenarios_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id": "a", "num_resources": 3, "priority_weights": [3, 2, 1]}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"id": "b", "num_resources": 2, "priority_weights": [1, 1], "mode": "threshold", "threshold": {{"resource_available": 8}}}}"#
        )
        .unwrap();

        let scenarios = BatchPipeline::load_scenarios(file.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[1].threshold.as_ref().unwrap().resource_available, 8);
    }

    #[test]
    fn test_load_scenarios_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": "a", "num_resources": 1, "priority_weights": [1]}}"#).unwrap();
        writeln!(file, r#"{{"id": "b", "priority_weights": [-1]}}"#).unwrap();

        match BatchPipeline::load_scenarios(file.path()) {
            Err(QerraError::ParseError(msg)) => assert!(msg.starts_with("Line 2")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_writes_outcome_per_scenario() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.jsonl");

        let scenarios: Vec<Scenario> = [
            r#"{"id": "a", "num_resources": 3, "priority_weights": [3, 2, 1]}"#,
            r#"{"id": "bad", "num_resources": 3, "priority_weights": [1], "mode": "threshold"}"#,
            r#"{"id": "b", "num_resources": 3, "priority_weights": [1, 2, 4]}"#,
        ]
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

        let stats = BatchPipeline::new(config())
            .quiet()
            .run(scenarios, &output)
            .await
            .unwrap();
        assert_eq!(stats.total_scenarios, 3);
        assert_eq!(stats.total_optimized, 2);
        assert_eq!(stats.total_failed, 1);

        let written: Vec<ScenarioOutcome> = std::fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0].scenario_id, "a");
        assert!(written[1].error.is_some());
        let b = written[2].artifact.as_ref().unwrap().as_allocation().unwrap();
        assert_eq!(b.allocation.as_slice(), &[0.0, 0.0, 3.0]);
    }
}
