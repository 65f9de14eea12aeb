//! Configuration models for qerra.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The caller resolves these unknowns at runtime via config file.

use super::{Mode, OutcomeLabel, PriorityWeights};
use crate::source::Gate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for qerra.
///
/// I^R resolved: All configurable parameters are explicit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Engine inputs fixed for the lifetime of an engine
    pub engine: EngineSettings,

    /// Distribution backend
    #[serde(default)]
    pub source: SourceConfig,

    /// Solver settings
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Threshold-mode settings (required when mode = "threshold")
    #[serde(default)]
    pub threshold: Option<ThresholdSettings>,

    /// Scenario pool settings
    #[serde(default)]
    pub pool: PoolConfig,
}

/// Pipeline selector as written in config and scenario files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    /// Sample then optimize (default)
    #[default]
    Optimize,
    /// Probability gate
    Threshold,
}

/// Engine construction inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Pipeline to run
    #[serde(default)]
    pub mode: ModeKind,

    /// Total indivisible units to allocate
    pub num_resources: u64,

    /// One weight per recipient, higher = more urgent
    pub priority_weights: PriorityWeights,

    /// Seed candidates drawn per invocation (best one is optimized)
    #[serde(default = "default_candidates")]
    pub candidates: usize,

    /// RNG seed for reproducible draws (entropy when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_candidates() -> usize {
    1
}

/// Distribution backend selection.
///
/// K_i: Every backend yields a normalized distribution; they are
/// interchangeable from the engine's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Closed-form superposition, uniform unless shaped
    Analytic {
        /// Relative per-label weights applied before normalization
        #[serde(default)]
        shaping: Option<Vec<f64>>,
    },

    /// Repeated biased trials
    Measurement {
        /// Number of trials
        #[serde(default = "default_trials")]
        trials: u32,

        /// Probability of a 1 per qubit (missing qubits use 0.5)
        #[serde(default)]
        qubit_bias: Vec<f64>,
    },

    /// Gate-based state-vector simulation
    Circuit {
        /// Explicit gate list; when absent the priority circuit is built
        #[serde(default)]
        gates: Option<Vec<Gate>>,

        /// Measurement shots; exact probabilities when absent
        #[serde(default)]
        shots: Option<u32>,
    },
}

fn default_trials() -> u32 {
    1024
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Measurement {
            trials: default_trials(),
            qubit_bias: Vec::new(),
        }
    }
}

/// Constrained optimizer settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    /// Iteration cap; exceeding it is reported as non-convergence
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Max-norm step size (relative to the resource count) treated as converged
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_max_iterations() -> usize {
    200
}

fn default_tolerance() -> f64 {
    1e-9
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

/// Priority label for one recipient site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    High,
    Low,
}

/// Trial bias toward 1 for a high-priority qubit.
pub const HIGH_PRIORITY_BIAS: f64 = 0.75;

impl PriorityLevel {
    /// Measurement bias encoding this level.
    pub fn bias(self) -> f64 {
        match self {
            Self::High => HIGH_PRIORITY_BIAS,
            Self::Low => 0.5,
        }
    }
}

/// Threshold-mode inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdSettings {
    /// One label per site; qubit `i` encodes site `i`
    #[serde(default)]
    pub priorities: Vec<PriorityLevel>,

    /// Probability the target outcome must exceed (0.0 - 1.0)
    #[serde(default = "default_probability_threshold")]
    pub probability_threshold: f64,

    /// Units currently available
    pub resource_available: u64,

    /// Units required before allocating
    #[serde(default = "default_min_units")]
    pub min_units_required: u64,

    /// Success cell; defaults to all priority bits set
    #[serde(default)]
    pub target_outcome: Option<OutcomeLabel>,
}

fn default_probability_threshold() -> f64 {
    0.5
}

fn default_min_units() -> u64 {
    5
}

impl ThresholdSettings {
    /// Settings with defaults for everything except availability.
    pub fn new(resource_available: u64) -> Self {
        Self {
            priorities: Vec::new(),
            probability_threshold: default_probability_threshold(),
            resource_available,
            min_units_required: default_min_units(),
            target_outcome: None,
        }
    }

    /// Target label, resolving the all-ones default.
    pub fn target(&self) -> OutcomeLabel {
        self.target_outcome
            .unwrap_or_else(|| OutcomeLabel::all_ones(self.priorities.len().max(1) as u32))
    }

    /// Qubit count covering every priority label and the target.
    pub fn qubits(&self) -> u32 {
        (self.priorities.len() as u32)
            .max(self.target().bit_length())
            .max(1)
    }
}

/// Scenario pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum scenarios evaluated concurrently
    #[serde(default = "default_pool_size")]
    pub size: usize,
}

fn default_pool_size() -> usize {
    4
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-section requirements serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.mode == ModeKind::Threshold && self.threshold.is_none() {
            return Err(ConfigError::MissingSection("threshold"));
        }
        if self.engine.candidates == 0 {
            return Err(ConfigError::Invalid(
                "engine.candidates must be at least 1".to_string(),
            ));
        }
        if self.pool.size == 0 {
            return Err(ConfigError::Invalid("pool.size must be at least 1".to_string()));
        }
        if !(self.optimizer.tolerance.is_finite() && self.optimizer.tolerance > 0.0) {
            return Err(ConfigError::Invalid(
                "optimizer.tolerance must be a positive number".to_string(),
            ));
        }
        if let Some(threshold) = &self.threshold {
            let p = threshold.probability_threshold;
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid(format!(
                    "threshold.probability_threshold must be within [0, 1], got {p}"
                )));
            }
        }
        Ok(())
    }

    /// Mode selected by `[engine]`, with its threshold settings attached.
    pub fn mode(&self) -> Result<Mode, ConfigError> {
        match self.engine.mode {
            ModeKind::Optimize => Ok(Mode::Optimize),
            ModeKind::Threshold => self
                .threshold
                .clone()
                .map(Mode::Threshold)
                .ok_or(ConfigError::MissingSection("threshold")),
        }
    }

    /// Priority labels from `[threshold]`, empty when absent.
    pub fn priorities(&self) -> &[PriorityLevel] {
        self.threshold
            .as_ref()
            .map(|t| t.priorities.as_slice())
            .unwrap_or(&[])
    }
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error
/// - I^B materialized: Missing or inconsistent values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing [{0}] section required by the selected mode")]
    MissingSection(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const THRESHOLD_TOML: &str = r#"
[engine]
mode = "threshold"
num_resources = 10
priority_weights = [2.0, 1.0]

[source]
backend = "circuit"

[threshold]
priorities = ["high", "low"]
resource_available = 10
"#;

    #[test]
    fn test_parse_threshold_config_with_defaults() {
        let config: Config = toml::from_str(THRESHOLD_TOML).unwrap();
        config.validate().unwrap();

        let threshold = config.threshold.as_ref().unwrap();
        assert_eq!(threshold.probability_threshold, 0.5);
        assert_eq!(threshold.min_units_required, 5);
        assert_eq!(threshold.target(), OutcomeLabel(3));
        assert_eq!(threshold.qubits(), 2);
        assert_eq!(
            config.source,
            SourceConfig::Circuit {
                gates: None,
                shots: None
            }
        );
        assert_eq!(config.optimizer, OptimizerConfig::default());
        assert!(matches!(config.mode().unwrap(), Mode::Threshold(_)));
    }

    #[test]
    fn test_default_source_is_measurement() {
        let config: Config = toml::from_str(
            "[engine]\nnum_resources = 3\npriority_weights = [3.0, 2.0, 1.0]\n",
        )
        .unwrap();
        assert_eq!(config.engine.mode, ModeKind::Optimize);
        assert_eq!(config.engine.candidates, 1);
        assert_eq!(
            config.source,
            SourceConfig::Measurement {
                trials: 1024,
                qubit_bias: vec![]
            }
        );
        assert_eq!(config.pool.size, 4);
    }

    #[test]
    fn test_threshold_mode_requires_section() {
        let config: Config = toml::from_str(
            "[engine]\nmode = \"threshold\"\nnum_resources = 3\npriority_weights = [1.0]\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSection("threshold"))
        ));
    }

    #[test]
    fn test_negative_weight_rejected_at_parse() {
        let result: Result<Config, _> =
            toml::from_str("[engine]\nnum_resources = 3\npriority_weights = [1.0, -2.0]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(THRESHOLD_TOML.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.engine.num_resources, 10);

        let missing = Config::from_file(std::path::Path::new("/nonexistent/qerra.toml"));
        assert!(matches!(missing, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn test_explicit_target_widens_qubits() {
        let mut settings = ThresholdSettings::new(10);
        settings.priorities = vec![PriorityLevel::High, PriorityLevel::Low];
        settings.target_outcome = Some(OutcomeLabel(0b101));
        assert_eq!(settings.qubits(), 3);
    }
}
