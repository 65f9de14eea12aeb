//! Error types for qerra.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Caller input rejected (shapes, counts, ranges)
//! - K_i violated: A distribution backend broke its normalization contract
//! - I^B materialized: The solver ran out of iterations (recoverable)

use thiserror::Error;

/// Top-level error type for qerra.
#[derive(Debug, Error)]
pub enum QerraError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED: Caller supplied something unusable
    // ═══════════════════════════════════════════════════════════════════

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Parse error: {0}")]
    ParseError(String),

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED: Distribution backend bug, never retried
    // ═══════════════════════════════════════════════════════════════════

    #[error("Distribution normalization failure: {0}")]
    DistributionNormalization(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED: Solver gave up, caller picks the fallback
    // ═══════════════════════════════════════════════════════════════════

    #[error("Optimizer did not converge after {iterations} iterations (residual {residual:.3e})")]
    OptimizerNonConvergence { iterations: usize, residual: f64 },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl QerraError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for [`QerraError::InvalidParameter`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Check if the caller may retry (e.g. with a different seed candidate).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::OptimizerNonConvergence { .. })
    }
}

/// Result type alias for qerra.
pub type Result<T> = std::result::Result<T, QerraError>;
