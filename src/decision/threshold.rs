//! Threshold decision policy.
//!
//! K_i: ALLOCATE iff the target outcome's mass exceeds the threshold AND
//! enough units are on hand. Everything else is BALANCE.
//! Single-shot: no state survives a call.

use crate::models::{Category, OutcomeLabel, ProbabilityDistribution, QerraError, Result};
use tracing::debug;

/// Inputs and verdict of one threshold decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdOutcome {
    pub category: Category,

    /// Mass of the target outcome (0 when outside the sample space)
    pub probability: f64,

    pub threshold: f64,
}

/// Binary classifier over one outcome's probability.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdDecisionPolicy;

impl ThresholdDecisionPolicy {
    pub fn decide(
        &self,
        distribution: &ProbabilityDistribution,
        target: OutcomeLabel,
        resource_available: u64,
        min_units: u64,
        threshold: f64,
    ) -> Result<ThresholdOutcome> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(QerraError::invalid(format!(
                "probability threshold must be within [0, 1], got {threshold}"
            )));
        }

        let probability = distribution.probability(target);
        let category = if probability > threshold && resource_available >= min_units {
            Category::Allocate
        } else {
            Category::Balance
        };

        debug!(
            target = %target,
            probability,
            threshold,
            resource_available,
            min_units,
            category = %category,
            "Threshold decided"
        );
        Ok(ThresholdOutcome {
            category,
            probability,
            threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn skewed(p_target: f64) -> ProbabilityDistribution {
        let rest = (1.0 - p_target) / 3.0;
        ProbabilityDistribution::new(2, vec![rest, rest, rest, p_target]).unwrap()
    }

    #[test]
    fn test_allocate_when_likely_and_stocked() {
        let out = ThresholdDecisionPolicy
            .decide(&skewed(0.6), OutcomeLabel(3), 10, 5, 0.5)
            .unwrap();
        assert_eq!(out.category, Category::Allocate);
        assert!((out.probability - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_balance_when_short_of_units() {
        let out = ThresholdDecisionPolicy
            .decide(&skewed(0.6), OutcomeLabel(3), 3, 5, 0.5)
            .unwrap();
        assert_eq!(out.category, Category::Balance);
    }

    #[test]
    fn test_threshold_is_strict() {
        let out = ThresholdDecisionPolicy
            .decide(&skewed(0.5), OutcomeLabel(3), 10, 5, 0.5)
            .unwrap();
        assert_eq!(out.category, Category::Balance);
    }

    #[test]
    fn test_label_outside_space_counts_as_zero() {
        let out = ThresholdDecisionPolicy
            .decide(&skewed(0.6), OutcomeLabel(12), 10, 5, 0.0)
            .unwrap();
        assert_eq!(out.probability, 0.0);
        assert_eq!(out.category, Category::Balance);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let result = ThresholdDecisionPolicy.decide(&skewed(0.6), OutcomeLabel(3), 10, 5, 1.5);
        assert!(matches!(result, Err(QerraError::InvalidParameter(_))));
        let result = ThresholdDecisionPolicy.decide(&skewed(0.6), OutcomeLabel(3), 10, 5, f64::NAN);
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn prop_raising_threshold_past_p_flips_to_balance(
            p in 0.05f64..0.95,
            below in 0.0f64..1.0,
            above in 0.0f64..1.0,
        ) {
            let dist = skewed(p);
            let low = below * p * 0.999;
            let high = p + above * (1.0 - p);
            let allocate = ThresholdDecisionPolicy
                .decide(&dist, OutcomeLabel(3), 10, 5, low)
                .unwrap();
            let balance = ThresholdDecisionPolicy
                .decide(&dist, OutcomeLabel(3), 10, 5, high.min(1.0))
                .unwrap();
            prop_assert_eq!(allocate.category, Category::Allocate);
            prop_assert_eq!(balance.category, Category::Balance);
        }
    }
}
