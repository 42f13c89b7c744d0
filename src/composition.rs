//! Three-branch body-composition projection.
//!
//! Combines a weight prediction with a partition ratio to produce
//! pessimistic/expected/optimistic body-fat and FFMI trajectories. A single
//! parametrized branch function is invoked with the three P-ratio bounds;
//! which bound is "pessimistic" depends on the direction of the weight
//! change, and that mapping lives in one explicit match.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::pratio::{MassChangeDirection, PRatioResult};
use crate::prediction::WeightPrediction;

/// Coarse confidence grade for a projection, derived from the partition
/// ratio's range spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionConfidence {
    High,
    Reasonable,
    Low,
}

/// Pessimistic/expected/optimistic values for one projected quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchValues {
    pub pessimistic: f64,
    pub expected: f64,
    pub optimistic: f64,
}

/// Projected body composition at one horizon. Immutable result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyCompProjection {
    /// Horizon length in days, matching the weight prediction
    pub days_from_now: u32,

    /// Fat-free mass index (lean kg / height m²) per branch
    pub ffmi: BranchValues,

    /// Body fat percentage per branch
    pub body_fat_pct: BranchValues,

    /// Partition ratio behind the expected branch
    pub p_ratio_used: f64,

    /// Confidence grade from the partition range spread
    pub confidence_level: ProjectionConfidence,

    /// Factor contributions carried over from the partition model
    pub factors: BTreeMap<String, f64>,
}

/// Spread thresholds for the confidence grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionConfig {
    /// Spread at or below which the grade is `High`
    pub high_spread: f64,

    /// Spread at or below which the grade is `Reasonable`
    pub reasonable_spread: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        CompositionConfig {
            high_spread: 0.10,
            reasonable_spread: 0.25,
        }
    }
}

/// Projector merging weight predictions with partition ratios
#[derive(Debug, Clone, Default)]
pub struct CompositionProjector {
    config: CompositionConfig,
}

impl CompositionProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompositionConfig) -> Self {
        CompositionProjector { config }
    }

    /// Project body composition at the prediction's horizon.
    ///
    /// Returns `None` when height is absent (FFMI cannot be formed; a
    /// partial projection would be garbage) or when the current composition
    /// is implausible.
    pub fn project(
        &self,
        prediction: &WeightPrediction,
        p_ratio: &PRatioResult,
        current_weight_kg: f64,
        current_body_fat_pct: f64,
        height_cm: Option<f64>,
    ) -> Option<BodyCompProjection> {
        let height_cm = height_cm?;
        if height_cm <= 0.0
            || current_weight_kg <= 0.0
            || !(0.0..=100.0).contains(&current_body_fat_pct)
        {
            return None;
        }

        let delta_kg = prediction.predicted_weight_kg - current_weight_kg;
        let current_fat_kg = current_weight_kg * current_body_fat_pct / 100.0;
        let current_lean_kg = current_weight_kg - current_fat_kg;

        let (low, high) = p_ratio.confidence_range;
        let expected = p_ratio.final_p_ratio;

        // The bound-to-label mapping flips with direction: when losing, a
        // LOW fat fraction means more lean tissue lost (pessimistic); when
        // gaining, a HIGH fat fraction means fat-dominant gain (pessimistic).
        let direction = if delta_kg > 0.0 {
            MassChangeDirection::Gain
        } else {
            MassChangeDirection::Loss
        };
        let (pessimistic_p, optimistic_p) = match direction {
            MassChangeDirection::Loss => (low, high),
            MassChangeDirection::Gain => (high, low),
        };

        debug!(delta_kg, ?direction, "projecting composition branches");

        let branch = |p: f64| -> (f64, f64) {
            // fat/lean split of the delta; masses floored at zero
            let fat_kg = (current_fat_kg + delta_kg * p).max(0.0);
            let lean_kg = (current_lean_kg + delta_kg * (1.0 - p)).max(0.0);
            let total = fat_kg + lean_kg;
            let bf_pct = if total > 0.0 { fat_kg / total * 100.0 } else { 0.0 };
            let height_m = height_cm / 100.0;
            let ffmi = lean_kg / (height_m * height_m);
            (bf_pct, ffmi)
        };

        let (bf_pess, ffmi_pess) = branch(pessimistic_p);
        let (bf_exp, ffmi_exp) = branch(expected);
        let (bf_opt, ffmi_opt) = branch(optimistic_p);

        let spread = high - low;
        let confidence_level = if spread <= self.config.high_spread {
            ProjectionConfidence::High
        } else if spread <= self.config.reasonable_spread {
            ProjectionConfidence::Reasonable
        } else {
            ProjectionConfidence::Low
        };

        Some(BodyCompProjection {
            days_from_now: prediction.days_from_now,
            ffmi: BranchValues {
                pessimistic: ffmi_pess,
                expected: ffmi_exp,
                optimistic: ffmi_opt,
            },
            body_fat_pct: BranchValues {
                pessimistic: bf_pess,
                expected: bf_exp,
                optimistic: bf_opt,
            },
            p_ratio_used: expected,
            confidence_level,
            factors: p_ratio.factors.clone(),
        })
    }
}
