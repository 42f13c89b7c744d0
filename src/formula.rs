//! Formula-based baseline TDEE estimation.
//!
//! Mifflin-St Jeor basal metabolic rate times an activity multiplier.
//! Deterministic, always available given a complete profile, and used both
//! as the fallback when the adaptive estimator lacks data and as a
//! comparison point against the personalized estimate.

use serde::{Deserialize, Serialize};

use crate::models::{BiologicalSex, UserProfile};

/// Baseline TDEE derived from profile data alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaEstimate {
    /// Basal metabolic rate (kcal/day)
    pub bmr_kcal: f64,

    /// BMR scaled by the activity multiplier (kcal/day)
    pub tdee_kcal: f64,

    /// Activity multiplier applied
    pub activity_multiplier: f64,
}

/// Deterministic profile-based estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaEstimator;

impl FormulaEstimator {
    pub fn new() -> Self {
        FormulaEstimator
    }

    /// Estimate TDEE from profile data and current weight.
    ///
    /// Mifflin-St Jeor:
    /// ```text
    /// BMR = 10 × weight_kg + 6.25 × height_cm − 5 × age + s
    /// ```
    /// where `s` is +5 for males and −161 for females.
    ///
    /// Returns `None` when height, age, or sex is missing from the profile —
    /// an absent value the caller handles, not an error.
    pub fn estimate(&self, profile: &UserProfile, weight_kg: f64) -> Option<FormulaEstimate> {
        let height_cm = profile.height_cm?;
        let age_years = profile.age_years?;
        let sex = profile.sex?;

        if weight_kg <= 0.0 || height_cm <= 0.0 || age_years <= 0.0 {
            return None;
        }

        let sex_offset = match sex {
            BiologicalSex::Male => 5.0,
            BiologicalSex::Female => -161.0,
        };

        let bmr = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * age_years + sex_offset;
        let multiplier = profile.activity_level.multiplier();

        Some(FormulaEstimate {
            bmr_kcal: bmr,
            tdee_kcal: bmr * multiplier,
            activity_multiplier: multiplier,
        })
    }
}
