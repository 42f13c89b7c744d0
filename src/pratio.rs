//! P-ratio partition model: what fraction of a mass change is fat tissue.
//!
//! The ratio governs how a weight trajectory maps to body-fat and lean-mass
//! outcomes. A bounded factor model starts from a base ratio keyed to current
//! body fat (Forbes-style partitioning: leaner individuals see proportionally
//! more lean tissue involved in any change, in either direction) and applies
//! independently clamped adjustments. Each adjustment is expressed as a
//! lean-sparing favorability and applied direction-dependently: favorable
//! pushes the fat fraction up in a deficit (more of the loss is fat) and down
//! in a surplus (less of the gain is fat).
//!
//! When prior DEXA-derived ratios are available, the model blends toward the
//! personal average and narrows its confidence range with sample count.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{BiologicalSex, DexaSample, NutritionLogEntry, TrainingAge, UserProfile};
use crate::tdee::TdeeEstimate;

/// Direction of the projected mass change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MassChangeDirection {
    Loss,
    Gain,
}

/// Inputs to the partition model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PRatioInputs {
    /// Average daily protein intake (g)
    pub avg_daily_protein_g: f64,

    /// Average daily protein relative to bodyweight (g/kg)
    pub avg_daily_protein_g_per_kg: f64,

    /// Average weekly hard training sets
    pub avg_weekly_training_sets: f64,

    /// Average daily energy imbalance, target minus expenditure (kcal)
    pub avg_daily_energy_imbalance_kcal: f64,

    /// Imbalance as a percentage of expenditure
    pub energy_balance_pct: f64,

    /// Current body fat percentage
    pub current_body_fat_pct: f64,

    /// Current lean mass (kg)
    pub current_lean_mass_kg: f64,

    /// Training experience
    pub training_age: TrainingAge,

    /// Anabolic compound use
    pub is_enhanced: bool,

    /// Biological sex
    pub sex: BiologicalSex,

    /// Age in years, if known
    pub chronological_age: Option<f64>,

    /// Historical fat fractions from prior measured changes, if any
    pub personal_history: Option<Vec<f64>>,
}

impl PRatioInputs {
    /// Assemble model inputs from logs, profile, and the active estimate.
    ///
    /// Protein is averaged over the nutrition log, the imbalance comes from
    /// the assumed target versus the active TDEE, and body composition from
    /// the latest DEXA sample when present, else the profile.
    pub fn from_logs(
        nutrition_logs: &[NutritionLogEntry],
        dexa_samples: &[DexaSample],
        profile: &UserProfile,
        estimate: &TdeeEstimate,
        current_weight_kg: f64,
        target_daily_calories: f64,
    ) -> Option<PRatioInputs> {
        let body_fat_pct = dexa_samples
            .iter()
            .max_by_key(|s| s.date)
            .map(|s| s.body_fat_pct)
            .or(profile.body_fat_pct)?;

        if current_weight_kg <= 0.0 {
            return None;
        }

        let avg_protein = if nutrition_logs.is_empty() {
            0.0
        } else {
            nutrition_logs.iter().map(|n| n.protein_g).sum::<f64>()
                / nutrition_logs.len() as f64
        };

        let imbalance = target_daily_calories - estimate.estimated_tdee;
        let balance_pct = if estimate.estimated_tdee > 0.0 {
            imbalance / estimate.estimated_tdee * 100.0
        } else {
            0.0
        };

        let history = personal_history_from_dexa(dexa_samples);

        Some(PRatioInputs {
            avg_daily_protein_g: avg_protein,
            avg_daily_protein_g_per_kg: avg_protein / current_weight_kg,
            avg_weekly_training_sets: profile.avg_weekly_training_sets,
            avg_daily_energy_imbalance_kcal: imbalance,
            energy_balance_pct: balance_pct,
            current_body_fat_pct: body_fat_pct,
            current_lean_mass_kg: current_weight_kg * (1.0 - body_fat_pct / 100.0),
            training_age: profile.training_age,
            is_enhanced: profile.is_enhanced,
            sex: profile.sex.unwrap_or(BiologicalSex::Male),
            chronological_age: profile.age_years,
            personal_history: if history.is_empty() {
                None
            } else {
                Some(history)
            },
        })
    }

    /// Direction implied by the energy imbalance; a flat target counts as
    /// loss, which is harmless because a zero delta partitions to zero.
    pub fn direction(&self) -> MassChangeDirection {
        if self.avg_daily_energy_imbalance_kcal > 0.0 {
            MassChangeDirection::Gain
        } else {
            MassChangeDirection::Loss
        }
    }
}

/// Estimated partition with explainable factor contributions.
/// Immutable result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PRatioResult {
    /// Fat fraction of the projected mass change, in (0, 1]
    pub final_p_ratio: f64,

    /// Low/high bounds, always containing `final_p_ratio`
    pub confidence_range: (f64, f64),

    /// Signed contribution of each factor to the final ratio; the `base`
    /// entry is the starting ratio itself
    pub factors: BTreeMap<String, f64>,
}

/// Partition model tuning. Each shift bound clamps one factor so no single
/// input can dominate the compound adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PRatioConfig {
    /// Protein intake at which the lean-sparing benefit saturates (g/kg)
    pub protein_saturation_g_per_kg: f64,

    /// Largest shift from protein adequacy, applied symmetrically
    pub max_protein_shift: f64,

    /// Weekly set count at which the training benefit saturates
    pub training_sets_saturation: f64,

    /// Largest shift from training volume, applied symmetrically
    pub max_training_shift: f64,

    /// Imbalance magnitude (percent of expenditure) at which the aggressiveness
    /// penalty saturates
    pub imbalance_pct_saturation: f64,

    /// Largest unfavorable shift from imbalance magnitude
    pub max_imbalance_penalty: f64,

    /// Shift for beginner (+) and advanced (−) training age
    pub training_age_shift: f64,

    /// Favorable shift when enhanced
    pub enhanced_shift: f64,

    /// Favorable shift for females (slightly better lean retention in
    /// deficit per the literature)
    pub female_shift: f64,

    /// Unfavorable shift per year past `age_threshold_years`, capped
    pub age_shift_per_year: f64,
    pub age_threshold_years: f64,
    pub max_age_shift: f64,

    /// Half-width of the confidence range with no personal history
    pub base_spread: f64,

    /// Pseudo-count weighting the model against personal samples: with `n`
    /// samples the personal mean carries weight `n / (n + prior)`
    pub personal_blend_prior: f64,

    /// Fraction of the spread removed at full personal weighting
    pub personal_spread_reduction: f64,

    /// Consecutive DEXA deltas smaller than this (kg total mass) are skipped
    /// when deriving personal history
    pub min_dexa_delta_kg: f64,
}

impl Default for PRatioConfig {
    fn default() -> Self {
        PRatioConfig {
            protein_saturation_g_per_kg: 2.2,
            max_protein_shift: 0.04,
            training_sets_saturation: 15.0,
            max_training_shift: 0.03,
            imbalance_pct_saturation: 30.0,
            max_imbalance_penalty: 0.05,
            training_age_shift: 0.03,
            enhanced_shift: 0.04,
            female_shift: 0.01,
            age_shift_per_year: 0.0008,
            age_threshold_years: 40.0,
            max_age_shift: 0.02,
            base_spread: 0.10,
            personal_blend_prior: 3.0,
            personal_spread_reduction: 0.6,
            min_dexa_delta_kg: 1.0,
        }
    }
}

/// Ratio floor: the fat fraction stays strictly positive.
const P_RATIO_FLOOR: f64 = 0.02;

/// Bounded multi-factor partition model
#[derive(Debug, Clone, Default)]
pub struct PRatioModel {
    config: PRatioConfig,
}

impl PRatioModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PRatioConfig) -> Self {
        PRatioModel { config }
    }

    /// Estimate the fat fraction of the projected mass change.
    pub fn estimate(&self, inputs: &PRatioInputs) -> PRatioResult {
        let direction = inputs.direction();
        let base = self.base_ratio(inputs.current_body_fat_pct);

        // Favorability deltas: positive = lean-sparing
        let favorability: [(&str, f64); 7] = [
            ("protein", self.protein_factor(inputs.avg_daily_protein_g_per_kg)),
            ("training_volume", self.training_factor(inputs.avg_weekly_training_sets)),
            ("energy_imbalance", self.imbalance_factor(inputs.energy_balance_pct)),
            ("training_age", self.training_age_factor(inputs.training_age)),
            ("enhanced", if inputs.is_enhanced { self.config.enhanced_shift } else { 0.0 }),
            ("sex", match inputs.sex {
                BiologicalSex::Female => self.config.female_shift,
                BiologicalSex::Male => 0.0,
            }),
            ("age", self.age_factor(inputs.chronological_age)),
        ];

        // In a deficit lean-sparing means a higher fat fraction of the loss;
        // in a surplus it means a lower fat fraction of the gain.
        let sign = match direction {
            MassChangeDirection::Loss => 1.0,
            MassChangeDirection::Gain => -1.0,
        };

        let mut factors = BTreeMap::new();
        factors.insert("base".to_string(), base);
        let mut model_p = base;
        for (name, favor) in favorability {
            let contribution = sign * favor;
            factors.insert(name.to_string(), contribution);
            model_p += contribution;
        }
        model_p = model_p.clamp(P_RATIO_FLOOR, 1.0);

        let (final_p, spread) = self.blend_personal(model_p, inputs.personal_history.as_deref());
        let final_p = final_p.clamp(P_RATIO_FLOOR, 1.0);

        // Shift the interval inside (0, 1] rather than truncating it, so its
        // width depends only on the spread; truncation would let a boundary
        // case report a tighter range than the evidence supports.
        let mut low = final_p - spread;
        let mut high = final_p + spread;
        if high > 1.0 {
            low -= high - 1.0;
            high = 1.0;
        }
        if low < P_RATIO_FLOOR {
            high = (high + (P_RATIO_FLOOR - low)).min(1.0);
            low = P_RATIO_FLOOR;
        }
        let low = low.min(final_p);
        let high = high.max(final_p);

        debug!(final_p, low, high, ?direction, "partition ratio estimated");

        PRatioResult {
            final_p_ratio: final_p,
            confidence_range: (low, high),
            factors,
        }
    }

    /// Base fat fraction keyed to current body fat.
    ///
    /// Linear in body fat between hard bounds; at very low body fat most of
    /// any mass change involves lean tissue, at high body fat most of it is
    /// fat.
    fn base_ratio(&self, body_fat_pct: f64) -> f64 {
        (0.55 + 0.012 * (body_fat_pct - 15.0)).clamp(0.30, 0.95)
    }

    /// Saturating protein-adequacy favorability: −max at zero intake, +max
    /// at the saturation point, with no further benefit above it.
    fn protein_factor(&self, g_per_kg: f64) -> f64 {
        let t = (g_per_kg / self.config.protein_saturation_g_per_kg).clamp(0.0, 1.0);
        self.config.max_protein_shift * (2.0 * t - 1.0)
    }

    /// Training-volume favorability, saturating at `training_sets_saturation`.
    fn training_factor(&self, weekly_sets: f64) -> f64 {
        let t = (weekly_sets / self.config.training_sets_saturation).clamp(0.0, 1.0);
        self.config.max_training_shift * (2.0 * t - 1.0)
    }

    /// Aggressive deficits and surpluses both involve more lean tissue per
    /// unit of change; the penalty scales with imbalance magnitude.
    fn imbalance_factor(&self, balance_pct: f64) -> f64 {
        let t = (balance_pct.abs() / self.config.imbalance_pct_saturation).clamp(0.0, 1.0);
        -self.config.max_imbalance_penalty * t
    }

    fn training_age_factor(&self, age: TrainingAge) -> f64 {
        match age {
            TrainingAge::Beginner => self.config.training_age_shift,
            TrainingAge::Intermediate => 0.0,
            TrainingAge::Advanced => -self.config.training_age_shift,
        }
    }

    fn age_factor(&self, chronological_age: Option<f64>) -> f64 {
        match chronological_age {
            Some(age) if age > self.config.age_threshold_years => {
                -((age - self.config.age_threshold_years) * self.config.age_shift_per_year)
                    .min(self.config.max_age_shift)
            }
            _ => 0.0,
        }
    }

    /// Blend the model estimate with the personal average, weighted by
    /// sample count, and narrow the spread accordingly.
    fn blend_personal(&self, model_p: f64, history: Option<&[f64]>) -> (f64, f64) {
        let samples: Vec<f64> = history
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0 && *p <= 1.0)
            .collect();

        if samples.is_empty() {
            return (model_p, self.config.base_spread);
        }

        let n = samples.len() as f64;
        let personal_mean = samples.iter().sum::<f64>() / n;
        let weight = n / (n + self.config.personal_blend_prior);

        let blended = (1.0 - weight) * model_p + weight * personal_mean;
        let spread =
            self.config.base_spread * (1.0 - self.config.personal_spread_reduction * weight);

        debug!(n, personal_mean, weight, "blended personal partition history");
        (blended, spread)
    }
}

/// Derive historical fat fractions from consecutive DEXA scan pairs,
/// skipping pairs whose total mass change is too small to partition
/// meaningfully.
pub fn personal_history_from_dexa(samples: &[DexaSample]) -> Vec<f64> {
    personal_history_from_dexa_with(samples, PRatioConfig::default().min_dexa_delta_kg)
}

/// As [`personal_history_from_dexa`] with an explicit minimum delta.
pub fn personal_history_from_dexa_with(samples: &[DexaSample], min_delta_kg: f64) -> Vec<f64> {
    let mut sorted: Vec<&DexaSample> = samples.iter().collect();
    sorted.sort_by_key(|s| s.date);

    sorted
        .windows(2)
        .filter_map(|pair| {
            let delta_fat = pair[1].fat_mass_kg - pair[0].fat_mass_kg;
            let delta_lean = pair[1].lean_mass_kg - pair[0].lean_mass_kg;
            let delta_total = delta_fat + delta_lean;
            if delta_total.abs() < min_delta_kg {
                return None;
            }
            let ratio = delta_fat / delta_total;
            // Opposing fat/lean movements can push the quotient outside
            // (0, 1]; those intervals say nothing about partitioning.
            (ratio > 0.0 && ratio <= 1.0).then_some(ratio)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn inputs_deficit() -> PRatioInputs {
        PRatioInputs {
            avg_daily_protein_g: 160.0,
            avg_daily_protein_g_per_kg: 2.0,
            avg_weekly_training_sets: 12.0,
            avg_daily_energy_imbalance_kcal: -500.0,
            energy_balance_pct: -20.0,
            current_body_fat_pct: 20.0,
            current_lean_mass_kg: 64.0,
            training_age: TrainingAge::Intermediate,
            is_enhanced: false,
            sex: BiologicalSex::Male,
            chronological_age: Some(30.0),
            personal_history: None,
        }
    }

    fn inputs_surplus() -> PRatioInputs {
        PRatioInputs {
            avg_daily_energy_imbalance_kcal: 300.0,
            energy_balance_pct: 12.0,
            ..inputs_deficit()
        }
    }

    #[test]
    fn test_ratio_in_unit_interval() {
        let model = PRatioModel::new();
        for inputs in [inputs_deficit(), inputs_surplus()] {
            let r = model.estimate(&inputs);
            assert!(r.final_p_ratio > 0.0 && r.final_p_ratio <= 1.0);
            assert!(r.confidence_range.0 <= r.final_p_ratio);
            assert!(r.final_p_ratio <= r.confidence_range.1);
        }
    }

    #[test]
    fn test_range_contains_ratio_at_extremes() {
        let model = PRatioModel::new();
        // Very lean, aggressive deficit, everything unfavorable
        let mut inputs = inputs_deficit();
        inputs.current_body_fat_pct = 4.0;
        inputs.avg_daily_protein_g_per_kg = 0.0;
        inputs.avg_weekly_training_sets = 0.0;
        inputs.energy_balance_pct = -45.0;
        inputs.training_age = TrainingAge::Advanced;
        inputs.chronological_age = Some(70.0);

        let r = model.estimate(&inputs);
        assert!(r.final_p_ratio > 0.0);
        assert!(r.confidence_range.0 <= r.final_p_ratio);
        assert!(r.final_p_ratio <= r.confidence_range.1);
        assert!(r.confidence_range.1 <= 1.0);
    }

    #[test]
    fn test_leaner_loses_more_lean() {
        let model = PRatioModel::new();
        let mut lean = inputs_deficit();
        lean.current_body_fat_pct = 8.0;
        let mut heavy = inputs_deficit();
        heavy.current_body_fat_pct = 35.0;

        let r_lean = model.estimate(&lean);
        let r_heavy = model.estimate(&heavy);
        assert!(r_lean.final_p_ratio < r_heavy.final_p_ratio);
    }

    #[test]
    fn test_protein_monotone_for_loss() {
        let model = PRatioModel::new();
        let mut prev = 0.0;
        for g_per_kg in [0.5, 1.0, 1.6, 2.2, 3.0] {
            let mut inputs = inputs_deficit();
            inputs.avg_daily_protein_g_per_kg = g_per_kg;
            let r = model.estimate(&inputs);
            assert!(
                r.final_p_ratio >= prev,
                "fat fraction of loss dropped at {g_per_kg} g/kg"
            );
            prev = r.final_p_ratio;
        }
    }

    #[test]
    fn test_protein_saturates() {
        let model = PRatioModel::new();
        let mut at_sat = inputs_deficit();
        at_sat.avg_daily_protein_g_per_kg = 2.2;
        let mut above = inputs_deficit();
        above.avg_daily_protein_g_per_kg = 4.0;

        let r_sat = model.estimate(&at_sat);
        let r_above = model.estimate(&above);
        assert!((r_sat.final_p_ratio - r_above.final_p_ratio).abs() < 1e-12);
    }

    #[test]
    fn test_training_volume_monotone_for_loss() {
        let model = PRatioModel::new();
        let mut prev = 0.0;
        for sets in [0.0, 5.0, 10.0, 15.0, 25.0] {
            let mut inputs = inputs_deficit();
            inputs.avg_weekly_training_sets = sets;
            let r = model.estimate(&inputs);
            assert!(r.final_p_ratio >= prev);
            prev = r.final_p_ratio;
        }
    }

    #[test]
    fn test_favorable_factors_flip_sign_for_gain() {
        let model = PRatioModel::new();
        // More protein during a surplus means leaner gain: fat fraction down
        let mut low_protein = inputs_surplus();
        low_protein.avg_daily_protein_g_per_kg = 0.8;
        let mut high_protein = inputs_surplus();
        high_protein.avg_daily_protein_g_per_kg = 2.2;

        let r_low = model.estimate(&low_protein);
        let r_high = model.estimate(&high_protein);
        assert!(r_high.final_p_ratio < r_low.final_p_ratio);
    }

    #[test]
    fn test_aggressive_imbalance_unfavorable_both_directions() {
        let model = PRatioModel::new();

        let mut mild = inputs_deficit();
        mild.energy_balance_pct = -10.0;
        let mut harsh = inputs_deficit();
        harsh.energy_balance_pct = -40.0;
        // Harsher deficit: less of the loss is fat
        assert!(
            model.estimate(&harsh).final_p_ratio < model.estimate(&mild).final_p_ratio
        );

        let mut mild = inputs_surplus();
        mild.energy_balance_pct = 5.0;
        let mut harsh = inputs_surplus();
        harsh.energy_balance_pct = 30.0;
        // Harsher surplus: more of the gain is fat
        assert!(
            model.estimate(&harsh).final_p_ratio > model.estimate(&mild).final_p_ratio
        );
    }

    #[test]
    fn test_beginner_favorable_advanced_unfavorable() {
        let model = PRatioModel::new();
        let mut beginner = inputs_deficit();
        beginner.training_age = TrainingAge::Beginner;
        let mut advanced = inputs_deficit();
        advanced.training_age = TrainingAge::Advanced;

        let r_b = model.estimate(&beginner);
        let r_i = model.estimate(&inputs_deficit());
        let r_a = model.estimate(&advanced);
        assert!(r_b.final_p_ratio > r_i.final_p_ratio);
        assert!(r_i.final_p_ratio > r_a.final_p_ratio);
    }

    #[test]
    fn test_factor_map_is_transparent() {
        let model = PRatioModel::new();
        let r = model.estimate(&inputs_deficit());

        for key in [
            "base",
            "protein",
            "training_volume",
            "energy_imbalance",
            "training_age",
            "enhanced",
            "sex",
            "age",
        ] {
            assert!(r.factors.contains_key(key), "missing factor {key}");
        }
        // Contributions reconstruct the unclamped model estimate
        let sum: f64 = r.factors.values().sum();
        assert!((sum - r.final_p_ratio).abs() < 1e-9);
    }

    #[test]
    fn test_personal_history_narrows_range() {
        let model = PRatioModel::new();
        let without = model.estimate(&inputs_deficit());

        let mut with = inputs_deficit();
        with.personal_history = Some(vec![0.70, 0.65, 0.72]);
        let with = model.estimate(&with);

        let width = |r: &PRatioResult| r.confidence_range.1 - r.confidence_range.0;
        assert!(width(&with) < width(&without));
    }

    #[test]
    fn test_personal_history_pulls_estimate() {
        let model = PRatioModel::new();
        let base = model.estimate(&inputs_deficit()).final_p_ratio;

        let mut with = inputs_deficit();
        with.personal_history = Some(vec![0.95, 0.95, 0.95, 0.95]);
        let pulled = model.estimate(&with).final_p_ratio;
        assert!(pulled > base);
    }

    #[test]
    fn test_invalid_history_samples_ignored() {
        let model = PRatioModel::new();
        let clean = model.estimate(&inputs_deficit());

        let mut with = inputs_deficit();
        with.personal_history = Some(vec![f64::NAN, -0.5, 2.0]);
        let dirty = model.estimate(&with);
        assert_eq!(clean, dirty);
    }

    fn dexa(d: NaiveDate, fat: f64, lean: f64) -> DexaSample {
        DexaSample {
            date: d,
            body_fat_pct: fat / (fat + lean) * 100.0,
            lean_mass_kg: lean,
            fat_mass_kg: fat,
        }
    }

    #[test]
    fn test_history_from_dexa_deltas() {
        let samples = vec![
            dexa(date(2024, 1, 1), 20.0, 64.0),
            dexa(date(2024, 3, 1), 17.0, 63.0), // lost 4 kg, 3 of it fat
            dexa(date(2024, 5, 1), 17.0, 63.1), // negligible change, skipped
        ];
        let history = personal_history_from_dexa(&samples);
        assert_eq!(history.len(), 1);
        assert!((history[0] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_history_from_dexa_ignores_mixed_sign() {
        // Recomp: fat down, lean up, net change above threshold
        let samples = vec![
            dexa(date(2024, 1, 1), 20.0, 60.0),
            dexa(date(2024, 3, 1), 17.0, 64.5),
        ];
        let history = personal_history_from_dexa(&samples);
        assert!(history.is_empty());
    }
}
