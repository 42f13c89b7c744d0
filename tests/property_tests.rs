//! Property-based tests for the engine's numeric contracts.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use metabrs::{
    AdaptiveTdeeEstimator, BiologicalSex, BurnRatePoint, ConfidenceTier, EstimateSource,
    MetabolicEngine, NutritionLogEntry, PRatioInputs, PRatioModel, TdeeEstimate, TrainingAge,
    UserProfile, WeightLogEntry, WeightPredictor, WeightUnit,
};

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn weight_entry(day: i64, kg: f64) -> WeightLogEntry {
    WeightLogEntry {
        date: start_date() + Duration::days(day),
        weight: kg,
        unit: WeightUnit::Kilograms,
    }
}

fn nutrition_entry(day: i64, kcal: f64) -> NutritionLogEntry {
    NutritionLogEntry {
        date: start_date() + Duration::days(day),
        calories_consumed: kcal,
        protein_g: 150.0,
        carbs_g: 240.0,
        fat_g: 70.0,
    }
}

/// Generated daily logs: a base weight, a drift, bounded noise, and a base
/// intake with bounded noise.
fn log_strategy() -> impl Strategy<Value = (Vec<WeightLogEntry>, Vec<NutritionLogEntry>)> {
    (
        20i64..120,
        60.0f64..110.0,
        -0.06f64..0.06,
        1800.0f64..3200.0,
        proptest::collection::vec(-0.4f64..0.4, 120),
        proptest::collection::vec(-250.0f64..250.0, 120),
    )
        .prop_map(|(days, base_kg, drift, base_kcal, w_noise, k_noise)| {
            let weights = (0..days)
                .map(|i| {
                    weight_entry(i, base_kg + drift * i as f64 + w_noise[i as usize])
                })
                .collect();
            let nutrition = (0..days)
                .map(|i| nutrition_entry(i, base_kcal + k_noise[i as usize]))
                .collect();
            (weights, nutrition)
        })
}

fn pratio_inputs_strategy() -> impl Strategy<Value = PRatioInputs> {
    (
        0.0f64..4.0,
        0.0f64..30.0,
        -800.0f64..800.0,
        5.0f64..45.0,
        prop_oneof![
            Just(TrainingAge::Beginner),
            Just(TrainingAge::Intermediate),
            Just(TrainingAge::Advanced)
        ],
        any::<bool>(),
        prop_oneof![Just(BiologicalSex::Male), Just(BiologicalSex::Female)],
        proptest::option::of(18.0f64..80.0),
    )
        .prop_map(
            |(protein_g_kg, sets, imbalance, bf, training_age, enhanced, sex, age)| {
                PRatioInputs {
                    avg_daily_protein_g: protein_g_kg * 80.0,
                    avg_daily_protein_g_per_kg: protein_g_kg,
                    avg_weekly_training_sets: sets,
                    avg_daily_energy_imbalance_kcal: imbalance,
                    energy_balance_pct: imbalance / 25.0,
                    current_body_fat_pct: bf,
                    current_lean_mass_kg: 80.0 * (1.0 - bf / 100.0),
                    training_age,
                    is_enhanced: enhanced,
                    sex,
                    chronological_age: age,
                    personal_history: None,
                }
            },
        )
}

fn regression_estimate(tdee: f64, score: u8) -> TdeeEstimate {
    TdeeEstimate {
        estimated_tdee: tdee,
        burn_rate_per_kg: tdee / 80.0,
        confidence: ConfidenceTier::Stabilizing,
        confidence_score: score,
        data_points_used: 20,
        estimate_history: vec![BurnRatePoint {
            date: start_date(),
            burn_rate_kcal: tdee,
        }],
        source: EstimateSource::Regression,
    }
}

proptest! {
    /// Confidence score stays within [0, 100] for any plausible log shape.
    #[test]
    fn confidence_score_bounded((weights, nutrition) in log_strategy()) {
        let quality = metabrs::QualityValidator::new().validate(&weights, &nutrition);
        if let Some(est) = AdaptiveTdeeEstimator::new().estimate(&weights, &nutrition, &quality) {
            prop_assert!(est.confidence_score <= 100);
            prop_assert!(est.estimated_tdee.is_finite());
            prop_assert!(est.burn_rate_per_kg.is_finite());
        }
    }

    /// The partition ratio stays in (0, 1] and inside its own range.
    #[test]
    fn p_ratio_bounds(inputs in pratio_inputs_strategy()) {
        let r = PRatioModel::new().estimate(&inputs);
        prop_assert!(r.final_p_ratio > 0.0 && r.final_p_ratio <= 1.0);
        prop_assert!(r.confidence_range.0 <= r.final_p_ratio);
        prop_assert!(r.final_p_ratio <= r.confidence_range.1);
        prop_assert!(r.confidence_range.1 <= 1.0);
    }

    /// Holding everything else fixed, more protein never reduces the fat
    /// fraction of a loss.
    #[test]
    fn protein_monotone_under_deficit(
        inputs in pratio_inputs_strategy(),
        lower in 0.0f64..2.0,
        bump in 0.1f64..2.0,
    ) {
        let mut a = inputs.clone();
        a.avg_daily_energy_imbalance_kcal = -400.0;
        a.energy_balance_pct = -16.0;
        a.avg_daily_protein_g_per_kg = lower;
        let mut b = a.clone();
        b.avg_daily_protein_g_per_kg = lower + bump;

        let model = PRatioModel::new();
        prop_assert!(model.estimate(&b).final_p_ratio >= model.estimate(&a).final_p_ratio);
    }

    /// More weekly training sets never reduce the fat fraction of a loss.
    #[test]
    fn training_volume_monotone_under_deficit(
        inputs in pratio_inputs_strategy(),
        lower in 0.0f64..20.0,
        bump in 0.5f64..15.0,
    ) {
        let mut a = inputs.clone();
        a.avg_daily_energy_imbalance_kcal = -400.0;
        a.energy_balance_pct = -16.0;
        a.avg_weekly_training_sets = lower;
        let mut b = a.clone();
        b.avg_weekly_training_sets = lower + bump;

        let model = PRatioModel::new();
        prop_assert!(model.estimate(&b).final_p_ratio >= model.estimate(&a).final_p_ratio);
    }

    /// Personal history with three or more samples never widens the range.
    #[test]
    fn personal_history_never_widens(
        inputs in pratio_inputs_strategy(),
        history in proptest::collection::vec(0.05f64..1.0, 3..10),
    ) {
        let model = PRatioModel::new();
        let without = model.estimate(&inputs);

        let mut with_inputs = inputs.clone();
        with_inputs.personal_history = Some(history);
        let with = model.estimate(&with_inputs);

        let width = |r: &metabrs::PRatioResult| r.confidence_range.1 - r.confidence_range.0;
        prop_assert!(width(&with) <= width(&without) + 1e-12);
    }

    /// Interval width is non-decreasing in the horizon for fixed confidence.
    #[test]
    fn prediction_width_monotone_in_days(
        tdee in 1500.0f64..3500.0,
        score in 0u8..=100,
        target in 1200.0f64..4000.0,
        days_a in 1u32..180,
        extra in 1u32..180,
    ) {
        let predictor = WeightPredictor::new();
        let est = regression_estimate(tdee, score);
        let a = predictor.predict(80.0, &est, target, days_a, start_date());
        let b = predictor.predict(80.0, &est, target, days_a + extra, start_date());
        prop_assert!(b.range_width_kg() >= a.range_width_kg());
    }

    /// Matching the target to the estimate projects the current weight.
    #[test]
    fn zero_imbalance_idempotent(
        tdee in 1500.0f64..3500.0,
        score in 0u8..=100,
        weight in 50.0f64..150.0,
        days in 1u32..365,
    ) {
        let est = regression_estimate(tdee, score);
        let p = WeightPredictor::new().predict(weight, &est, tdee, days, start_date());
        prop_assert!((p.predicted_weight_kg - weight).abs() < 1e-9);
    }

    /// The engine is a pure function: identical inputs, identical outputs.
    #[test]
    fn engine_is_deterministic((weights, nutrition) in log_strategy()) {
        let input = metabrs::EngineInput {
            weight_logs: weights,
            nutrition_logs: nutrition,
            dexa_samples: Vec::new(),
            profile: UserProfile {
                height_cm: Some(178.0),
                age_years: Some(32.0),
                sex: Some(BiologicalSex::Male),
                activity_level: metabrs::ActivityLevel::ModeratelyActive,
                training_age: TrainingAge::Intermediate,
                is_enhanced: false,
                avg_weekly_training_sets: 12.0,
                body_fat_pct: Some(20.0),
                target_weight_kg: None,
            },
            target_daily_calories: 2200.0,
            horizons_days: vec![30, 90],
        };

        let engine = MetabolicEngine::new();
        prop_assert_eq!(engine.run(&input), engine.run(&input));
    }
}
