//! Weight projection at future horizons.
//!
//! Projects weight from the active TDEE estimate and an assumed daily calorie
//! target. The confidence interval half-width grows with the square root of
//! the horizon and shrinks as the estimator's confidence score rises, so
//! uncertainty widens over longer horizons and narrows as the estimate
//! stabilizes. Pure arithmetic, no I/O.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::KCAL_PER_KG;
use crate::tdee::TdeeEstimate;

/// Projected weight at one horizon. Immutable result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightPrediction {
    /// Date the projection lands on
    pub target_date: NaiveDate,

    /// Horizon length in days
    pub days_from_now: u32,

    /// Projected weight (kg)
    pub predicted_weight_kg: f64,

    /// Low/high bounds of the confidence interval (kg)
    pub confidence_range_kg: (f64, f64),

    /// Daily calorie target the projection assumes
    pub assumed_daily_calories: f64,
}

impl WeightPrediction {
    /// Width of the confidence interval (kg).
    pub fn range_width_kg(&self) -> f64 {
        self.confidence_range_kg.1 - self.confidence_range_kg.0
    }
}

/// Predictor tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Daily expenditure uncertainty at confidence score 0 (kcal/day)
    pub max_daily_sigma_kcal: f64,

    /// Daily expenditure uncertainty at confidence score 100 (kcal/day)
    pub min_daily_sigma_kcal: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            max_daily_sigma_kcal: 300.0,
            min_daily_sigma_kcal: 75.0,
        }
    }
}

/// Weight projection over the active estimate
#[derive(Debug, Clone, Default)]
pub struct WeightPredictor {
    config: PredictionConfig,
}

impl WeightPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PredictionConfig) -> Self {
        WeightPredictor { config }
    }

    /// Project weight `days` out from `as_of`.
    ///
    /// `predicted_delta = (target − TDEE) × days / kcal_per_kg`; a zero net
    /// imbalance projects the current weight unchanged inside a narrow
    /// interval.
    pub fn predict(
        &self,
        current_weight_kg: f64,
        estimate: &TdeeEstimate,
        target_daily_calories: f64,
        days: u32,
        as_of: NaiveDate,
    ) -> WeightPrediction {
        let imbalance = target_daily_calories - estimate.estimated_tdee;
        let delta_kg = imbalance * days as f64 / KCAL_PER_KG;
        let predicted = current_weight_kg + delta_kg;

        let half_width = self.half_width_kg(estimate.confidence_score, days);

        WeightPrediction {
            target_date: as_of + Duration::days(days as i64),
            days_from_now: days,
            predicted_weight_kg: predicted,
            confidence_range_kg: (predicted - half_width, predicted + half_width),
            assumed_daily_calories: target_daily_calories,
        }
    }

    /// Interval half-width: daily uncertainty interpolated from the
    /// confidence score, accumulated as a random walk over the horizon.
    fn half_width_kg(&self, confidence_score: u8, days: u32) -> f64 {
        let trust = f64::from(confidence_score.min(100)) / 100.0;
        let daily_sigma = self.config.min_daily_sigma_kcal
            + (self.config.max_daily_sigma_kcal - self.config.min_daily_sigma_kcal)
                * (1.0 - trust);
        daily_sigma * (days as f64).sqrt() / KCAL_PER_KG
    }
}
